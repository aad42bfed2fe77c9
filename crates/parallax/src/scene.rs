use crate::camera::Camera;
use crate::layers::LayerStack;

/// Everything the render pass draws: the layer stack seen through a camera.
#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub layers: LayerStack,
}

impl Scene {
    pub fn new(camera: Camera, layers: LayerStack) -> Self {
        Self { camera, layers }
    }
}
