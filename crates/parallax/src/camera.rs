use glam::{Mat4, Vec3};

/// Perspective camera looking down -Z without rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn new(position: Vec3, fov_y: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            fov_y,
            near,
            far,
            aspect: 16.0 / 9.0,
        }
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(-self.position)
    }

    /// Right-handed projection with a 0..1 depth range.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Tangent of half the vertical field of view.
    pub fn half_height_slope(&self) -> f32 {
        (self.fov_y.to_radians() * 0.5).tan()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 900.0), 60.0, 1.0, 10_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_in_front_of_camera_projects_to_center() {
        let camera = Camera::default();
        let clip = camera.view_projection() * Vec3::new(0.0, 0.0, 100.0).extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn viewport_sets_aspect() {
        let mut camera = Camera::default();
        camera.set_viewport(800, 400);
        assert_eq!(camera.aspect, 2.0);
        camera.set_viewport(0, 400);
        assert_eq!(camera.aspect, 2.0);
    }
}
