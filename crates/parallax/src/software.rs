//! CPU implementation of the pass executor.
//!
//! Renders the layer stack by casting one ray per pixel through the camera
//! and blending the planes it hits from farthest to nearest, then applies
//! the effect passes with the same formulas as the shaders. It backs
//! headless export and gives tests exact pixels to compare.

use glam::{Mat4, Vec2, Vec3};
use image::{Rgba, RgbaImage};

use crate::effects::{curtain_shift, rgb_split_offset, Pass, PassExecutor, PassKind};
use crate::error::RenderError;
use crate::layers::Blend;
use crate::render_loop::StopHandle;
use crate::scene::Scene;

const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 255]);

pub struct SoftwareCompositor {
    width: u32,
    height: u32,
    presented: Option<RgbaImage>,
    frames: u64,
    budget: Option<(u64, StopHandle)>,
}

struct PlaneHit<'a> {
    distance: f32,
    uv: Vec2,
    base: &'a RgbaImage,
    mask: Option<&'a RgbaImage>,
}

struct PreparedPlane<'a> {
    inverse: Mat4,
    half_size: Vec2,
    base: &'a RgbaImage,
    mask: Option<&'a RgbaImage>,
}

impl SoftwareCompositor {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::missing_surface(format!(
                "software target must be non-empty (got {width}x{height})"
            )));
        }
        Ok(Self {
            width,
            height,
            presented: None,
            frames: 0,
            budget: None,
        })
    }

    /// Raises `stop` once `frames` frames have been presented.
    pub fn with_frame_budget(mut self, frames: u64, stop: StopHandle) -> Self {
        self.budget = Some((frames, stop));
        self
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Last presented frame, if any.
    pub fn frame(&self) -> Option<&RgbaImage> {
        self.presented.as_ref()
    }

    pub fn take_frame(&mut self) -> Option<RgbaImage> {
        self.presented.take()
    }

    fn prepare<'a>(&self, scene: &'a Scene) -> Vec<PreparedPlane<'a>> {
        let textures = scene.layers.textures();
        let half_size = scene.layers.layout().plane_size * 0.5;
        let mut prepared = Vec::new();
        for group in scene.layers.groups() {
            for plane in group.planes() {
                let material = plane.material();
                // Unready bases are skipped; an unready mask hides the plane.
                let Some(base) = textures.image(material.base) else {
                    continue;
                };
                let mask = match material.blend {
                    Blend::Opaque => None,
                    Blend::Masked { mask } => match textures.image(mask) {
                        Some(mask) => Some(mask),
                        None => continue,
                    },
                };
                prepared.push(PreparedPlane {
                    inverse: group.plane_transform(plane).inverse(),
                    half_size,
                    base,
                    mask,
                });
            }
        }
        prepared
    }
}

impl PassExecutor for SoftwareCompositor {
    type Frame = RgbaImage;

    fn render_scene(&mut self, scene: &Scene) -> Result<RgbaImage, RenderError> {
        let mut camera = scene.camera;
        camera.set_viewport(self.width, self.height);
        let slope = camera.half_height_slope();
        let origin = camera.position;
        let planes = self.prepare(scene);

        let mut frame = RgbaImage::from_pixel(self.width, self.height, CLEAR);
        if planes.is_empty() {
            return Ok(frame);
        }

        let mut hits: Vec<PlaneHit<'_>> = Vec::with_capacity(planes.len());
        for (x, y, pixel) in frame.enumerate_pixels_mut() {
            let ndc = Vec2::new(
                (x as f32 + 0.5) / self.width as f32 * 2.0 - 1.0,
                1.0 - (y as f32 + 0.5) / self.height as f32 * 2.0,
            );
            let direction = Vec3::new(ndc.x * slope * camera.aspect, ndc.y * slope, -1.0);

            hits.clear();
            hits.extend(planes.iter().filter_map(|plane| intersect(plane, origin, direction)));
            if hits.is_empty() {
                continue;
            }
            hits.sort_by(|a, b| b.distance.total_cmp(&a.distance));

            let mut colour = [0.0_f32, 0.0, 0.0];
            for hit in &hits {
                let texel = sample(hit.base, hit.uv);
                let alpha = match hit.mask {
                    None => 1.0,
                    Some(mask) => {
                        sample(mask, hit.uv)[1] as f32 / 255.0 * texel[3] as f32 / 255.0
                    }
                };
                for (channel, value) in colour.iter_mut().enumerate() {
                    *value = *value * (1.0 - alpha) + texel[channel] as f32 * alpha;
                }
            }
            *pixel = Rgba([
                colour[0].round().clamp(0.0, 255.0) as u8,
                colour[1].round().clamp(0.0, 255.0) as u8,
                colour[2].round().clamp(0.0, 255.0) as u8,
                255,
            ]);
        }
        Ok(frame)
    }

    fn apply_effect(
        &mut self,
        index: usize,
        pass: &Pass,
        input: RgbaImage,
    ) -> Result<RgbaImage, RenderError> {
        let (width, height) = input.dimensions();
        let progress = pass.progress();
        tracing::trace!(index, pass = pass.kind().name(), progress, "software effect pass");
        let output = match pass.kind() {
            PassKind::Render => {
                return Err(RenderError::PassOrder {
                    kind: pass.kind().name(),
                    index,
                })
            }
            PassKind::Curtain => {
                let strips = pass.float("uStrips");
                let stagger = pass.float("uStagger");
                RgbaImage::from_fn(width, height, |x, y| {
                    let uv = pixel_uv(x, y, width, height);
                    let source = uv.y + curtain_shift(uv.x, progress, strips, stagger);
                    if source > 1.0 {
                        CLEAR
                    } else {
                        *sample(&input, Vec2::new(uv.x, source))
                    }
                })
            }
            PassKind::RgbSplit => {
                let offset =
                    rgb_split_offset(progress, pass.float("uAmount"), pass.vec2("uDirection"));
                RgbaImage::from_fn(width, height, |x, y| {
                    let uv = pixel_uv(x, y, width, height);
                    let centre = sample(&input, uv);
                    Rgba([
                        sample(&input, uv + offset)[0],
                        centre[1],
                        sample(&input, uv - offset)[2],
                        centre[3],
                    ])
                })
            }
        };
        Ok(output)
    }

    fn present(&mut self, frame: RgbaImage) -> Result<(), RenderError> {
        self.presented = Some(frame);
        self.frames += 1;
        if let Some((limit, stop)) = &self.budget {
            if self.frames >= *limit {
                stop.stop();
            }
        }
        Ok(())
    }
}

fn intersect<'a>(plane: &PreparedPlane<'a>, origin: Vec3, direction: Vec3) -> Option<PlaneHit<'a>> {
    let local_origin = plane.inverse.transform_point3(origin);
    let local_direction = plane.inverse.transform_vector3(direction);
    if local_direction.z.abs() < f32::EPSILON {
        return None;
    }
    let distance = -local_origin.z / local_direction.z;
    if distance <= 0.0 {
        return None;
    }
    let hit = local_origin + local_direction * distance;
    if hit.x.abs() > plane.half_size.x || hit.y.abs() > plane.half_size.y {
        return None;
    }
    Some(PlaneHit {
        distance,
        uv: Vec2::new(
            hit.x / (plane.half_size.x * 2.0) + 0.5,
            0.5 - hit.y / (plane.half_size.y * 2.0),
        ),
        base: plane.base,
        mask: plane.mask,
    })
}

/// Texture coordinate of a pixel centre, `v` growing downwards.
fn pixel_uv(x: u32, y: u32, width: u32, height: u32) -> Vec2 {
    Vec2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    )
}

/// Nearest-neighbour lookup with clamp-to-edge addressing.
fn sample(image: &RgbaImage, uv: Vec2) -> &Rgba<u8> {
    let (width, height) = image.dimensions();
    let x = (uv.x * width as f32).floor().clamp(0.0, (width - 1) as f32) as u32;
    let y = (uv.y * height as f32).floor().clamp(0.0, (height - 1) as f32) as u32;
    image.get_pixel(x, y)
}
