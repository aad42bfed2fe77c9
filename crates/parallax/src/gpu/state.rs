use std::collections::HashMap;

use anyhow::Result;
use glam::{Mat4, Vec3};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::effects::{Pass, PassExecutor};
use crate::error::RenderError;
use crate::layers::Blend;
use crate::scene::Scene;
use crate::textures::TextureHandle;
use crate::types::ColorSpaceMode;

use super::context::GpuContext;
use super::pipeline::Pipelines;
use super::textures::GpuTextures;
use super::uniforms::{EffectUniforms, PlaneUniforms};

/// Offscreen colour target that effect passes read from and write to.
struct RenderTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    input_group: wgpu::BindGroup,
}

struct PlaneSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct FrameInFlight {
    surface: wgpu::SurfaceTexture,
    encoder: wgpu::CommandEncoder,
}

/// Index of the ping-pong target holding a pass' output.
pub(crate) struct GpuFrame {
    target: usize,
}

type MaterialKey = (TextureHandle, Option<TextureHandle>);

/// GPU pass executor: planes into target A, effects ping-pong between A
/// and B, and a final blit onto the swapchain.
pub(crate) struct GpuState {
    context: GpuContext,
    pipelines: Pipelines,
    textures: GpuTextures,
    targets: [RenderTarget; 2],
    plane_slots: Vec<PlaneSlot>,
    materials: HashMap<MaterialKey, wgpu::BindGroup>,
    effect_buffer: wgpu::Buffer,
    effect_group: wgpu::BindGroup,
    frame: Option<FrameInFlight>,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        size: PhysicalSize<u32>,
        color_space: ColorSpaceMode,
        vsync: bool,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size, color_space, vsync)?;
        let pipelines = Pipelines::new(&context.device, context.surface_format);
        let textures = GpuTextures::new(&context.device, &context.queue, context.color_space);
        let targets = create_targets(&context, &pipelines);

        let effect_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("effect uniforms"),
            size: std::mem::size_of::<EffectUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let effect_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("effect uniform bind group"),
            layout: &pipelines.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: effect_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            context,
            pipelines,
            textures,
            targets,
            plane_slots: Vec::new(),
            materials: HashMap::new(),
            effect_buffer,
            effect_group,
            frame: None,
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.targets = create_targets(&self.context, &self.pipelines);
    }

    fn ensure_plane_slots(&mut self, count: usize) {
        while self.plane_slots.len() < count {
            let index = self.plane_slots.len();
            let buffer = self.context.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("plane uniforms #{index}")),
                size: std::mem::size_of::<PlaneUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("plane uniform bind group #{index}")),
                layout: &self.pipelines.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.plane_slots.push(PlaneSlot { buffer, bind_group });
        }
    }

    /// Bind group for a material whose textures are all uploaded.
    fn material_group(&mut self, key: MaterialKey) -> Option<&wgpu::BindGroup> {
        if !self.materials.contains_key(&key) {
            let base = self.textures.get(key.0)?;
            let mask = match key.1 {
                Some(handle) => self.textures.get(handle)?,
                None => self.textures.placeholder(),
            };
            let group = self.context.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("material bind group"),
                layout: &self.pipelines.material_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&base.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&mask.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.pipelines.plane_sampler),
                    },
                ],
            });
            self.materials.insert(key, group);
        }
        self.materials.get(&key)
    }
}

impl PassExecutor for GpuState {
    type Frame = GpuFrame;

    fn render_scene(&mut self, scene: &Scene) -> Result<GpuFrame, RenderError> {
        if self.frame.is_some() {
            tracing::warn!("previous frame was never presented; dropping it");
            self.frame = None;
        }
        let surface = self.context.surface.get_current_texture()?;

        let uploads = self.textures.sync(
            &self.context.device,
            &self.context.queue,
            scene.layers.textures(),
        );
        if uploads > 0 {
            tracing::debug!(uploads, "uploaded newly loaded textures");
        }

        let mut camera = scene.camera;
        camera.set_viewport(self.context.size.width, self.context.size.height);
        let view = camera.view();
        let view_projection = camera.view_projection();
        let half = scene.layers.layout().plane_size * 0.5;
        let scale = Mat4::from_scale(Vec3::new(half.x, half.y, 1.0));

        // Painter's order: farthest plane first.
        let mut draws = Vec::new();
        for group in scene.layers.groups() {
            for plane in group.planes() {
                let material = plane.material();
                let mask = match material.blend {
                    Blend::Opaque => None,
                    Blend::Masked { mask } => Some(mask),
                };
                let model = group.plane_transform(plane);
                let depth = (view * model).transform_point3(Vec3::ZERO).z;
                draws.push((depth, (material.base, mask), view_projection * model * scale));
            }
        }
        draws.sort_by(|a, b| a.0.total_cmp(&b.0));
        self.ensure_plane_slots(draws.len());

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });

        let mut bound = Vec::with_capacity(draws.len());
        for (slot, (_, key, mvp)) in draws.iter().enumerate() {
            if self.material_group(*key).is_none() {
                continue;
            }
            self.context.queue.write_buffer(
                &self.plane_slots[slot].buffer,
                0,
                bytemuck::bytes_of(&PlaneUniforms::new(*mvp, key.1.is_some())),
            );
            bound.push((slot, *key));
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("layer pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets[0].view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.plane);
            for (slot, key) in &bound {
                let Some(material) = self.materials.get(key) else {
                    continue;
                };
                pass.set_bind_group(0, &self.plane_slots[*slot].bind_group, &[]);
                pass.set_bind_group(1, material, &[]);
                pass.draw(0..6, 0..1);
            }
        }

        self.frame = Some(FrameInFlight { surface, encoder });
        Ok(GpuFrame { target: 0 })
    }

    fn apply_effect(
        &mut self,
        index: usize,
        pass: &Pass,
        input: GpuFrame,
    ) -> Result<GpuFrame, RenderError> {
        let Some(pipeline) = self.pipelines.effect(pass.kind()) else {
            return Err(RenderError::PassOrder {
                kind: pass.kind().name(),
                index,
            });
        };
        let frame = self
            .frame
            .as_mut()
            .ok_or(RenderError::FrameNotStarted(index))?;
        let output = 1 - input.target;

        // Stage this pass' uniforms on the encoder so each pass reads its own values.
        let staging = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("effect uniform staging"),
                contents: bytemuck::bytes_of(&EffectUniforms::from_pass(pass)),
                usage: wgpu::BufferUsages::COPY_SRC,
            });
        frame.encoder.copy_buffer_to_buffer(
            &staging,
            0,
            &self.effect_buffer,
            0,
            std::mem::size_of::<EffectUniforms>() as u64,
        );

        let mut render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.kind().name()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.targets[output].view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.effect_group, &[]);
        render_pass.set_bind_group(1, &self.targets[input.target].input_group, &[]);
        render_pass.draw(0..3, 0..1);
        drop(render_pass);

        Ok(GpuFrame { target: output })
    }

    fn present(&mut self, result: GpuFrame) -> Result<(), RenderError> {
        let FrameInFlight {
            surface,
            mut encoder,
        } = self
            .frame
            .take()
            .ok_or(RenderError::FrameNotStarted(usize::MAX))?;
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("present blit"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipelines.blit);
            pass.set_bind_group(0, &self.targets[result.target].input_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
        surface.present();
        Ok(())
    }
}

fn create_targets(context: &GpuContext, pipelines: &Pipelines) -> [RenderTarget; 2] {
    [0, 1].map(|index| {
        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("offscreen target #{index}")),
            size: wgpu::Extent3d {
                width: context.size.width.max(1),
                height: context.size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: context.surface_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let input_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("offscreen input #{index}")),
            layout: &pipelines.input_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&pipelines.input_sampler),
                },
            ],
        });
        RenderTarget {
            _texture: texture,
            view,
            input_group,
        }
    })
}
