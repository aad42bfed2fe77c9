use wgpu::naga::ShaderStage;

use crate::effects::PassKind;

use super::shaders;

/// Bind group layouts, samplers and render pipelines shared by every frame.
pub(crate) struct Pipelines {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
    pub input_layout: wgpu::BindGroupLayout,
    pub plane_sampler: wgpu::Sampler,
    pub input_sampler: wgpu::Sampler,
    pub plane: wgpu::RenderPipeline,
    pub curtain: wgpu::RenderPipeline,
    pub rgb_split: wgpu::RenderPipeline,
    pub blit: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material layout"),
            entries: &[texture_entry(0), texture_entry(1), sampler_entry(2)],
        });
        let input_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("input layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });

        let plane_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("plane sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let input_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("input sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let plane_vertex = shaders::compile(device, "plane vertex", shaders::PLANE_VERTEX, ShaderStage::Vertex);
        let plane_fragment = shaders::compile(
            device,
            "plane fragment",
            shaders::PLANE_FRAGMENT,
            ShaderStage::Fragment,
        );
        let fullscreen_vertex = shaders::compile(
            device,
            "fullscreen triangle vertex",
            shaders::FULLSCREEN_VERTEX,
            ShaderStage::Vertex,
        );

        let plane = build_pipeline(
            device,
            "plane pipeline",
            &[&uniform_layout, &material_layout],
            &plane_vertex,
            &plane_fragment,
            target_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );

        let effect = |kind: PassKind| {
            let source = shaders::effect_fragment(kind).unwrap_or(shaders::BLIT_FRAGMENT);
            let fragment = shaders::compile(device, kind.name(), source, ShaderStage::Fragment);
            build_pipeline(
                device,
                kind.name(),
                &[&uniform_layout, &input_layout],
                &fullscreen_vertex,
                &fragment,
                target_format,
                None,
            )
        };
        let curtain = effect(PassKind::Curtain);
        let rgb_split = effect(PassKind::RgbSplit);

        let blit_fragment = shaders::compile(device, "blit fragment", shaders::BLIT_FRAGMENT, ShaderStage::Fragment);
        let blit = build_pipeline(
            device,
            "blit pipeline",
            &[&input_layout],
            &fullscreen_vertex,
            &blit_fragment,
            target_format,
            None,
        );

        Self {
            uniform_layout,
            material_layout,
            input_layout,
            plane_sampler,
            input_sampler,
            plane,
            curtain,
            rgb_split,
            blit,
        }
    }

    pub fn effect(&self, kind: PassKind) -> Option<&wgpu::RenderPipeline> {
        match kind {
            PassKind::Render => None,
            PassKind::Curtain => Some(&self.curtain),
            PassKind::RgbSplit => Some(&self.rgb_split),
        }
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    vertex: &wgpu::ShaderModule,
    fragment: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}
