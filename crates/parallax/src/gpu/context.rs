use anyhow::{anyhow, Context as AnyhowContext, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::error::RenderError;
use crate::types::ColorSpaceMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SurfaceColorSpace {
    Gamma,
    Linear,
}

impl SurfaceColorSpace {
    /// Format used for uploaded images so sampling matches the swapchain.
    pub(crate) fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
            SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

/// Instance, device and configured surface for one window.
pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub surface_format: wgpu::TextureFormat,
    pub color_space: SurfaceColorSpace,
}

impl GpuContext {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        color_space: ColorSpaceMode,
        vsync: bool,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        if initial_size.width == 0 || initial_size.height == 0 {
            return Err(RenderError::missing_surface(format!(
                "window reported a {}x{} surface",
                initial_size.width, initial_size.height
            ))
            .into());
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let window_handle = target
            .window_handle()
            .map_err(|err| RenderError::missing_surface(format!("no window handle: {err}")))?;
        let display_handle = target
            .display_handle()
            .map_err(|err| RenderError::missing_surface(format!("no display handle: {err}")))?;

        // SAFETY: the window outlives the context; `GpuState` is dropped
        // before the window in the host.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .context("failed to create rendering surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        if initial_size.width > max_dimension || initial_size.height > max_dimension {
            anyhow::bail!(
                "GPU max texture dimension is {max_dimension}, requested surface is {}x{}",
                initial_size.width,
                initial_size.height
            );
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let first_format = *surface_caps
            .formats
            .first()
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
        let color_space = match color_space {
            ColorSpaceMode::Auto | ColorSpaceMode::Gamma => SurfaceColorSpace::Gamma,
            ColorSpaceMode::Linear => SurfaceColorSpace::Linear,
        };
        let wants_srgb = color_space == SurfaceColorSpace::Linear;
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb() == wants_srgb)
            .unwrap_or_else(|| {
                tracing::warn!(
                    fallback = ?first_format,
                    wants_srgb,
                    "preferred surface format unavailable; using first supported format"
                );
                first_format
            });

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("parallax device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(limits),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        let present_mode = pick_present_mode(&surface_caps, vsync);
        tracing::debug!(?present_mode, vsync, ?surface_format, "configuring surface");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: initial_size.width,
            height: initial_size.height,
            present_mode,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            size: initial_size,
            surface_format,
            color_space,
        })
    }

    /// Reconfigures the swapchain; zero-sized requests (minimised windows)
    /// are ignored.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }
}

/// Fifo when vsync is on; otherwise Immediate, then Mailbox, then Fifo.
fn pick_present_mode(caps: &wgpu::SurfaceCapabilities, vsync: bool) -> wgpu::PresentMode {
    let has = |mode: wgpu::PresentMode| caps.present_modes.contains(&mode);
    if !vsync {
        for mode in [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox] {
            if has(mode) {
                return mode;
            }
        }
    }
    if has(wgpu::PresentMode::Fifo) {
        wgpu::PresentMode::Fifo
    } else {
        caps.present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo)
    }
}
