//! winit preview window: keyboard controls, pointer input and frame pacing
//! around a [`RenderLoop`] drawing through the GPU backend.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::controls::{ControlAction, ControlPanel};
use crate::error::RenderError;
use crate::gpu::GpuState;
use crate::pointer::PointerInput;
use crate::render_loop::RenderLoop;
use crate::runtime::FramePacer;
use crate::session::SceneSession;
use crate::types::RendererConfig;

/// What a key press asks the preview to do.
#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyCommand {
    Control(ControlAction),
    Quit,
}

/// Window-side state: GPU resources, the render loop and the input plumbing.
struct WindowState {
    // Declared before `window` so the surface drops first.
    gpu: GpuState,
    window: Arc<Window>,
    render_loop: RenderLoop,
    pointer: PointerInput,
    panel: ControlPanel,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig, session: SceneSession) -> Result<Self> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.as_ref(), size, config.color_space, config.vsync)?;
        let mut render_loop = session.into_render_loop();
        render_loop.resize(size.width, size.height);
        let pointer = render_loop.pointer_input();
        Ok(Self {
            gpu,
            window,
            render_loop,
            pointer,
            panel: ControlPanel::new(),
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
        self.render_loop.resize(new_size.width, new_size.height);
    }

    fn handle_key(&mut self, event: &KeyEvent) -> Option<KeyCommand> {
        if event.state != ElementState::Pressed {
            return None;
        }
        let command = match &event.logical_key {
            Key::Named(NamedKey::Space) | Key::Named(NamedKey::Enter) if !event.repeat => {
                KeyCommand::Control(self.panel.run_animation())
            }
            Key::Character(value) if value.as_str() == " " && !event.repeat => {
                KeyCommand::Control(self.panel.run_animation())
            }
            Key::Named(NamedKey::ArrowUp) => KeyCommand::Control(self.panel.nudge_progress2(1)),
            Key::Named(NamedKey::ArrowDown) => KeyCommand::Control(self.panel.nudge_progress2(-1)),
            Key::Named(NamedKey::ArrowRight) => KeyCommand::Control(self.panel.nudge_progress(1)),
            Key::Named(NamedKey::ArrowLeft) => KeyCommand::Control(self.panel.nudge_progress(-1)),
            Key::Named(NamedKey::Escape) => KeyCommand::Quit,
            _ => return None,
        };
        if let KeyCommand::Control(action) = command {
            tracing::debug!(?action, "control changed");
            self.render_loop.apply_control(action);
        }
        Some(command)
    }

    /// Ticks the loop onto the GPU. Returns `false` when the preview must
    /// close.
    fn render_frame(&mut self) -> bool {
        match self.render_loop.tick(&mut self.gpu) {
            Ok(()) => true,
            Err(err) => match err.as_surface_error() {
                Some(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = self.gpu.size();
                    self.resize(size);
                    true
                }
                Some(wgpu::SurfaceError::OutOfMemory) => {
                    tracing::error!("surface out of memory; exiting preview");
                    false
                }
                Some(wgpu::SurfaceError::Timeout) => {
                    tracing::warn!("surface timeout; retrying next frame");
                    true
                }
                _ => true,
            },
        }
    }
}

/// Opens the preview window and drives the winit event loop until the
/// window closes.
///
/// Each redraw runs one [`RenderLoop::tick`]; the pacer decides when the
/// next redraw is requested.
pub fn run_window(config: RendererConfig) -> Result<()> {
    let (width, height) = config.surface_size;
    if width == 0 || height == 0 {
        return Err(RenderError::missing_surface(format!(
            "requested window size {width}x{height}"
        ))
        .into());
    }

    let session = SceneSession::spawn(&config)?;

    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| RenderError::missing_surface(format!("failed to create window: {err}")))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config, session)?;
    let mut pacer = FramePacer::new(config.target_fps);
    if let Some(interval) = pacer.interval() {
        tracing::debug!(interval_ms = interval.as_millis() as u64, "frame cap enabled");
    }
    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if state.handle_key(&event) == Some(KeyCommand::Quit) {
                            elwt.exit();
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let size = state.gpu.size();
                        state.pointer.on_pointer_move(
                            position.x as f32,
                            position.y as f32,
                            (size.width, size.height),
                        );
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                    }
                    WindowEvent::ScaleFactorChanged {
                        mut inner_size_writer,
                        ..
                    } => {
                        let _ = inner_size_writer.request_inner_size(state.gpu.size());
                    }
                    WindowEvent::RedrawRequested => {
                        if !state.render_frame() {
                            elwt.exit();
                        }
                        pacer.mark_rendered(Instant::now());
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let now = Instant::now();
                if pacer.ready_for_frame(now) {
                    tracing::trace!("pacer: issuing redraw now");
                    state.window().request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                } else if let Some(deadline) = pacer.next_deadline() {
                    let ms = deadline.saturating_duration_since(now).as_millis();
                    tracing::trace!(deadline_ms = ms as u64, "pacer: waiting until next frame");
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}
