//! Parallax image stacks with animated post-processing.
//!
//! Each base image becomes a group of depth-stacked planes: an opaque
//! backdrop plus masked cut-outs in front of it. The groups tilt toward a
//! smoothed pointer, breathe along the view axis with a slow oscillator, and
//! are composited through an ordered chain of full-screen effects that a
//! declarative timeline can animate. The overall flow is:
//!
//! ```text
//!   RendererConfig ──▶ SceneSession ──▶ RenderLoop::tick()
//!                                          │ pointer · oscillator · timeline
//!                                          ▼
//!                          LayerStack::apply_frame ─▶ EffectChain::composite
//!                                                          │
//!                                   GpuState (window) ◀────┴────▶ SoftwareCompositor
//! ```
//!
//! The window host drives [`RenderLoop::tick`] from winit redraws; headless
//! export drives [`RenderLoop::run_until_stopped`] on the CPU compositor.

pub mod camera;
pub mod controls;
pub mod effects;
pub mod error;
mod gpu;
pub mod layers;
pub mod pointer;
pub mod render_loop;
pub mod runtime;
pub mod scene;
pub mod session;
pub mod software;
pub mod textures;
pub mod timeline;
pub mod types;
mod window;

pub use camera::Camera;
pub use controls::{ControlAction, ControlPanel, Parameter};
pub use effects::{EffectChain, Pass, PassExecutor, PassKind, UniformValue, PROGRESS_UNIFORM};
pub use error::RenderError;
pub use layers::{LayerStack, StackLayout};
pub use pointer::{PointerInput, PointerTracker};
pub use render_loop::{oscillator, LoopTuning, RenderLoop, StopHandle};
pub use runtime::FramePacer;
pub use scene::Scene;
pub use session::{render_offscreen, ExportOptions, SceneSession};
pub use software::SoftwareCompositor;
pub use textures::{AssetLoader, TextureHandle, TextureSet};
pub use timeline::{Easing, Timeline, TimelineState, Track, TrackTarget};
pub use types::{ColorSpaceMode, CurtainTuning, RendererConfig, RgbSplitTuning, SceneTuning};
pub use window::run_window;
