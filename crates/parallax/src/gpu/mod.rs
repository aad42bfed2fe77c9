//! wgpu backend for the effect chain.
//!
//! - `context` owns instance/device/surface wiring and rebuilds swapchain
//!   state when the window resizes.
//! - `textures` uploads layer images once they finish decoding.
//! - `shaders` holds the GLSL for planes, effects and the final blit.
//! - `pipeline` builds the bind group layouts and render pipelines.
//! - `uniforms` mirrors the shader uniform blocks.
//! - `state` implements [`PassExecutor`](crate::effects::PassExecutor) with
//!   two ping-pong offscreen targets.

mod context;
mod pipeline;
mod shaders;
mod state;
mod textures;
mod uniforms;

pub(crate) use state::GpuState;
