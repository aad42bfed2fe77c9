use std::path::PathBuf;

use glam::Vec2;

use crate::camera::Camera;
use crate::effects::{
    EffectChain, Pass, DEFAULT_CURTAIN_STAGGER, DEFAULT_CURTAIN_STRIPS, DEFAULT_RGB_AMOUNT,
};
use crate::error::RenderError;
use crate::layers::StackLayout;
use crate::pointer::{PointerTracker, DEFAULT_POINTER_BIAS, DEFAULT_SMOOTHING};
use crate::render_loop::LoopTuning;

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Prefer a non-sRGB swapchain so texture colours pass through untouched.
    #[default]
    Auto,
    /// Treat textures as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Decode textures to linear and let an sRGB swapchain re-encode them.
    Linear,
}

impl std::fmt::Display for ColorSpaceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorSpaceMode::Auto => f.write_str("auto"),
            ColorSpaceMode::Gamma => f.write_str("gamma"),
            ColorSpaceMode::Linear => f.write_str("linear"),
        }
    }
}

/// Curtain pass constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurtainTuning {
    pub strips: f32,
    pub stagger: f32,
}

impl Default for CurtainTuning {
    fn default() -> Self {
        Self {
            strips: DEFAULT_CURTAIN_STRIPS,
            stagger: DEFAULT_CURTAIN_STAGGER,
        }
    }
}

/// RGB split pass constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbSplitTuning {
    pub amount: f32,
    pub direction: Vec2,
}

impl Default for RgbSplitTuning {
    fn default() -> Self {
        Self {
            amount: DEFAULT_RGB_AMOUNT,
            direction: Vec2::X,
        }
    }
}

/// Every tunable constant of a scene, independent of how it is presented.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneTuning {
    pub layout: StackLayout,
    pub camera: Camera,
    pub pointer_bias: Vec2,
    pub smoothing: f32,
    pub clock: LoopTuning,
    pub curtain: CurtainTuning,
    pub rgb_split: RgbSplitTuning,
}

impl Default for SceneTuning {
    fn default() -> Self {
        Self {
            layout: StackLayout::default(),
            camera: Camera::default(),
            pointer_bias: DEFAULT_POINTER_BIAS,
            smoothing: DEFAULT_SMOOTHING,
            clock: LoopTuning::default(),
            curtain: CurtainTuning::default(),
            rgb_split: RgbSplitTuning::default(),
        }
    }
}

impl SceneTuning {
    pub fn pointer_tracker(&self) -> PointerTracker {
        PointerTracker::new(self.pointer_bias, self.smoothing)
    }

    /// Render pass, curtain, RGB split, with the tuned uniforms.
    pub fn effect_chain(&self) -> Result<EffectChain, RenderError> {
        let mut chain = EffectChain::new();
        chain.add_pass(Pass::render())?;
        chain.add_pass(Pass::curtain_with(self.curtain.strips, self.curtain.stagger))?;
        chain.add_pass(Pass::rgb_split_with(
            self.rgb_split.amount,
            self.rgb_split.direction,
        ))?;
        Ok(chain)
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags and preset files: which images to
/// stack, how large the surface is and how frames are paced and presented.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Window or surface size in physical pixels.
    pub surface_size: (u32, u32),
    /// Base images, one parallax group each, in display order.
    pub images: Vec<PathBuf>,
    /// Alpha mask shared by every masked plane (green channel). Without
    /// one the masked planes stay invisible.
    pub mask: Option<PathBuf>,
    /// Optional FPS cap; None = render every redraw.
    pub target_fps: Option<f32>,
    /// Wait for vertical blank when presenting.
    pub vsync: bool,
    /// Desired color handling for swapchain/textures.
    pub color_space: ColorSpaceMode,
    pub title: String,
    pub tuning: SceneTuning,
}

impl Default for RendererConfig {
    /// A 1280x720 window with vsync and no images selected.
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            images: Vec::new(),
            mask: None,
            target_fps: None,
            vsync: true,
            color_space: ColorSpaceMode::default(),
            title: "Parallax Preview".to_string(),
            tuning: SceneTuning::default(),
        }
    }
}
