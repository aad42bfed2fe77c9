//! Ordered post-processing chain.
//!
//! The chain always starts with the render pass that draws the [`Scene`];
//! every later pass is a full-screen effect that reads the previous pass'
//! output. Effects declare their uniforms up front and must leave the input
//! untouched while `uProgress` is zero, so an idle chain costs nothing
//! visually even though no pass is ever skipped.

use std::collections::BTreeMap;

use glam::Vec2;

use crate::error::RenderError;
use crate::scene::Scene;

/// Name of the transition uniform every effect pass declares.
pub const PROGRESS_UNIFORM: &str = "uProgress";

pub const DEFAULT_CURTAIN_STRIPS: f32 = 10.0;
pub const DEFAULT_CURTAIN_STAGGER: f32 = 0.5;
pub const DEFAULT_RGB_AMOUNT: f32 = 0.04;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
}

impl UniformValue {
    pub fn as_float(self) -> Option<f32> {
        match self {
            UniformValue::Float(value) => Some(value),
            UniformValue::Vec2(_) => None,
        }
    }

    pub fn as_vec2(self) -> Option<Vec2> {
        match self {
            UniformValue::Vec2(value) => Some(value),
            UniformValue::Float(_) => None,
        }
    }

    fn same_kind(self, other: UniformValue) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<Vec2> for UniformValue {
    fn from(value: Vec2) -> Self {
        UniformValue::Vec2(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Draws the layer stack through the camera.
    Render,
    /// Vertical strips slide away one after another.
    Curtain,
    /// Red and blue channels drift apart along a direction.
    RgbSplit,
}

impl PassKind {
    pub fn name(self) -> &'static str {
        match self {
            PassKind::Render => "render",
            PassKind::Curtain => "curtain",
            PassKind::RgbSplit => "rgb-split",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    kind: PassKind,
    uniforms: BTreeMap<&'static str, UniformValue>,
}

impl Pass {
    pub fn render() -> Self {
        Self {
            kind: PassKind::Render,
            uniforms: BTreeMap::new(),
        }
    }

    pub fn curtain() -> Self {
        Self::curtain_with(DEFAULT_CURTAIN_STRIPS, DEFAULT_CURTAIN_STAGGER)
    }

    pub fn curtain_with(strips: f32, stagger: f32) -> Self {
        let mut uniforms = BTreeMap::new();
        uniforms.insert(PROGRESS_UNIFORM, UniformValue::Float(0.0));
        uniforms.insert("uStrips", UniformValue::Float(strips.max(1.0)));
        uniforms.insert("uStagger", UniformValue::Float(stagger));
        Self {
            kind: PassKind::Curtain,
            uniforms,
        }
    }

    pub fn rgb_split() -> Self {
        Self::rgb_split_with(DEFAULT_RGB_AMOUNT, Vec2::X)
    }

    pub fn rgb_split_with(amount: f32, direction: Vec2) -> Self {
        let mut uniforms = BTreeMap::new();
        uniforms.insert(PROGRESS_UNIFORM, UniformValue::Float(0.0));
        uniforms.insert("uAmount", UniformValue::Float(amount));
        uniforms.insert(
            "uDirection",
            UniformValue::Vec2(direction.try_normalize().unwrap_or(Vec2::X)),
        );
        Self {
            kind: PassKind::RgbSplit,
            uniforms,
        }
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&'static str, UniformValue)> + '_ {
        self.uniforms.iter().map(|(name, value)| (*name, *value))
    }

    /// Declared float uniform, or `0.0` when absent.
    pub fn float(&self, name: &str) -> f32 {
        self.uniform(name)
            .and_then(UniformValue::as_float)
            .unwrap_or(0.0)
    }

    pub fn vec2(&self, name: &str) -> Vec2 {
        self.uniform(name)
            .and_then(UniformValue::as_vec2)
            .unwrap_or(Vec2::ZERO)
    }

    pub fn progress(&self) -> f32 {
        self.float(PROGRESS_UNIFORM)
    }

    /// Writes a declared uniform. Undeclared names and mismatched value
    /// kinds are rejected.
    fn set(&mut self, name: &str, value: UniformValue) -> bool {
        let Some(slot) = self.uniforms.get_mut(name) else {
            return false;
        };
        if !slot.same_kind(value) {
            return false;
        }
        *slot = match value {
            UniformValue::Float(v) if name == PROGRESS_UNIFORM => {
                UniformValue::Float(v.clamp(0.0, 1.0))
            }
            other => other,
        };
        true
    }
}

/// Backend that turns the chain into pixels.
///
/// The chain calls `render_scene` once, `apply_effect` once per effect in
/// order, then `present` with the last output.
pub trait PassExecutor {
    type Frame;

    fn render_scene(&mut self, scene: &Scene) -> Result<Self::Frame, RenderError>;

    fn apply_effect(
        &mut self,
        index: usize,
        pass: &Pass,
        input: Self::Frame,
    ) -> Result<Self::Frame, RenderError>;

    fn present(&mut self, frame: Self::Frame) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Default)]
pub struct EffectChain {
    passes: Vec<Pass>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render pass, curtain, RGB split.
    pub fn standard() -> Self {
        let mut chain = Self::new();
        chain.passes = vec![Pass::render(), Pass::curtain(), Pass::rgb_split()];
        chain
    }

    /// Appends a pass and returns its index. The render pass must come first
    /// and only once.
    pub fn add_pass(&mut self, pass: Pass) -> Result<usize, RenderError> {
        let index = self.passes.len();
        let is_render = pass.kind == PassKind::Render;
        if is_render != (index == 0) {
            return Err(RenderError::PassOrder {
                kind: pass.kind.name(),
                index,
            });
        }
        self.passes.push(pass);
        Ok(index)
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn pass(&self, index: usize) -> Option<&Pass> {
        self.passes.get(index)
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Sets a uniform on one pass. Unknown passes or names are logged and
    /// ignored; returns whether the value was stored.
    pub fn set_uniform(&mut self, index: usize, name: &str, value: impl Into<UniformValue>) -> bool {
        let value = value.into();
        let Some(pass) = self.passes.get_mut(index) else {
            tracing::warn!(index, uniform = name, "uniform write for unknown pass ignored");
            return false;
        };
        let stored = pass.set(name, value);
        if !stored {
            tracing::warn!(
                index,
                pass = pass.kind.name(),
                uniform = name,
                ?value,
                "pass does not declare uniform; ignoring"
            );
        }
        stored
    }

    pub fn uniform(&self, index: usize, name: &str) -> Option<UniformValue> {
        self.passes.get(index).and_then(|pass| pass.uniform(name))
    }

    /// Runs every pass in insertion order and presents the result.
    pub fn composite<E: PassExecutor>(
        &self,
        executor: &mut E,
        scene: &Scene,
    ) -> Result<(), RenderError> {
        let Some((first, effects)) = self.passes.split_first() else {
            return Err(RenderError::EmptyChain);
        };
        if first.kind != PassKind::Render {
            return Err(RenderError::PassOrder {
                kind: first.kind.name(),
                index: 0,
            });
        }

        let mut frame = executor.render_scene(scene)?;
        for (offset, pass) in effects.iter().enumerate() {
            frame = executor.apply_effect(offset + 1, pass, frame)?;
        }
        executor.present(frame)
    }
}

/// Vertical slide, as a fraction of the viewport height, of the curtain
/// strip containing horizontal coordinate `u`.
pub fn curtain_shift(u: f32, progress: f32, strips: f32, stagger: f32) -> f32 {
    let strips = strips.max(1.0);
    let stagger = stagger.clamp(0.0, 0.95);
    let strip = (u.clamp(0.0, 1.0) * strips).floor().min(strips - 1.0);
    let delay = strip / strips * stagger;
    ((progress - delay) / (1.0 - stagger)).clamp(0.0, 1.0)
}

/// Texture-space offset applied to the red channel (blue gets the negation).
pub fn rgb_split_offset(progress: f32, amount: f32, direction: Vec2) -> Vec2 {
    direction * amount * progress
}
