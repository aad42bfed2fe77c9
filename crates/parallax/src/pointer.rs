//! Pointer sampling with single-pole smoothing.
//!
//! Raw positions arrive from the host's event callback through a
//! [`PointerInput`] handle; the render loop owns the [`PointerTracker`] and
//! pulls the smoothed vector once per frame. Events are never queued: a new
//! position simply overwrites the previous one.

use std::cell::Cell;
use std::rc::Rc;

use glam::Vec2;

/// Empirical centering offsets subtracted from the normalized position.
pub const DEFAULT_POINTER_BIAS: Vec2 = Vec2::new(0.55, 0.7);
/// Fraction of the remaining distance covered each tick.
pub const DEFAULT_SMOOTHING: f32 = 0.1;

/// Writer half handed to input callbacks.
///
/// Cloning is cheap and every clone writes the same slot.
#[derive(Clone, Debug)]
pub struct PointerInput {
    raw: Rc<Cell<Vec2>>,
    bias: Vec2,
}

impl PointerInput {
    /// Records a pointer position in surface pixels.
    pub fn on_pointer_move(&self, x: f32, y: f32, viewport: (u32, u32)) {
        let width = viewport.0.max(1) as f32;
        let height = viewport.1.max(1) as f32;
        self.raw
            .set(Vec2::new(x / width - self.bias.x, y / height - self.bias.y));
    }

    /// Overwrites the raw value with an already-normalized position.
    pub fn set_normalized(&self, value: Vec2) {
        self.raw.set(value);
    }
}

#[derive(Debug)]
pub struct PointerTracker {
    raw: Rc<Cell<Vec2>>,
    smoothed: Vec2,
    bias: Vec2,
    smoothing: f32,
}

impl PointerTracker {
    /// Builds a tracker; `smoothing` is clamped into `(0, 1]`.
    pub fn new(bias: Vec2, smoothing: f32) -> Self {
        let smoothing = if smoothing.is_finite() {
            smoothing.clamp(f32::EPSILON, 1.0)
        } else {
            DEFAULT_SMOOTHING
        };
        Self {
            raw: Rc::new(Cell::new(Vec2::ZERO)),
            smoothed: Vec2::ZERO,
            bias,
            smoothing,
        }
    }

    pub fn input(&self) -> PointerInput {
        PointerInput {
            raw: Rc::clone(&self.raw),
            bias: self.bias,
        }
    }

    pub fn on_pointer_move(&self, x: f32, y: f32, viewport: (u32, u32)) {
        self.input().on_pointer_move(x, y, viewport);
    }

    pub fn raw(&self) -> Vec2 {
        self.raw.get()
    }

    pub fn smoothed(&self) -> Vec2 {
        self.smoothed
    }

    /// Moves the smoothed vector toward the latest raw value and returns it.
    pub fn tick(&mut self) -> Vec2 {
        let raw = self.raw.get();
        self.smoothed += (raw - self.smoothed) * self.smoothing;
        self.smoothed
    }
}

impl Default for PointerTracker {
    fn default() -> Self {
        Self::new(DEFAULT_POINTER_BIAS, DEFAULT_SMOOTHING)
    }
}
