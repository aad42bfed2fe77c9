use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::effects::Pass;

/// Mirrors `PlaneParams` in the plane shaders (std140).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub(crate) struct PlaneUniforms {
    pub mvp: [[f32; 4]; 4],
    /// x: 1.0 when the plane is masked.
    pub flags: [f32; 4],
}

impl PlaneUniforms {
    pub fn new(mvp: Mat4, masked: bool) -> Self {
        Self {
            mvp: mvp.to_cols_array_2d(),
            flags: [if masked { 1.0 } else { 0.0 }, 0.0, 0.0, 0.0],
        }
    }
}

/// Mirrors `EffectParams` in the effect shaders (std140). Every effect
/// kind shares the block; undeclared fields stay zero.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct EffectUniforms {
    pub progress: f32,
    pub strips: f32,
    pub stagger: f32,
    pub amount: f32,
    pub direction: [f32; 2],
    pub _padding: [f32; 2],
}

impl EffectUniforms {
    pub fn from_pass(pass: &Pass) -> Self {
        Self {
            progress: pass.progress(),
            strips: pass.float("uStrips"),
            stagger: pass.float("uStagger"),
            amount: pass.float("uAmount"),
            direction: pass.vec2("uDirection").to_array(),
            _padding: [0.0; 2],
        }
    }
}
