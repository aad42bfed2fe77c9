//! GLSL sources for every pipeline, compiled through naga.
//!
//! Texture coordinates follow wgpu's convention: `v` grows downwards, so
//! `v_uv` addresses offscreen targets and uploaded images identically.

use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::effects::PassKind;

pub(crate) fn compile(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    })
}

/// Fragment source for an effect pass kind; `None` for the render pass.
pub(crate) fn effect_fragment(kind: PassKind) -> Option<&'static str> {
    match kind {
        PassKind::Render => None,
        PassKind::Curtain => Some(CURTAIN_FRAGMENT),
        PassKind::RgbSplit => Some(RGB_SPLIT_FRAGMENT),
    }
}

/// Textured quad spanning `[-1, 1]^2` in plane space, scaled by the MVP.
pub(crate) const PLANE_VERTEX: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform PlaneParams {
    mat4 mvp;
    vec4 flags;
} plane;

layout(location = 0) out vec2 v_uv;

const vec2 corners[6] = vec2[6](
    vec2(-1.0, -1.0),
    vec2(1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 corner = corners[vertex_index];
    v_uv = vec2(corner.x * 0.5 + 0.5, 0.5 - corner.y * 0.5);
    gl_Position = plane.mvp * vec4(corner, 0.0, 1.0);
}
";

/// `flags.x > 0.5` marks a masked plane: alpha = mask.g * base.a.
pub(crate) const PLANE_FRAGMENT: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform PlaneParams {
    mat4 mvp;
    vec4 flags;
} plane;

layout(set = 1, binding = 0) uniform texture2D baseTexture;
layout(set = 1, binding = 1) uniform texture2D maskTexture;
layout(set = 1, binding = 2) uniform sampler planeSampler;

layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

void main() {
    vec4 base = texture(sampler2D(baseTexture, planeSampler), v_uv);
    float alpha = 1.0;
    if (plane.flags.x > 0.5) {
        alpha = texture(sampler2D(maskTexture, planeSampler), v_uv).g * base.a;
    }
    outColor = vec4(base.rgb, alpha);
}
";

pub(crate) const FULLSCREEN_VERTEX: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

pub(crate) const CURTAIN_FRAGMENT: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform EffectParams {
    float uProgress;
    float uStrips;
    float uStagger;
    float uAmount;
    vec2 uDirection;
    vec2 _padding;
} params;

layout(set = 1, binding = 0) uniform texture2D inputTexture;
layout(set = 1, binding = 1) uniform sampler inputSampler;

layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

void main() {
    float strips = max(params.uStrips, 1.0);
    float stagger = clamp(params.uStagger, 0.0, 0.95);
    float strip = min(floor(clamp(v_uv.x, 0.0, 1.0) * strips), strips - 1.0);
    float delay = strip / strips * stagger;
    float shift = clamp((params.uProgress - delay) / (1.0 - stagger), 0.0, 1.0);
    float source = v_uv.y + shift;
    if (source > 1.0) {
        outColor = vec4(0.0, 0.0, 0.0, 1.0);
    } else {
        outColor = texture(sampler2D(inputTexture, inputSampler), vec2(v_uv.x, source));
    }
}
";

pub(crate) const RGB_SPLIT_FRAGMENT: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform EffectParams {
    float uProgress;
    float uStrips;
    float uStagger;
    float uAmount;
    vec2 uDirection;
    vec2 _padding;
} params;

layout(set = 1, binding = 0) uniform texture2D inputTexture;
layout(set = 1, binding = 1) uniform sampler inputSampler;

layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

void main() {
    vec2 offset = params.uDirection * params.uAmount * params.uProgress;
    vec4 centre = texture(sampler2D(inputTexture, inputSampler), v_uv);
    float red = texture(sampler2D(inputTexture, inputSampler), v_uv + offset).r;
    float blue = texture(sampler2D(inputTexture, inputSampler), v_uv - offset).b;
    outColor = vec4(red, centre.g, blue, centre.a);
}
";

pub(crate) const BLIT_FRAGMENT: &str = r"#version 450
layout(set = 0, binding = 0) uniform texture2D inputTexture;
layout(set = 0, binding = 1) uniform sampler inputSampler;

layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = texture(sampler2D(inputTexture, inputSampler), v_uv);
}
";

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::naga::front::glsl::{Frontend, Options};
    use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

    fn assert_valid(source: &str, stage: ShaderStage) {
        let module = Frontend::default()
            .parse(&Options::from(stage), source)
            .unwrap_or_else(|err| panic!("GLSL failed to parse: {err:?}"));
        Validator::new(ValidationFlags::all(), Capabilities::all())
            .validate(&module)
            .unwrap_or_else(|err| panic!("GLSL failed validation: {err:?}"));
    }

    #[test]
    fn vertex_shaders_compile() {
        assert_valid(PLANE_VERTEX, ShaderStage::Vertex);
        assert_valid(FULLSCREEN_VERTEX, ShaderStage::Vertex);
    }

    #[test]
    fn fragment_shaders_compile() {
        for source in [PLANE_FRAGMENT, CURTAIN_FRAGMENT, RGB_SPLIT_FRAGMENT, BLIT_FRAGMENT] {
            assert_valid(source, ShaderStage::Fragment);
        }
    }

    #[test]
    fn every_effect_kind_has_a_shader() {
        assert!(effect_fragment(PassKind::Render).is_none());
        assert!(effect_fragment(PassKind::Curtain).is_some());
        assert!(effect_fragment(PassKind::RgbSplit).is_some());
    }
}
