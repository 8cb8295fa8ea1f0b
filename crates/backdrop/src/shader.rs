//! Embedded GLSL sources for the backdrop pipeline.
//!
//! Both stages are baked into the binary so constructing a [`crate::Backdrop`]
//! never touches the filesystem or network; they are compiled through wgpu's
//! GLSL front-end at pipeline creation time.

use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

/// Minimal full-screen triangle vertex shader.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Fragment shader computing the animated colour field.
///
/// The uniform block layout must match [`crate::uniforms::BackdropUniforms`].
/// Per pixel: aspect-correct the centred coordinate, ripple the vertical
/// gradient parameter with a damped wave travelling out of the pointer,
/// overlay a faint grid, and darken the edges with a radial vignette.
pub(crate) const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform BackdropParams {
    vec2 resolution;
    vec2 pointer;
    vec4 color_a;
    vec4 color_b;
    float time;
    float pad0;
    vec2 pad1;
} ubo;

// Ripple tuning: spatial frequency, angular speed, damping, amplitude.
const float WAVE_FREQUENCY = 20.0;
const float WAVE_SPEED = 2.0;
const float WAVE_FALLOFF = 3.0;
const float WAVE_AMPLITUDE = 0.05;

// Decorative grid overlay.
const float GRID_CELLS = 40.0;
const float GRID_STRENGTH = 0.02;

void main() {
    vec2 uv = v_uv;
    vec2 p = (uv - 0.5) * vec2(ubo.resolution.x / max(ubo.resolution.y, 1.0), 1.0);

    vec2 cell = abs(fract(uv * GRID_CELLS) - 0.5);
    float grid = smoothstep(0.42, 0.5, max(cell.x, cell.y));

    float d = distance(uv, ubo.pointer);
    float wave = sin(d * WAVE_FREQUENCY - ubo.time * WAVE_SPEED) * WAVE_AMPLITUDE * exp(-d * WAVE_FALLOFF);

    vec3 color = mix(ubo.color_a.rgb, ubo.color_b.rgb, clamp(uv.y + wave, 0.0, 1.0));
    color += grid * GRID_STRENGTH;

    float vignette = smoothstep(1.5, 0.5, length(p));
    out_color = vec4(color * vignette, 1.0);
}
";

/// Compiles the static full-screen triangle vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("backdrop fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(VERTEX_SHADER_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

/// Compiles the embedded colour-field fragment shader.
pub(crate) fn compile_fragment_shader(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("backdrop fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(FRAGMENT_SHADER_GLSL),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}
