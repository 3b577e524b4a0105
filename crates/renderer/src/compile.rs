use std::borrow::Cow;
use std::fmt;

use wgpu::naga;
use wgpu::naga::ShaderStage;

use crate::error::InitError;
use crate::gpu::UniformTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl ShaderStageKind {
    fn naga_stage(self) -> ShaderStage {
        match self {
            ShaderStageKind::Vertex => ShaderStage::Vertex,
            ShaderStageKind::Fragment => ShaderStage::Fragment,
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            ShaderStageKind::Vertex => VERTEX_SHADER_GLSL,
            ShaderStageKind::Fragment => FRAGMENT_SHADER_GLSL,
        }
    }
}

impl fmt::Display for ShaderStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStageKind::Vertex => f.write_str("vertex"),
            ShaderStageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// A stage that passed naga parsing and validation, plus the wgpu module
/// built from the same source.
pub(crate) struct CompiledStage {
    pub module: wgpu::ShaderModule,
    pub ir: naga::Module,
}

/// Parses and validates one of the built-in stages without touching a GPU.
pub fn parse_stage(stage: ShaderStageKind) -> Result<naga::Module, InitError> {
    let source = stage.source();
    let module = naga::front::glsl::Frontend::default()
        .parse(&naga::front::glsl::Options::from(stage.naga_stage()), source)
        .map_err(|errors| InitError::Compile {
            stage,
            message: errors.emit_to_string(source),
        })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|error| InitError::Compile {
        stage,
        message: error.emit_to_string(source),
    })?;

    Ok(module)
}

pub(crate) fn compile_stage(
    device: &wgpu::Device,
    stage: ShaderStageKind,
) -> Result<CompiledStage, InitError> {
    let ir = parse_stage(stage)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(match stage {
            ShaderStageKind::Vertex => "tone vertex",
            ShaderStageKind::Fragment => "tone fragment",
        }),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(stage.source()),
            stage: stage.naga_stage(),
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(InitError::Compile {
            stage,
            message: error.to_string(),
        });
    }

    Ok(CompiledStage { module, ir })
}

/// Builds the uniform table the GPU program will expose, from the shader
/// sources alone.
pub fn reflect_program() -> Result<UniformTable, InitError> {
    let vertex = parse_stage(ShaderStageKind::Vertex)?;
    let fragment = parse_stage(ShaderStageKind::Fragment)?;
    UniformTable::reflect(&[&vertex, &fragment]).map_err(InitError::Link)
}

/// Parameter block shared by both stages. Member names are the uniform
/// names the renderer pushes each draw.
macro_rules! tone_params_block {
    () => {
        r"layout(std140, set = 0, binding = 0) uniform ToneParams {
    float sourceAspectRatio;
    vec2 desqueezeAspect;
    vec2 translation;
    float rotation;
    float brightness;
    float exposure;
    float contrast;
    float highlights;
    float shadows;
    float saturation;
    float warmth;
    float tint;
} params;
"
    };
}

/// Maps the full-viewport quad onto the cropped, rotated source region.
const VERTEX_SHADER_GLSL: &str = concat!(
    r"#version 450
layout(location = 0) in vec2 position;
layout(location = 0) out vec2 v_texcoord;

",
    tone_params_block!(),
    r"
void main() {
    vec2 centered = vec2(position.x, -position.y) * 0.5 * params.desqueezeAspect;
    centered.y *= params.sourceAspectRatio;
    float c = cos(params.rotation);
    float s = sin(params.rotation);
    centered = mat2(c, s, -s, c) * centered;
    centered.y /= params.sourceAspectRatio;
    v_texcoord = centered + params.translation + vec2(0.5, 0.5);
    gl_Position = vec4(position, 0.0, 1.0);
}
"
);

/// Tone pipeline: exposure, brightness, contrast, highlights, shadows,
/// warmth, tint, saturation. Inputs are used unclamped.
const FRAGMENT_SHADER_GLSL: &str = concat!(
    r"#version 450
layout(location = 0) in vec2 v_texcoord;
layout(location = 0) out vec4 outColor;

",
    tone_params_block!(),
    r"
layout(set = 1, binding = 0) uniform texture2D sourceTexture;
layout(set = 1, binding = 1) uniform sampler sourceSampler;

float luminance(vec3 color) {
    return dot(color, vec3(0.2126, 0.7152, 0.0722));
}

void main() {
    vec4 texel = texture(sampler2D(sourceTexture, sourceSampler), v_texcoord);
    vec3 color = texel.rgb * exp2(params.exposure);
    color = color + vec3(params.brightness);
    color = (color - vec3(0.5)) * (1.0 + params.contrast) + vec3(0.5);

    float luma = luminance(color);
    float highlightMask = smoothstep(0.5, 1.0, luma);
    float shadowMask = 1.0 - smoothstep(0.0, 0.5, luma);
    color = color + vec3(params.highlights * highlightMask * 0.5);
    color = color + vec3(params.shadows * shadowMask * 0.5);

    color = color + vec3(params.warmth, 0.0, -params.warmth) * 0.1;
    color = color + vec3(0.0, -params.tint, 0.0) * 0.1;

    float gray = luminance(color);
    color = mix(vec3(gray), color, 1.0 + params.saturation);
    outColor = vec4(color, texel.a);
}
"
);
