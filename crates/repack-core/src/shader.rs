//! GLSL side of the reconstruction contract.

use crate::delta::{DELTA_BIAS, DELTA_FORMAT_VERSION, DELTA_MASK, X_SHIFT, Y_SHIFT, Z_SHIFT};
use crate::quantization::PositionDequantization;

pub const ANCHORS_UNIFORM: &str = "u_anchors";
pub const DEQUANT_SCALE_UNIFORM: &str = "u_dequantScale";
pub const DEQUANT_OFFSET_UNIFORM: &str = "u_dequantOffset";
pub const DELTA_ATTRIBUTE: &str = "a_packed_delta";

/// Constants a consumer passes to the reconstruction stage alongside the
/// buffers of one mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShaderUniforms {
    pub block_size: u32,
    pub texture_width: u32,
    pub texture_height: u32,
    pub dequantization: PositionDequantization,
}

impl ShaderUniforms {
    pub fn glsl(&self) -> String {
        reconstruction_glsl(self.block_size, self.texture_width)
    }
}

/// GLSL ES 3.00 vertex-stage fragment that rebuilds the model-space position
/// of the current vertex. Block size and texture width are baked in as
/// constants; the anchor sampler and dequantization are uniforms.
pub fn reconstruction_glsl(block_size: u32, texture_width: u32) -> String {
    format!(
        r#"// packed delta format v{version}
precision highp usampler2D;

uniform usampler2D {anchors};
uniform vec3 {scale};
uniform vec3 {offset};

in uint {delta};

const int BLOCK_SIZE = {block_size};
const int ANCHOR_TEXTURE_WIDTH = {texture_width};

vec3 reconstructPosition(int vertexId, uint code) {{
    int block = vertexId / BLOCK_SIZE;
    ivec2 texel = ivec2(block % ANCHOR_TEXTURE_WIDTH, block / ANCHOR_TEXTURE_WIDTH);
    ivec3 anchor = ivec3(texelFetch({anchors}, texel, 0).xyz);
    ivec3 delta = ivec3(
        int((code >> {x_shift}u) & {mask}u),
        int((code >> {y_shift}u) & {mask}u),
        int((code >> {z_shift}u) & {mask}u)) - ivec3({bias});
    return vec3(anchor + delta) * {scale} + {offset};
}}
"#,
        version = DELTA_FORMAT_VERSION,
        anchors = ANCHORS_UNIFORM,
        scale = DEQUANT_SCALE_UNIFORM,
        offset = DEQUANT_OFFSET_UNIFORM,
        delta = DELTA_ATTRIBUTE,
        block_size = block_size,
        texture_width = texture_width,
        x_shift = X_SHIFT,
        y_shift = Y_SHIFT,
        z_shift = Z_SHIFT,
        mask = DELTA_MASK,
        bias = DELTA_BIAS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_matches_format() {
        let src = reconstruction_glsl(96, 1024);
        assert!(src.contains("const int BLOCK_SIZE = 96;"));
        assert!(src.contains("const int ANCHOR_TEXTURE_WIDTH = 1024;"));
        assert!(src.contains("uniform usampler2D u_anchors;"));
        assert!(src.contains("texelFetch(u_anchors, texel, 0)"));
        assert!(src.contains("(code >> 22u) & 1023u"));
        assert!(src.contains("(code >> 12u) & 1023u"));
        assert!(src.contains("(code >> 2u) & 1023u"));
        assert!(src.contains("ivec3(512)"));
        assert!(src.contains("in uint a_packed_delta;"));
    }

    #[test]
    fn test_uniforms_render_their_constants() {
        let u = ShaderUniforms {
            block_size: 192,
            texture_width: 256,
            texture_height: 3,
            dequantization: PositionDequantization::identity(),
        };
        assert!(u.glsl().contains("const int BLOCK_SIZE = 192;"));
    }
}
