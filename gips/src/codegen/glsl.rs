//! Fixed GLSL text shared by every generated program.

/// GLSL version line of every generated stage.
pub const VERSION: &str = "#version 330 core";

/// Line number the boilerplate before the user code is reported at.
pub const HEADER_LINE: u32 = 8000;

/// Line number the synthesized entry point is reported at.
pub const ENTRY_LINE: u32 = 9000;

// ── Fixed uniform and varying names ────────────────────────────────────

pub const TEX: &str = "gips_tex";
pub const IMAGE_SIZE: &str = "gips_image_size";
pub const REL2MAP: &str = "gips_rel2map";
pub const MAP2TEX: &str = "gips_map2tex";
pub const POS2NDC: &str = "gips_pos2ndc";
pub const POS: &str = "gips_pos";
pub const FRAG: &str = "gips_frag";

/// Value of `gips_pos2ndc`: maps the unit quad onto the whole viewport.
pub const POS_TO_NDC: [f32; 4] = [-1.0, -1.0, 2.0, 2.0];

/// Shared vertex stage linked with every pass.
///
/// Draws a 4-vertex triangle strip without vertex buffers. `gips_pos` is the
/// relative position run through `gips_rel2map`, so color passes (identity
/// transform) get texture coordinates and coordinate passes get map
/// coordinates.
pub const VERTEX_SHADER: &str = "\
#version 330 core
uniform vec4 gips_pos2ndc;
uniform vec4 gips_rel2map;
out vec2 gips_pos;
void main() {
  vec2 rel = vec2(float(gl_VertexID & 1), float((gl_VertexID & 2) >> 1));
  gips_pos = gips_rel2map.xy + rel * gips_rel2map.zw;
  gl_Position = vec4(gips_pos2ndc.xy + rel * gips_pos2ndc.zw, 0.0, 1.0);
}
";

/// Image lookup through the map-to-texture transform, available to
/// coordinate passes as `pixel(pos)`.
pub const PIXEL_HELPER: &[&str] = &[
    "vec4 pixel(in vec2 pos) {",
    "  return texture(gips_tex, gips_map2tex.xy + pos * gips_map2tex.zw);",
    "}",
];
