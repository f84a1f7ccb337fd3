//! Layout Calculator (spec.md §4.3): parses the fields of a `GameState` struct literal and
//! computes its std430 size and alignment.

use crate::error::{EngineError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// A single scalar/vector/array field of a `GameState` struct.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub size: u32,
    pub align: u32,
}

/// Size and alignment, in bytes, of one of the scalar/vector base types the dialect supports.
fn base_type_layout(ty: &str) -> Option<(u32, u32)> {
    match ty {
        "u32" | "i32" | "f32" => Some((4, 4)),
        "vec2f" | "vec2<f32>" => Some((8, 8)),
        "vec3f" | "vec3<f32>" => Some((12, 16)),
        "vec4f" | "vec4<f32>" => Some((16, 16)),
        _ => None,
    }
}

fn array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^array\s*<\s*([A-Za-z0-9_<>]+)\s*,\s*(\d+)\s*>$").unwrap())
}

fn field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*:\s*([A-Za-z0-9_<>,\s]+?)\s*,?\s*$").unwrap()
    })
}

fn struct_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)struct\s+GameState\s*\{(.*?)\}").unwrap())
}

/// Locates the `struct GameState { ... }` block in `source`, if present, and returns its raw
/// body text (between the braces) alongside the full matched span (used to excise it from the
/// body before it's relocated into the generated header).
pub fn find_game_state_block(source: &str) -> Option<(String, std::ops::Range<usize>)> {
    let m = struct_regex().captures(source)?;
    let whole = m.get(0)?;
    let body = m.get(1)?.as_str().to_string();
    Some((body, whole.start()..whole.end()))
}

/// Parses one field type (`u32`, `vec3f`, `array<vec2f, 8>`, ...) into its size and alignment.
fn parse_type(ty: &str, path: &Path) -> Result<(u32, u32)> {
    let ty = ty.trim();
    if let Some((size, align)) = base_type_layout(ty) {
        return Ok((size, align));
    }
    if let Some(caps) = array_regex().captures(ty) {
        let elem_ty = &caps[1];
        let count: u32 = caps[2].parse().map_err(|_| EngineError::PreprocessSyntax {
            path: path.to_path_buf(),
            message: format!("invalid array length in `{ty}`"),
        })?;
        let (elem_size, elem_align) = base_type_layout(elem_ty).ok_or_else(|| {
            EngineError::PreprocessSyntax {
                path: path.to_path_buf(),
                message: format!("unsupported array element type `{elem_ty}`"),
            }
        })?;
        // std430: array elements are padded to 16 bytes for vec3 (and are already 16 for vec4).
        let stride = if elem_ty.starts_with("vec3") {
            16
        } else {
            elem_size.max(elem_align)
        };
        let align = if elem_ty.starts_with("vec3") { 16 } else { elem_align };
        return Ok((stride * count, align));
    }
    Err(EngineError::PreprocessSyntax {
        path: path.to_path_buf(),
        message: format!("unsupported GameState field type `{ty}`"),
    })
}

/// Parses the body of a `GameState { ... }` struct (without the enclosing braces) into its
/// ordered fields.
pub fn parse_fields(body: &str, path: &Path) -> Result<Vec<Field>> {
    let mut fields = Vec::new();
    for cap in field_regex().captures_iter(body) {
        let name = cap[1].to_string();
        let ty = cap[2].trim().trim_end_matches(',').trim();
        let (size, align) = parse_type(ty, path)?;
        fields.push(Field { name, size, align });
    }
    Ok(fields)
}

/// The computed layout of a `GameState` struct: raw packed size, struct alignment, and the
/// final size rounded up to a multiple of the struct alignment (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameStateLayout {
    pub size: u32,
    pub alignment: u32,
}

impl GameStateLayout {
    /// The sentinel layout used when no `GameState` struct is present (spec.md §4.3, §8).
    pub fn empty() -> Self {
        Self { size: 16, alignment: 4 }
    }
}

/// Lays out `fields` sequentially under std430 rules: each field is placed at the next offset
/// aligned to its own alignment, and the final size is rounded up to the struct's alignment
/// (the max alignment of any member).
pub fn compute_layout(fields: &[Field]) -> GameStateLayout {
    if fields.is_empty() {
        return GameStateLayout::empty();
    }
    let mut offset: u32 = 0;
    let mut struct_align: u32 = 4;
    for f in fields {
        offset = crate::manifest::round_up(offset, f.align);
        offset += f.size;
        struct_align = struct_align.max(f.align);
    }
    let size = crate::manifest::round_up(offset, struct_align).max(16);
    GameStateLayout { size, alignment: struct_align }
}

/// Per-field byte offsets within the `GameState` struct, computed the same way as
/// [`compute_layout`] but retaining each field's starting offset (used when generating the
/// struct in the header and for test assertions against the emitted WGSL).
pub fn field_offsets(fields: &[Field]) -> Vec<(String, u32)> {
    let mut offset: u32 = 0;
    let mut out = Vec::with_capacity(fields.len());
    for f in fields {
        offset = crate::manifest::round_up(offset, f.align);
        out.push((f.name.clone(), offset));
        offset += f.size;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_game_state_is_16_byte_aligned_4() {
        assert_eq!(GameStateLayout::empty(), GameStateLayout { size: 16, alignment: 4 });
    }

    #[test]
    fn bob_demo_game_state_layout() {
        // player_pos: vec2f, player_vel: vec2f, at_edge: u32
        let body = "player_pos: vec2f,\nplayer_vel: vec2f,\nat_edge: u32,";
        let fields = parse_fields(body, Path::new("main.wgsl")).unwrap();
        let layout = compute_layout(&fields);
        // 8 + 8 + 4 = 20, aligned to 8 -> 24
        assert_eq!(layout.size, 24);
        assert_eq!(layout.alignment, 8);
    }

    #[test]
    fn snake_demo_arrays() {
        let body = "snake_x: array<i32, 400>,\nsnake_y: array<i32, 400>,\nlen: u32,";
        let fields = parse_fields(body, Path::new("main.wgsl")).unwrap();
        let layout = compute_layout(&fields);
        assert_eq!(layout.size, crate::manifest::round_up(400 * 4 + 400 * 4 + 4, 4));
    }

    #[test]
    fn vec3_array_pads_to_16_byte_stride() {
        let body = "positions: array<vec3f, 3>,";
        let fields = parse_fields(body, Path::new("main.wgsl")).unwrap();
        assert_eq!(fields[0].size, 48);
        assert_eq!(fields[0].align, 16);
    }

    #[test]
    fn finds_game_state_block() {
        let src = "struct GameState {\n  x: f32,\n}\nfn main() {}";
        let (body, range) = find_game_state_block(src).unwrap();
        assert!(body.contains("x: f32"));
        assert_eq!(&src[range], "struct GameState {\n  x: f32,\n}");
    }
}
