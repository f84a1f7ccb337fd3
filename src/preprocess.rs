//! Preprocessor (spec.md §4.2): drives the scanner + layout calculator, resolves `@import`
//! transitively with single-inclusion, rewrites directive occurrences to generated
//! identifiers, prepends a generated header, and emits a [`ProgramManifest`].

use crate::directives::{self, Directive};
use crate::error::{EngineError, Result};
use crate::keys;
use crate::layout::{self, GameStateLayout};
use crate::manifest::{ProgramManifest, MAX_OSC_PARAMS};
use crate::resolver::FileResolver;
use std::collections::HashSet;
use std::path::Path;

/// The 12 logical buttons exposed in `engine.buttons`. The dialect has no room to let a shader
/// name its own buttons, so the host settles on a fixed gamepad-shaped vocabulary (arrows,
/// four face buttons, two shoulder buttons, start/select) and maps keyboard/gamepad input onto
/// it in the runtime shell (see `scheduler.rs`).
pub const BUTTON_NAMES: [&str; 12] = [
    "UP", "DOWN", "LEFT", "RIGHT", "A", "B", "X", "Y", "L", "R", "START", "SELECT",
];

/// Runs the full preprocessing contract against `entry_path` in `resolver` and returns the
/// program manifest (including the generated, compilable WGSL source).
pub fn preprocess(resolver: &dyn FileResolver, entry_path: &str) -> Result<ProgramManifest> {
    let mut visited = HashSet::new();
    let inlined = inline_imports(resolver, entry_path, &mut visited)?;

    let mut manifest = ProgramManifest::new();

    let (body_without_state, game_state_body, layout) = extract_game_state(&inlined, entry_path)?;
    manifest.game_state_size = layout.size;
    manifest.game_state_alignment = layout.alignment;

    let rewritten_body = rewrite(&body_without_state, entry_path, &mut manifest)?;

    let header = build_header(&manifest, game_state_body.as_deref());
    manifest.generated_wgsl = format!("{header}\n{rewritten_body}");

    Ok(manifest)
}

/// Depth-first, single-inclusion import inlining (spec.md §4.2 step 1). `visited` tracks paths
/// already inlined anywhere in the current top-level compilation; a repeat import becomes an
/// elision comment rather than an error, cutting cycles silently (spec.md §9).
fn inline_imports(
    resolver: &dyn FileResolver,
    path: &str,
    visited: &mut HashSet<String>,
) -> Result<String> {
    if !visited.insert(path.to_string()) {
        return Ok(format!("// [elided: already imported {path}]\n"));
    }

    let text = resolver.read_text(path)?;
    let imports = directives::scan_imports(&text);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (import_path, span) in imports {
        out.push_str(&text[cursor..span.start]);
        let resolved = resolve_import_path(path, &import_path);
        let inlined = inline_imports(resolver, &resolved, visited)?;
        out.push_str(&inlined);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Imports are written relative to the importing file's own directory.
fn resolve_import_path(importing_file: &str, import_path: &str) -> String {
    if import_path.contains('/') || !importing_file.contains('/') {
        return import_path.to_string();
    }
    let dir = &importing_file[..importing_file.rfind('/').unwrap() + 1];
    format!("{dir}{import_path}")
}

/// Locates and excises the `struct GameState { ... }` block, returning the body text with the
/// block removed, the block's raw field text (for relocation into the header), and its computed
/// layout.
fn extract_game_state(
    text: &str,
    path: &str,
) -> Result<(String, Option<String>, GameStateLayout)> {
    match layout::find_game_state_block(text) {
        Some((block_body, span)) => {
            let fields = layout::parse_fields(&block_body, Path::new(path))?;
            let computed = layout::compute_layout(&fields);
            let mut without = String::with_capacity(text.len());
            without.push_str(&text[..span.start]);
            without.push_str(&text[span.end..]);
            Ok((without, Some(block_body), computed))
        }
        None => Ok((text.to_string(), None, GameStateLayout::empty())),
    }
}

/// Registers `name` in `list` if new, returning its (possibly pre-existing) index.
fn register(list: &mut Vec<String>, name: &str) -> usize {
    if let Some(i) = list.iter().position(|n| n == name) {
        return i;
    }
    list.push(name.to_string());
    list.len() - 1
}

fn register_camera(list: &mut Vec<i64>, device: i64) -> usize {
    if let Some(i) = list.iter().position(|n| *n == device) {
        return i;
    }
    list.push(device);
    list.len() - 1
}

/// Registers an OSC parameter name, clamping to the last slot once 64 are already in use
/// (spec.md §8 boundary behavior) rather than overrunning `osc[64]`.
fn register_osc(list: &mut Vec<String>, name: &str) -> usize {
    if let Some(i) = list.iter().position(|n| n == name) {
        return i;
    }
    if list.len() >= MAX_OSC_PARAMS {
        log::warn!(
            "OSC parameter `{name}` exceeds the {MAX_OSC_PARAMS}-slot limit; aliasing to slot {}",
            MAX_OSC_PARAMS - 1
        );
        return MAX_OSC_PARAMS - 1;
    }
    list.push(name.to_string());
    list.len() - 1
}

/// Scans `body` for every remaining directive family and rewrites them in place, registering
/// assets into `manifest` as they're first seen (spec.md §4.2 steps 2-6).
fn rewrite(body: &str, path: &str, manifest: &mut ProgramManifest) -> Result<String> {
    let matches = directives::scan(body);
    let mut out = String::with_capacity(body.len());
    let mut cursor = 0;
    let mut title_set = false;

    for m in matches {
        out.push_str(&body[cursor..m.span.start]);
        cursor = m.span.end;

        let replacement = match m.directive {
            Directive::SetTitle(title) => {
                if !title_set {
                    manifest.title = title;
                    title_set = true;
                }
                String::new()
            }
            Directive::SetSize(dims) => {
                match dims {
                    Some((w, h)) => {
                        manifest.width = w;
                        manifest.height = h;
                    }
                    None => {
                        log::warn!("malformed @set_size in {path}, using default 800x600");
                    }
                }
                String::new()
            }
            Directive::Import(_) => unreachable!("imports are resolved before rewriting"),
            Directive::Texture(name) => {
                let i = register(&mut manifest.textures, &name);
                format!("_texture_{i}")
            }
            Directive::TextureIndex(name) => {
                let i = register(&mut manifest.textures, &name);
                format!("{i}u")
            }
            Directive::Video(name) => {
                let i = register(&mut manifest.videos, &name);
                format!("_texture_{}", manifest.textures.len() + i)
            }
            Directive::Camera(device) => {
                let i = register_camera(&mut manifest.cameras, device);
                format!("_texture_{}", manifest.textures.len() + manifest.videos.len() + i)
            }
            Directive::SoundPlay(name) => {
                let i = register(&mut manifest.sounds, &name);
                format!("engine.audio[{i}] = engine.audio[{i}] + 1u")
            }
            Directive::SoundStop(name) => {
                format!("/* sound stop: {name} (no-op) */")
            }
            Directive::SoundBare(name) => {
                let i = register(&mut manifest.sounds, &name);
                format!("engine.audio[{i}]")
            }
            Directive::ModelPositions(name) => {
                let i = register(&mut manifest.models, &name);
                format!("_model_{i}_positions")
            }
            Directive::ModelNormals(name) => {
                let i = register(&mut manifest.models, &name);
                format!("_model_{i}_normals")
            }
            Directive::Osc(name) => {
                let i = register_osc(&mut manifest.osc_params, &name);
                format!("engine.osc[{i}]")
            }
            Directive::Str(literal) => str_literal_wgsl(&literal),
            Directive::Engine(field) => rewrite_engine_field(&field),
        };
        out.push_str(&replacement);
    }
    out.push_str(&body[cursor..]);
    Ok(out)
}

fn rewrite_engine_field(field: &str) -> String {
    if field == "sampler" {
        "_sampler".to_string()
    } else {
        format!("engine.{field}")
    }
}

/// Decodes the dialect's minimal escape set (`\n \r \t \" \\`); any other escape passes the
/// backslash and following character through unchanged (spec.md §9 open question).
fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Builds the fixed-width 128-element `array<u32, 128>(...)` literal for `@str` (spec.md §8
/// boundary behavior: exactly 128 chars fill every slot, longer strings truncate).
fn str_literal_wgsl(raw: &str) -> String {
    let decoded = decode_escapes(raw);
    let mut codes: Vec<u32> = decoded.chars().map(|c| c as u32).collect();
    codes.truncate(128);
    codes.resize(128, 0);
    let items: Vec<String> = codes.iter().map(|c| format!("{c}u")).collect();
    format!("array<u32, 128>({})", items.join(", "))
}

/// Builds the generated header: the relocated `GameState` struct, the `GameEngineHost` struct,
/// named button/key constants, and every resource binding (spec.md §4.2 step 5).
fn build_header(manifest: &ProgramManifest, game_state_body: Option<&str>) -> String {
    let mut s = String::new();
    s.push_str("// --- generated by the wgsl-arcade preprocessor; do not edit by hand ---\n\n");

    if let Some(body) = game_state_body {
        s.push_str("struct GameState {\n");
        s.push_str(body.trim_end());
        if !body.trim_end().ends_with(',') {
            s.push(',');
        }
        s.push_str("\n}\n\n");
    }

    s.push_str("struct GameEngineHost {\n");
    s.push_str("    buttons: array<i32, 12>,\n");
    s.push_str("    time: f32,\n");
    s.push_str("    delta_time: f32,\n");
    s.push_str("    screen_width: f32,\n");
    s.push_str("    screen_height: f32,\n");
    s.push_str("    mouse: vec4f,\n");
    if game_state_body.is_some() {
        s.push_str("    state: GameState,\n");
    } else {
        s.push_str("    state: array<u32, 4>,\n");
    }
    if !manifest.sounds.is_empty() {
        s.push_str(&format!("    audio: array<u32, {}>,\n", manifest.sounds.len()));
    }
    s.push_str("    osc: array<f32, 64>,\n");
    s.push_str(&format!("    keys: array<i32, {}>,\n", keys::NUM_KEYS));
    s.push_str("}\n\n");

    for (i, name) in BUTTON_NAMES.iter().enumerate() {
        s.push_str(&format!("const BUTTON_{name}: u32 = {i}u;\n"));
    }
    s.push('\n');

    for (i, key_name) in keys::KEY_NAMES.iter().enumerate() {
        s.push_str(&format!("const {}: u32 = {i}u;\n", keys::constant_name(key_name)));
    }
    s.push('\n');

    s.push_str("@group(0) @binding(0) var _sampler: sampler;\n");
    for (i, _) in manifest.textures.iter().enumerate() {
        s.push_str(&format!("@group(0) @binding({}) var _texture_{i}: texture_2d<f32>;\n", 1 + i));
    }
    let video_base = manifest.textures.len();
    for (i, _) in manifest.videos.iter().enumerate() {
        s.push_str(&format!(
            "@group(0) @binding({}) var _texture_{}: texture_2d<f32>;\n",
            1 + video_base + i,
            video_base + i
        ));
    }
    let camera_base = video_base + manifest.videos.len();
    for (i, _) in manifest.cameras.iter().enumerate() {
        s.push_str(&format!(
            "@group(0) @binding({}) var _texture_{}: texture_2d<f32>;\n",
            1 + camera_base + i,
            camera_base + i
        ));
    }
    s.push('\n');

    s.push_str("@group(1) @binding(0) var<storage, read_write> engine: GameEngineHost;\n\n");

    for (i, _) in manifest.models.iter().enumerate() {
        s.push_str(&format!(
            "@group(2) @binding({}) var<storage, read> _model_{i}_positions: array<vec3f>;\n",
            1 + 2 * i
        ));
        s.push_str(&format!(
            "@group(2) @binding({}) var<storage, read> _model_{i}_normals: array<vec3f>;\n",
            2 + 2 * i
        ));
    }
    s.push('\n');

    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{DirectoryResolver, FileResolver};

    fn preprocess_source(files: &[(&str, &str)]) -> ProgramManifest {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            let full = dir.path().join(name);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(full, content).unwrap();
        }
        let resolver = DirectoryResolver::new(dir.path());
        preprocess(&resolver, "main.wgsl").unwrap()
    }

    #[test]
    fn title_and_size_are_captured_and_erased() {
        let m = preprocess_source(&[(
            "main.wgsl",
            r#"@set_title("Bob-Bonker") @set_size(800, 600) fn main() {}"#,
        )]);
        assert_eq!(m.title, "Bob-Bonker");
        assert_eq!(m.width, 800);
        assert_eq!(m.height, 600);
        assert!(!m.generated_wgsl.contains("@set_title"));
        assert!(!m.generated_wgsl.contains("@set_size"));
    }

    #[test]
    fn malformed_set_size_falls_back_to_defaults() {
        let m = preprocess_source(&[("main.wgsl", "@set_size(oops) fn main() {}")]);
        assert_eq!(m.width, 800);
        assert_eq!(m.height, 600);
    }

    #[test]
    fn bob_demo_host_block_size_is_112() {
        let src = r#"
            struct GameState {
                player_pos: vec2f,
                player_vel: vec2f,
                at_edge: u32,
            }
            @set_title("Bob-Bonker")
            @set_size(800, 600)
            fn update() {
                if (engine.buttons[BUTTON_RIGHT] == 1) {
                    engine.state.player_vel.x = 200.0;
                }
                let t = @texture("player.png");
                @sound("bump.ogg").play();
            }
        "#;
        let m = preprocess_source(&[("main.wgsl", src)]);
        assert_eq!(m.game_state_size, 24);
        // 80 (prefix) + 24 (GameState) + 4 (one sound) + 256 (osc[64]) + 776 (keys[194]) = 1140,
        // rounded up to a multiple of 16.
        assert_eq!(m.host_block_size(), 1152);
        assert_eq!(m.textures, vec!["player.png".to_string()]);
        assert_eq!(m.sounds, vec!["bump.ogg".to_string()]);
        assert!(m.generated_wgsl.contains("_texture_0"));
        assert!(m.generated_wgsl.contains("@group(0) @binding(1) var _texture_0"));
    }

    #[test]
    fn import_is_inlined_exactly_once_even_with_a_cycle() {
        let m = preprocess_source(&[
            ("main.wgsl", r#"@import("helpers.wgsl") @import("helpers.wgsl") fn f() {}"#),
            ("helpers.wgsl", r#"@import("main.wgsl") fn helper() {}"#),
        ]);
        let occurrences = m.generated_wgsl.matches("fn helper").count();
        assert_eq!(occurrences, 1);
    }

    #[test]
    fn texture_binding_index_is_independent_of_source_order() {
        // The name that appears deeper in the source still gets a deterministic index based on
        // first occurrence order, not on some unrelated property of the file.
        let m = preprocess_source(&[(
            "main.wgsl",
            r#"
            fn a() { let x = @texture("map/level1_ground.png"); }
            fn b() { let y = @texture_index("map/level1_ground.png"); }
            "#,
        )]);
        assert_eq!(m.textures, vec!["map/level1_ground.png".to_string()]);
        assert!(m.generated_wgsl.contains("let y = 0u"));
    }

    #[test]
    fn osc_65th_param_aliases_to_slot_63() {
        let mut src = String::new();
        for i in 0..65 {
            src.push_str(&format!("let v{i} = @osc(\"p{i}\");\n"));
        }
        let m = preprocess_source(&[("main.wgsl", &src)]);
        assert_eq!(m.osc_params.len(), 64);
        assert!(m.generated_wgsl.contains("let v64 = engine.osc[63]"));
    }

    #[test]
    fn str_literal_is_128_wide_and_zero_padded() {
        let m = preprocess_source(&[("main.wgsl", r#"let s = @str("hi");"#)]);
        assert!(m.generated_wgsl.contains("array<u32, 128>(104u, 105u, 0u"));
    }

    #[test]
    fn empty_game_state_uses_sentinel_layout() {
        let m = preprocess_source(&[("main.wgsl", "fn update() {}")]);
        assert_eq!(m.game_state_size, 16);
        assert_eq!(m.game_state_alignment, 4);
        assert!(m.generated_wgsl.contains("state: array<u32, 4>"));
    }
}
