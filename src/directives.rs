//! Directive Scanner (spec.md §4.2, §6.2): regex-level extraction of the nine directive
//! families. Directive rewriting is deliberately textual (spec.md §9) — each form starts with a
//! small, distinctive lexeme and WGSL never uses `@` as an operator, so anchoring on these
//! patterns is sufficient without a full tokenizer.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    SetTitle(String),
    SetSize(Option<(u32, u32)>),
    Import(String),
    Texture(String),
    TextureIndex(String),
    Video(String),
    Camera(i64),
    SoundPlay(String),
    SoundStop(String),
    SoundBare(String),
    ModelPositions(String),
    ModelNormals(String),
    Osc(String),
    Str(String),
    Engine(String),
}

#[derive(Debug, Clone)]
pub struct DirectiveMatch {
    pub directive: Directive,
    pub span: Range<usize>,
}

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?x)
            @set_title\s*\(\s*"(?P<set_title>[^"]*)"\s*\)
          | @set_size\s*\(\s*(?P<size_w>-?\d+)\s*,\s*(?P<size_h>-?\d+)\s*\)
          | @set_size\s*\((?P<size_bad>[^)]*)\)
          | @import\s*\(\s*"(?P<import>[^"]*)"\s*\)
          | @texture_index\s*\(\s*"(?P<texture_index>[^"]*)"\s*\)
          | @texture\s*\(\s*"(?P<texture>[^"]*)"\s*\)
          | @video\s*\(\s*"(?P<video>[^"]*)"\s*\)
          | @camera\s*\(\s*(?P<camera>-?\d+)\s*\)
          | @sound\s*\(\s*"(?P<sound_play>[^"]*)"\s*\)\s*\.\s*play\s*\(\s*\)
          | @sound\s*\(\s*"(?P<sound_stop>[^"]*)"\s*\)\s*\.\s*stop\s*\(\s*\)
          | @sound\s*\(\s*"(?P<sound_bare>[^"]*)"\s*\)
          | @model\s*\(\s*"(?P<model_pos>[^"]*)"\s*\)\s*\.\s*positions
          | @model\s*\(\s*"(?P<model_norm>[^"]*)"\s*\)\s*\.\s*normals
          | @osc\s*\(\s*"(?P<osc>[^"]*)"\s*\)
          | @str\s*\(\s*"(?P<str_lit>(?:[^"\\]|\\.)*)"\s*\)
          | @engine\.(?P<engine_field>[A-Za-z_][A-Za-z0-9_]*(?:\[[A-Za-z0-9_]+\])?)
            "#,
        )
        .expect("directive regex is a static literal")
    })
}

/// Scans `text` left-to-right for every directive occurrence, in source order.
pub fn scan(text: &str) -> Vec<DirectiveMatch> {
    let mut out = Vec::new();
    for caps in pattern().captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let span = whole.start()..whole.end();
        let directive = if let Some(m) = caps.name("set_title") {
            Directive::SetTitle(m.as_str().to_string())
        } else if let (Some(w), Some(h)) = (caps.name("size_w"), caps.name("size_h")) {
            let parsed = w.as_str().parse::<u32>().ok().zip(h.as_str().parse::<u32>().ok());
            Directive::SetSize(parsed)
        } else if caps.name("size_bad").is_some() {
            Directive::SetSize(None)
        } else if let Some(m) = caps.name("import") {
            Directive::Import(m.as_str().to_string())
        } else if let Some(m) = caps.name("texture_index") {
            Directive::TextureIndex(m.as_str().to_string())
        } else if let Some(m) = caps.name("texture") {
            Directive::Texture(m.as_str().to_string())
        } else if let Some(m) = caps.name("video") {
            Directive::Video(m.as_str().to_string())
        } else if let Some(m) = caps.name("camera") {
            match m.as_str().parse::<i64>() {
                Ok(n) => Directive::Camera(n),
                Err(_) => continue,
            }
        } else if let Some(m) = caps.name("sound_play") {
            Directive::SoundPlay(m.as_str().to_string())
        } else if let Some(m) = caps.name("sound_stop") {
            Directive::SoundStop(m.as_str().to_string())
        } else if let Some(m) = caps.name("sound_bare") {
            Directive::SoundBare(m.as_str().to_string())
        } else if let Some(m) = caps.name("model_pos") {
            Directive::ModelPositions(m.as_str().to_string())
        } else if let Some(m) = caps.name("model_norm") {
            Directive::ModelNormals(m.as_str().to_string())
        } else if let Some(m) = caps.name("osc") {
            Directive::Osc(m.as_str().to_string())
        } else if let Some(m) = caps.name("str_lit") {
            Directive::Str(m.as_str().to_string())
        } else if let Some(m) = caps.name("engine_field") {
            Directive::Engine(m.as_str().to_string())
        } else {
            continue;
        };
        out.push(DirectiveMatch { directive, span });
    }
    out
}

/// Finds every `@import("path")` occurrence, in order, ignoring all other directive families.
/// Used by the import resolver, which must process imports before scanning the rest of a file's
/// directives (spec.md §4.2 processing contract, step 1).
pub fn scan_imports(text: &str) -> Vec<(String, Range<usize>)> {
    scan(text)
        .into_iter()
        .filter_map(|m| match m.directive {
            Directive::Import(path) => Some((path, m.span)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_set_title_and_set_size() {
        let src = r#"@set_title("Bob-Bonker") @set_size(800, 600)"#;
        let found = scan(src);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].directive, Directive::SetTitle("Bob-Bonker".into()));
        assert_eq!(found[1].directive, Directive::SetSize(Some((800, 600))));
    }

    #[test]
    fn malformed_set_size_has_no_parsed_dims() {
        let src = "@set_size(oops)";
        let found = scan(src);
        assert_eq!(found[0].directive, Directive::SetSize(None));
    }

    #[test]
    fn sound_play_stop_and_bare_are_distinct() {
        let src = r#"@sound("bump.ogg").play(); @sound("bump.ogg").stop(); let x = @sound("bump.ogg");"#;
        let found = scan(src);
        assert_eq!(found[0].directive, Directive::SoundPlay("bump.ogg".into()));
        assert_eq!(found[1].directive, Directive::SoundStop("bump.ogg".into()));
        assert_eq!(found[2].directive, Directive::SoundBare("bump.ogg".into()));
    }

    #[test]
    fn texture_index_does_not_get_shadowed_by_texture() {
        let src = r#"@texture_index("player.png")"#;
        let found = scan(src);
        assert_eq!(found[0].directive, Directive::TextureIndex("player.png".into()));
    }

    #[test]
    fn model_positions_and_normals() {
        let src = r#"@model("bunny.obj").positions[i]; @model("bunny.obj").normals[i];"#;
        let found = scan(src);
        assert_eq!(found[0].directive, Directive::ModelPositions("bunny.obj".into()));
        assert_eq!(found[1].directive, Directive::ModelNormals("bunny.obj".into()));
    }

    #[test]
    fn engine_field_with_index() {
        let src = "@engine.keys[KEY_A]";
        let found = scan(src);
        assert_eq!(found[0].directive, Directive::Engine("keys[KEY_A]".into()));
    }

    #[test]
    fn imports_are_found_in_order() {
        let src = r#"@import("a.wgsl") body @import("b.wgsl")"#;
        let imports = scan_imports(src);
        assert_eq!(imports[0].0, "a.wgsl");
        assert_eq!(imports[1].0, "b.wgsl");
    }
}
