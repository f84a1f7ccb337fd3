//! Black-box scenarios over small, realistic game roots (spec.md §8): each writes a temp
//! directory shaped like a real game and checks the preprocessor's observable output — manifest
//! contents and the generated WGSL — rather than any particular internal representation.

use std::fs;
use wgsl_arcade::preprocess::preprocess;
use wgsl_arcade::resolver::DirectoryResolver;

fn write_game(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let full = dir.path().join(name);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    dir
}

/// A single-screen platformer: one sprite texture, gravity in `GameState`, a jump sound, and a
/// title/size directive pair.
#[test]
fn bob_demo_discovers_one_texture_one_sound_and_sizes_the_window() {
    let dir = write_game(&[(
        "main.wgsl",
        r#"
        @set_title("Bob-Bonker")
        @set_size(800, 600)
        struct GameState {
            pos: vec2f,
            vel: vec2f,
            grounded: u32,
        }
        fn update() {
            engine.state.vel.y += 9.8 * engine.delta_time;
            if (engine.buttons[BUTTON_A] == 1 && engine.state.grounded == 1u) {
                engine.state.vel.y = -5.0;
                @sound("jump.ogg").play();
            }
        }
        fn fs_render() {
            let c = textureSample(@texture("bob.png"), _sampler, vec2f(0.0));
        }
        "#,
    )]);
    let resolver = DirectoryResolver::new(dir.path());
    let manifest = preprocess(&resolver, "main.wgsl").unwrap();

    assert_eq!(manifest.title, "Bob-Bonker");
    assert_eq!((manifest.width, manifest.height), (800, 600));
    assert_eq!(manifest.textures, vec!["bob.png".to_string()]);
    assert_eq!(manifest.sounds, vec!["jump.ogg".to_string()]);
    assert!(manifest.generated_wgsl.contains("BUTTON_A: u32 = 4u"));
}

/// A grid-based game: no textures, a fixed-size board in `GameState`, OSC-driven difficulty.
#[test]
fn snake_demo_uses_osc_for_difficulty_and_no_textures() {
    let dir = write_game(&[(
        "main.wgsl",
        r#"
        @set_title("Snake")
        struct GameState {
            length: u32,
            direction: u32,
        }
        fn update() {
            let speed = @osc("difficulty");
            engine.state.length += 1u;
        }
        "#,
    )]);
    let resolver = DirectoryResolver::new(dir.path());
    let manifest = preprocess(&resolver, "main.wgsl").unwrap();

    assert!(manifest.textures.is_empty());
    assert_eq!(manifest.osc_params, vec!["difficulty".to_string()]);
    assert!(manifest.generated_wgsl.contains("engine.osc[0]"));
}

/// A scene driven entirely by keyboard: checks a handful of named key constants round-trip
/// through the generated header in the order spec.md §6.1 fixes.
#[test]
fn input_demo_exposes_named_key_constants_for_every_discovered_key() {
    let dir = write_game(&[(
        "main.wgsl",
        r#"
        fn update() {
            if (engine.keys[KEY_SPACE] == 1) {
                engine.state.dummy = 1u;
            }
        }
        struct GameState { dummy: u32 }
        "#,
    )]);
    let resolver = DirectoryResolver::new(dir.path());
    let manifest = preprocess(&resolver, "main.wgsl").unwrap();
    assert!(manifest.generated_wgsl.contains("const KEY_SPACE: u32"));
    assert!(manifest.generated_wgsl.contains(&format!("keys: array<i32, {}>", wgsl_arcade::keys::NUM_KEYS)));
}

/// A tile-based RPG scene importing a shared tileset module and binding two textures plus a
/// camera feed for a picture-in-picture minimap.
#[test]
fn rpg_tiles_imports_a_shared_module_and_orders_textures_before_the_camera() {
    let dir = write_game(&[
        (
            "main.wgsl",
            r#"
            @import("tileset.wgsl")
            @set_title("Ruins")
            fn fs_render() {
                let ground = textureSample(@texture("tiles/ground.png"), _sampler, vec2f(0.0));
                let overlay = textureSample(@texture("tiles/overlay.png"), _sampler, vec2f(0.0));
                let cam = textureSample(@camera(0), _sampler, vec2f(0.0));
                let shade = tile_shade(ground);
            }
            "#,
        ),
        (
            "tileset.wgsl",
            r#"fn tile_shade(c: vec4f) -> vec4f { return c * 0.8; }"#,
        ),
    ]);
    let resolver = DirectoryResolver::new(dir.path());
    let manifest = preprocess(&resolver, "main.wgsl").unwrap();

    assert_eq!(manifest.textures, vec!["tiles/ground.png".to_string(), "tiles/overlay.png".to_string()]);
    assert_eq!(manifest.cameras, vec![0]);
    assert!(manifest.generated_wgsl.contains("fn tile_shade"));
    // Camera binds after both textures: binding 1 + 2 textures = binding 3.
    assert!(manifest.generated_wgsl.contains("@group(0) @binding(3) var _texture_2"));
}

/// A program that binds a 3D model: checks the model is registered once even though both
/// directive forms (`@model_positions`/`@model_normals`) reference it.
#[test]
fn bunny_obj_model_registers_once_across_both_directive_forms() {
    let dir = write_game(&[(
        "main.wgsl",
        r#"
        fn vs_main() {
            let p = @model_positions("bunny.obj");
            let n = @model_normals("bunny.obj");
        }
        "#,
    )]);
    let resolver = DirectoryResolver::new(dir.path());
    let manifest = preprocess(&resolver, "main.wgsl").unwrap();

    assert_eq!(manifest.models, vec!["bunny.obj".to_string()]);
    assert!(manifest.generated_wgsl.contains("@group(2) @binding(1) var _model_0_positions"));
    assert!(manifest.generated_wgsl.contains("@group(2) @binding(2) var _model_0_normals"));
}
