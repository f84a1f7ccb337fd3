//! A host runtime for single-file games authored entirely as WGSL, extended with a small set of
//! `@`-prefixed directives for assets, input, audio, and OSC (spec.md §1).
//!
//! The pipeline from a game root to a running window is, in dependency order: [`resolver`] reads
//! bytes off disk or out of a zip archive; [`directives`] and [`layout`] are driven by
//! [`preprocess`] to produce a [`manifest::ProgramManifest`]; [`assets`] loads everything the
//! manifest names; [`binding`] derives the `wgpu` bind group layouts; [`hostblock`] mirrors the
//! shared engine-state buffer; [`scheduler`] runs the fixed per-frame protocol; and [`app`] wires
//! all of it into a `winit` event loop, with [`hotreload`] watching the game root for changes.

pub mod app;
pub mod assets;
pub mod binding;
pub mod core;
pub mod directives;
pub mod error;
pub mod hostblock;
pub mod hotreload;
pub mod keys;
pub mod layout;
pub mod manifest;
pub mod osc;
pub mod preprocess;
pub mod resolver;
pub mod scheduler;

pub use error::{EngineError, Result};
pub use manifest::ProgramManifest;
