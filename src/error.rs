//! Error kinds produced by the core (see spec.md §7).

use std::path::PathBuf;

/// Errors that can occur while loading a game (preprocessing + asset pipeline + GPU setup).
///
/// Load-time errors abort the load and are surfaced with the originating path where one exists.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("asset not found: {0}")]
    AssetNotFound(PathBuf),

    #[error("preprocessor syntax error in {path}: {message}")]
    PreprocessSyntax { path: PathBuf, message: String },

    #[error("shader failed to compile: {message}")]
    ShaderCompile { message: String, source: String },

    #[error("GPU device lost: {0}")]
    GpuDeviceLost(String),

    #[error("failed to decode audio asset {path}: {message}")]
    AudioDecode { path: PathBuf, message: String },

    #[error("failed to decode image asset {path}: {message}")]
    ImageDecode { path: PathBuf, message: String },

    #[error("failed to parse OBJ model {path}: {message}")]
    ObjParse { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
