//! File Resolver (spec.md §4.1): abstract byte/text read by relative path, backed by either a
//! directory on disk or an in-memory archive (zip).

use crate::error::{EngineError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// The magic four bytes at the start of a zip archive (`PK\x03\x04`).
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];

/// A capability set for reading game assets by relative path. Implementations decide where
/// bytes actually live; callers never need to know whether it's a directory or an archive.
pub trait FileResolver: Send + Sync {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|e| EngineError::PreprocessSyntax {
            path: PathBuf::from(path),
            message: format!("not valid UTF-8: {e}"),
        })
    }
}

/// Resolves paths relative to a directory on disk.
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl FileResolver for DirectoryResolver {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.full_path(path);
        std::fs::read(&full).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::AssetNotFound(PathBuf::from(path))
            } else {
                EngineError::Io(e)
            }
        })
    }
}

/// Resolves paths against a flat map of filename -> bytes, loaded once from a zip archive.
pub struct ArchiveResolver {
    entries: HashMap<String, Vec<u8>>,
}

impl ArchiveResolver {
    /// Detects the zip magic (`PK\x03\x04`) at the start of `bytes`.
    pub fn looks_like_archive(bytes: &[u8]) -> bool {
        bytes.len() >= 4 && bytes[..4] == ZIP_MAGIC
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let cursor = std::io::Cursor::new(bytes);
        let mut zip = zip::ZipArchive::new(cursor).map_err(|e| EngineError::PreprocessSyntax {
            path: PathBuf::from("<archive>"),
            message: format!("not a valid archive: {e}"),
        })?;

        let mut entries = HashMap::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).map_err(|e| EngineError::PreprocessSyntax {
                path: PathBuf::from("<archive>"),
                message: e.to_string(),
            })?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.insert(normalize(&name), data);
        }
        Ok(Self { entries })
    }
}

impl FileResolver for ArchiveResolver {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.entries
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| EngineError::AssetNotFound(PathBuf::from(path)))
    }
}

/// Normalizes path separators so `"sprites/a.png"` and `"sprites\\a.png"` resolve identically.
fn normalize(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches("./").to_string()
}

/// Picks a resolver for a game path: a directory if `path` is a directory, otherwise an
/// archive if the file's contents start with the zip magic, otherwise a single-file directory
/// resolver rooted at the file's parent (a bare `main.wgsl`).
pub fn resolve_game_root(path: &Path) -> Result<(Box<dyn FileResolver>, String)> {
    if path.is_dir() {
        return Ok((Box::new(DirectoryResolver::new(path)), "main.wgsl".to_string()));
    }

    let bytes = std::fs::read(path)?;
    if ArchiveResolver::looks_like_archive(&bytes) {
        let resolver = ArchiveResolver::from_bytes(bytes)?;
        return Ok((Box::new(resolver), "main.wgsl".to_string()));
    }

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let entry = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("main.wgsl")
        .to_string();
    Ok((Box::new(DirectoryResolver::new(parent)), entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_resolver_reads_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.wgsl"), b"// hi").unwrap();
        let resolver = DirectoryResolver::new(dir.path());
        assert_eq!(resolver.read_text("main.wgsl").unwrap(), "// hi");
    }

    #[test]
    fn directory_resolver_missing_file_is_asset_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = DirectoryResolver::new(dir.path());
        match resolver.read_bytes("nope.png") {
            Err(EngineError::AssetNotFound(p)) => assert_eq!(p, PathBuf::from("nope.png")),
            other => panic!("expected AssetNotFound, got {other:?}"),
        }
    }

    #[test]
    fn archive_magic_detection() {
        assert!(ArchiveResolver::looks_like_archive(&[0x50, 0x4b, 0x03, 0x04, 0, 0]));
        assert!(!ArchiveResolver::looks_like_archive(b"not a zip"));
        assert!(!ArchiveResolver::looks_like_archive(&[0x50, 0x4b]));
    }
}
