//! Audio (spec.md §4.4, §6.5): sounds are decode-validated once at load time and replayed fresh
//! on every `@sound(...).play()` trigger. The host block only ever carries trigger *counters* —
//! actual mixing and playback lives entirely on the Rust side via `rodio`.

use crate::error::{EngineError, Result};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

/// A sound's encoded bytes, kept around so each trigger can open a fresh decoder. Validated once
/// at load time so a broken audio file fails at startup rather than silently on first play.
#[derive(Clone)]
pub struct SoundClip {
    pub path: String,
    bytes: Arc<[u8]>,
}

impl SoundClip {
    pub fn decode(path: &str, bytes: Vec<u8>) -> Result<Self> {
        rodio::Decoder::new(Cursor::new(bytes.clone())).map_err(|e| EngineError::AudioDecode {
            path: PathBuf::from(path),
            message: e.to_string(),
        })?;
        Ok(Self { path: path.to_string(), bytes: Arc::from(bytes) })
    }
}

/// Owns the output device and fires one-shot playback. `_stream` must stay alive for as long as
/// any sink is playing — `rodio`'s `OutputStream` drops silently cut audio.
pub struct AudioOutput {
    _stream: rodio::OutputStream,
    handle: rodio::OutputStreamHandle,
}

impl AudioOutput {
    pub fn new() -> Result<Self> {
        let (stream, handle) = rodio::OutputStream::try_default().map_err(|e| EngineError::AudioDecode {
            path: PathBuf::from("<default output device>"),
            message: e.to_string(),
        })?;
        Ok(Self { _stream: stream, handle })
    }

    /// Plays `clip` once, detached (spec.md §6.5: triggers fire-and-forget, there is no handle
    /// the shader can use to stop an individual playing instance — only silence future triggers
    /// of the same name via `.stop()`, which this crate treats as a no-op marker in WGSL and
    /// leaves any in-flight playback alone).
    pub fn play(&self, clip: &SoundClip) -> Result<()> {
        let sink = rodio::Sink::try_new(&self.handle).map_err(|e| EngineError::AudioDecode {
            path: PathBuf::from(&clip.path),
            message: e.to_string(),
        })?;
        let decoder = rodio::Decoder::new(Cursor::new(clip.bytes.to_vec())).map_err(|e| EngineError::AudioDecode {
            path: PathBuf::from(&clip.path),
            message: e.to_string(),
        })?;
        sink.append(decoder);
        sink.detach();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_WAV: &[u8] = &[
        b'R', b'I', b'F', b'F', 36, 0, 0, 0, b'W', b'A', b'V', b'E', b'f', b'm', b't', b' ', 16, 0,
        0, 0, 1, 0, 1, 0, 0x44, 0xAC, 0, 0, 0x88, 0x58, 1, 0, 2, 0, 16, 0, b'd', b'a', b't', b'a',
        0, 0, 0, 0,
    ];

    #[test]
    fn decodes_a_valid_wav() {
        let clip = SoundClip::decode("bump.wav", MINIMAL_WAV.to_vec()).unwrap();
        assert_eq!(clip.path, "bump.wav");
    }

    #[test]
    fn rejects_garbage_bytes() {
        let result = SoundClip::decode("bad.wav", vec![0u8; 16]);
        assert!(result.is_err());
    }
}
