//! The Program Manifest (spec.md §3): the preprocessor's structured output describing assets,
//! sizes, and binding decisions. Everything downstream (asset pipeline, binding planner, host
//! block) is derived purely from this struct.

/// Maximum number of OSC parameter slots (spec.md §3, §6.4).
pub const MAX_OSC_PARAMS: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct ProgramManifest {
    pub title: String,
    pub width: u32,
    pub height: u32,

    /// Ordered; position is the texture's binding index offset within group 0.
    pub textures: Vec<String>,
    /// Ordered; position is the video's binding index offset, after `textures`.
    pub videos: Vec<String>,
    /// Ordered device indices; position is the camera's binding index offset, after `videos`.
    pub cameras: Vec<i64>,
    /// Ordered; position is the sound's index into `audio[N_sound]`.
    pub sounds: Vec<String>,
    /// Ordered; position is the model's index (two bindings per model in group 2).
    pub models: Vec<String>,
    /// Ordered; position is the index into `osc[64]`.
    pub osc_params: Vec<String>,

    pub game_state_size: u32,
    pub game_state_alignment: u32,

    pub generated_wgsl: String,
}

impl ProgramManifest {
    pub fn new() -> Self {
        Self {
            width: 800,
            height: 600,
            game_state_size: 16,
            game_state_alignment: 4,
            ..Default::default()
        }
    }

    /// Total number of float-sampled 2D textures bound in group 0 after the sampler
    /// (static textures, then videos, then cameras, in that order — spec.md §4.5).
    pub fn total_fragment_textures(&self) -> usize {
        self.textures.len() + self.videos.len() + self.cameras.len()
    }

    /// Byte offset, within the host block, of the `audio[N_sound]` region.
    pub fn audio_offset(&self) -> u32 {
        crate::hostblock::STATE_OFFSET + self.game_state_size
    }

    /// Byte offset, within the host block, of the `osc[64]` region.
    pub fn osc_offset(&self) -> u32 {
        self.audio_offset() + 4 * self.sounds.len() as u32
    }

    /// Byte offset, within the host block, of the `keys[194]` region.
    pub fn keys_offset(&self) -> u32 {
        self.osc_offset() + 4 * MAX_OSC_PARAMS as u32
    }

    /// Total host block size, rounded up to a multiple of 16 (spec.md §3).
    pub fn host_block_size(&self) -> u32 {
        let raw = self.keys_offset() + 4 * crate::keys::NUM_KEYS as u32;
        round_up(raw, 16)
    }
}

pub fn round_up(value: u32, multiple: u32) -> u32 {
    if multiple == 0 {
        return value;
    }
    let rem = value % multiple;
    if rem == 0 {
        value
    } else {
        value + (multiple - rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_game_state_host_block_is_96_plus_regions() {
        let m = ProgramManifest::new();
        // 80 (prefix) + 16 (default GameState) + 0 audio + 256 osc + 4*194 keys = 1128
        assert_eq!(m.audio_offset(), 96);
        assert_eq!(m.osc_offset(), 96);
        assert_eq!(m.keys_offset(), 96 + 256);
        let expected = round_up(96 + 256 + 4 * crate::keys::NUM_KEYS as u32, 16);
        assert_eq!(m.host_block_size(), expected);
    }

    #[test]
    fn round_up_multiple_of_16() {
        assert_eq!(round_up(96, 16), 96);
        assert_eq!(round_up(100, 16), 112);
        assert_eq!(round_up(108, 16), 112);
    }
}
