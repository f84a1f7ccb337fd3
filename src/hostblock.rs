//! Host Block (spec.md §3): the CPU-side mirror of the single `read_write` storage buffer shared
//! with every WGSL stage. Byte offsets here must agree exactly with the struct the preprocessor
//! generates in `preprocess::build_header`.

use crate::manifest::ProgramManifest;
use bytemuck::{Pod, Zeroable};

/// Fixed prefix fields before `GameState` begins.
pub const BUTTONS_OFFSET: u32 = 0;
pub const BUTTONS_SIZE: u32 = 48; // array<i32, 12>
pub const TIME_OFFSET: u32 = 48;
pub const DELTA_TIME_OFFSET: u32 = 52;
pub const SCREEN_WIDTH_OFFSET: u32 = 56;
pub const SCREEN_HEIGHT_OFFSET: u32 = 60;
pub const MOUSE_OFFSET: u32 = 64;
pub const MOUSE_SIZE: u32 = 16; // vec4f

/// `GameState` always begins here, whether or not the shader declared one (spec.md §3 table).
pub const STATE_OFFSET: u32 = 80;

/// The fixed, non-`GameState` portion of the host block, as a plain-old-data struct matching the
/// generated `GameEngineHost` prefix byte-for-byte. `GameState`, `audio`, `osc`, and `keys`
/// follow it at the offsets [`ProgramManifest`] computes, and are written directly into the
/// backing byte buffer rather than modeled as Rust fields (their sizes vary per program).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct HostBlockPrefix {
    pub buttons: [i32; 12],
    pub time: f32,
    pub delta_time: f32,
    pub screen_width: f32,
    pub screen_height: f32,
    pub mouse: [f32; 4],
}

impl Default for HostBlockPrefix {
    fn default() -> Self {
        Self {
            buttons: [0; 12],
            time: 0.0,
            delta_time: 0.0,
            screen_width: 0.0,
            screen_height: 0.0,
            mouse: [0.0; 4],
        }
    }
}

/// A CPU-resident byte image of the entire host block for one program, sized from its manifest.
/// The frame scheduler mutates regions of this buffer in place and uploads the whole thing each
/// frame (spec.md §4.7).
pub struct HostBlock {
    bytes: Vec<u8>,
    manifest_audio_offset: u32,
    manifest_osc_offset: u32,
    manifest_keys_offset: u32,
    sound_count: usize,
}

impl HostBlock {
    pub fn new(manifest: &ProgramManifest) -> Self {
        let size = manifest.host_block_size() as usize;
        let mut bytes = vec![0u8; size];
        bytes[TIME_OFFSET as usize..STATE_OFFSET as usize].fill(0);
        Self {
            bytes,
            manifest_audio_offset: manifest.audio_offset(),
            manifest_osc_offset: manifest.osc_offset(),
            manifest_keys_offset: manifest.keys_offset(),
            sound_count: manifest.sounds.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn prefix_mut(&mut self) -> &mut HostBlockPrefix {
        bytemuck::from_bytes_mut(&mut self.bytes[..std::mem::size_of::<HostBlockPrefix>()])
    }

    pub fn prefix(&self) -> &HostBlockPrefix {
        bytemuck::from_bytes(&self.bytes[..std::mem::size_of::<HostBlockPrefix>()])
    }

    pub fn set_buttons(&mut self, buttons: [i32; 12]) {
        self.prefix_mut().buttons = buttons;
    }

    pub fn set_time(&mut self, time: f32, delta_time: f32) {
        let p = self.prefix_mut();
        p.time = time;
        p.delta_time = delta_time;
    }

    pub fn set_screen_size(&mut self, width: f32, height: f32) {
        let p = self.prefix_mut();
        p.screen_width = width;
        p.screen_height = height;
    }

    pub fn set_mouse(&mut self, x: f32, y: f32, buttons: f32, wheel: f32) {
        self.prefix_mut().mouse = [x, y, buttons, wheel];
    }

    /// Overwrites the `GameState` region with raw bytes (already laid out by the host's own
    /// `GameState`-mirroring type; this crate never has visibility into those field names).
    pub fn set_game_state_bytes(&mut self, bytes: &[u8]) {
        let start = STATE_OFFSET as usize;
        let end = start + bytes.len();
        self.bytes[start..end].copy_from_slice(bytes);
    }

    pub fn game_state_bytes(&self, size: usize) -> &[u8] {
        let start = STATE_OFFSET as usize;
        &self.bytes[start..start + size]
    }

    /// Reads the `audio[N_sound]` trigger counters.
    pub fn audio_counters(&self) -> &[u32] {
        if self.sound_count == 0 {
            return &[];
        }
        let start = self.manifest_audio_offset as usize;
        let end = start + 4 * self.sound_count;
        bytemuck::cast_slice(&self.bytes[start..end])
    }

    /// Resets every audio trigger counter to zero (spec.md §4.7 step 9: counters are consumed
    /// and cleared once per frame after the host reads them).
    pub fn reset_audio_counters(&mut self) {
        if self.sound_count == 0 {
            return;
        }
        let start = self.manifest_audio_offset as usize;
        let end = start + 4 * self.sound_count;
        self.bytes[start..end].fill(0);
    }

    /// Writes one OSC parameter's current value into `osc[index]`.
    pub fn set_osc(&mut self, index: usize, value: f32) {
        let start = self.manifest_osc_offset as usize + 4 * index;
        self.bytes[start..start + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Writes the raw key state (`0` up, `1` down) for every slot in `keys[194]` (spec.md §6.3).
    pub fn set_keys(&mut self, keys: &[i32]) {
        let start = self.manifest_keys_offset as usize;
        let dst: &mut [i32] = bytemuck::cast_slice_mut(&mut self.bytes[start..start + 4 * keys.len()]);
        dst.copy_from_slice(keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_size_matches_state_offset() {
        assert_eq!(std::mem::size_of::<HostBlockPrefix>(), STATE_OFFSET as usize);
    }

    #[test]
    fn host_block_round_trips_prefix_fields() {
        let manifest = ProgramManifest::new();
        let mut hb = HostBlock::new(&manifest);
        hb.set_time(1.5, 0.016);
        hb.set_screen_size(800.0, 600.0);
        hb.set_mouse(10.0, 20.0, 1.0, 0.0);
        hb.set_buttons([1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);

        let p = hb.prefix();
        assert_eq!(p.time, 1.5);
        assert_eq!(p.delta_time, 0.016);
        assert_eq!(p.screen_width, 800.0);
        assert_eq!(p.mouse, [10.0, 20.0, 1.0, 0.0]);
        assert_eq!(p.buttons[0], 1);
    }

    #[test]
    fn audio_counters_reset_to_zero() {
        let mut manifest = ProgramManifest::new();
        manifest.sounds = vec!["bump.ogg".to_string(), "jump.ogg".to_string()];
        let mut hb = HostBlock::new(&manifest);
        assert_eq!(hb.audio_counters(), &[0, 0]);
        let offset = manifest.audio_offset() as usize;
        hb_write_u32(&mut hb, offset, 3);
        assert_eq!(hb.audio_counters()[0], 3);
        hb.reset_audio_counters();
        assert_eq!(hb.audio_counters(), &[0, 0]);
    }

    fn hb_write_u32(hb: &mut HostBlock, byte_offset: usize, value: u32) {
        hb.bytes[byte_offset..byte_offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn osc_and_keys_offsets_do_not_overlap() {
        let mut manifest = ProgramManifest::new();
        manifest.sounds = vec!["a.ogg".to_string()];
        let mut hb = HostBlock::new(&manifest);
        hb.set_osc(0, 0.5);
        hb.set_osc(63, 1.0);
        let keys = vec![0i32; crate::keys::NUM_KEYS];
        hb.set_keys(&keys);
        assert!(hb.as_bytes().len() >= manifest.host_block_size() as usize);
    }
}
