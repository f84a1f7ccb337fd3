//! The fixed 194-entry key table (spec.md §6.3). Ordering here must agree exactly with the
//! `KEY_*` constants the preprocessor emits into generated WGSL headers (see `preprocess.rs`)
//! and with the `winit::keyboard::KeyCode -> index` mapping used by the runtime shell to fill
//! `engine.keys` every frame.

/// Total size of the `keys` array in the host block.
pub const NUM_KEYS: usize = 194;

/// The table, in order. Names match `winit::keyboard::KeyCode` variant names so the runtime
/// shell's key-event mapping is a straight `match`.
pub const KEY_NAMES: [&str; NUM_KEYS] = [
    // 0..=49: writing-system keys, letters starting at 19 (spec.md anchor).
    "Backquote", "Backslash", "BracketLeft", "BracketRight", "Comma",
    "Digit0", "Digit1", "Digit2", "Digit3", "Digit4", "Digit5", "Digit6", "Digit7", "Digit8", "Digit9",
    "Equal",
    "IntlBackslash", "IntlRo", "IntlYen",
    "KeyA", "KeyB", "KeyC", "KeyD", "KeyE", "KeyF", "KeyG", "KeyH", "KeyI", "KeyJ", "KeyK", "KeyL",
    "KeyM", "KeyN", "KeyO", "KeyP", "KeyQ", "KeyR", "KeyS", "KeyT", "KeyU", "KeyV", "KeyW", "KeyX",
    "KeyY", "KeyZ",
    "Minus", "Period", "Quote", "Semicolon", "Slash",
    // 50..=82: modifiers + functional keys + arrows (spec.md anchor: first 83 entries end here).
    "AltLeft", "AltRight", "Backspace", "CapsLock", "ContextMenu", "ControlLeft", "ControlRight",
    "Enter", "MetaLeft", "MetaRight", "ShiftLeft", "ShiftRight", "Space", "Tab",
    "ArrowDown", "ArrowLeft", "ArrowRight", "ArrowUp",
    "End", "Home", "PageDown", "PageUp", "Delete", "Insert", "Escape", "Pause", "PrintScreen",
    "ScrollLock", "NumLock", "Fn", "FnLock", "Eject", "Power",
    // 83..=99: numpad.
    "Numpad0", "Numpad1", "Numpad2", "Numpad3", "Numpad4", "Numpad5", "Numpad6", "Numpad7",
    "Numpad8", "Numpad9", "NumpadAdd", "NumpadSubtract", "NumpadMultiply", "NumpadDivide",
    "NumpadDecimal", "NumpadEnter", "NumpadEqual",
    // 100..=118: browser / media / system keys.
    "BrowserBack", "BrowserFavorites", "BrowserForward", "BrowserHome", "BrowserRefresh",
    "BrowserSearch", "BrowserStop", "LaunchApp1", "LaunchApp2", "LaunchMail", "MediaPlayPause",
    "MediaSelect", "MediaStop", "MediaTrackNext", "MediaTrackPrevious", "Sleep",
    "AudioVolumeDown", "AudioVolumeMute", "AudioVolumeUp",
    // 119..=126: IME / language keys.
    "Lang1", "Lang2", "Lang3", "Lang4", "Lang5", "Convert", "NonConvert", "KanaMode",
    // 127..=158: reserved for future expansion (kept addressable, never set by the runtime shell).
    "Reserved0", "Reserved1", "Reserved2", "Reserved3", "Reserved4", "Reserved5", "Reserved6",
    "Reserved7", "Reserved8", "Reserved9", "Reserved10", "Reserved11", "Reserved12", "Reserved13",
    "Reserved14", "Reserved15", "Reserved16", "Reserved17", "Reserved18", "Reserved19",
    "Reserved20", "Reserved21", "Reserved22", "Reserved23", "Reserved24", "Reserved25",
    "Reserved26", "Reserved27", "Reserved28", "Reserved29", "Reserved30", "Reserved31",
    // 159..=170: function keys F1-F12 (spec.md anchor).
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12",
    // 171..=182: F13-F24.
    "F13", "F14", "F15", "F16", "F17", "F18", "F19", "F20", "F21", "F22", "F23", "F24",
    // 183..=193: miscellaneous "edit" keys.
    "Again", "Copy", "Cut", "Find", "Open", "Paste", "Props", "Select", "Undo", "Unidentified",
    "WakeUp",
];

/// Maps a `winit` physical key code to its index in `keys[194]`, or `None` if the key isn't
/// tracked (reserved slots are addressable from WGSL but never set).
pub fn index_for_winit_keycode(code: winit::keyboard::KeyCode) -> Option<usize> {
    use winit::keyboard::KeyCode as K;
    let name: &str = match code {
        K::Backquote => "Backquote",
        K::Backslash => "Backslash",
        K::BracketLeft => "BracketLeft",
        K::BracketRight => "BracketRight",
        K::Comma => "Comma",
        K::Digit0 => "Digit0",
        K::Digit1 => "Digit1",
        K::Digit2 => "Digit2",
        K::Digit3 => "Digit3",
        K::Digit4 => "Digit4",
        K::Digit5 => "Digit5",
        K::Digit6 => "Digit6",
        K::Digit7 => "Digit7",
        K::Digit8 => "Digit8",
        K::Digit9 => "Digit9",
        K::Equal => "Equal",
        K::IntlBackslash => "IntlBackslash",
        K::IntlRo => "IntlRo",
        K::IntlYen => "IntlYen",
        K::KeyA => "KeyA",
        K::KeyB => "KeyB",
        K::KeyC => "KeyC",
        K::KeyD => "KeyD",
        K::KeyE => "KeyE",
        K::KeyF => "KeyF",
        K::KeyG => "KeyG",
        K::KeyH => "KeyH",
        K::KeyI => "KeyI",
        K::KeyJ => "KeyJ",
        K::KeyK => "KeyK",
        K::KeyL => "KeyL",
        K::KeyM => "KeyM",
        K::KeyN => "KeyN",
        K::KeyO => "KeyO",
        K::KeyP => "KeyP",
        K::KeyQ => "KeyQ",
        K::KeyR => "KeyR",
        K::KeyS => "KeyS",
        K::KeyT => "KeyT",
        K::KeyU => "KeyU",
        K::KeyV => "KeyV",
        K::KeyW => "KeyW",
        K::KeyX => "KeyX",
        K::KeyY => "KeyY",
        K::KeyZ => "KeyZ",
        K::Minus => "Minus",
        K::Period => "Period",
        K::Quote => "Quote",
        K::Semicolon => "Semicolon",
        K::Slash => "Slash",
        K::AltLeft => "AltLeft",
        K::AltRight => "AltRight",
        K::Backspace => "Backspace",
        K::CapsLock => "CapsLock",
        K::ContextMenu => "ContextMenu",
        K::ControlLeft => "ControlLeft",
        K::ControlRight => "ControlRight",
        K::Enter => "Enter",
        K::MetaLeft => "MetaLeft",
        K::MetaRight => "MetaRight",
        K::ShiftLeft => "ShiftLeft",
        K::ShiftRight => "ShiftRight",
        K::Space => "Space",
        K::Tab => "Tab",
        K::ArrowDown => "ArrowDown",
        K::ArrowLeft => "ArrowLeft",
        K::ArrowRight => "ArrowRight",
        K::ArrowUp => "ArrowUp",
        K::End => "End",
        K::Home => "Home",
        K::PageDown => "PageDown",
        K::PageUp => "PageUp",
        K::Delete => "Delete",
        K::Insert => "Insert",
        K::Escape => "Escape",
        K::Pause => "Pause",
        K::PrintScreen => "PrintScreen",
        K::ScrollLock => "ScrollLock",
        K::NumLock => "NumLock",
        K::Fn => "Fn",
        K::FnLock => "FnLock",
        K::Eject => "Eject",
        K::Power => "Power",
        K::Numpad0 => "Numpad0",
        K::Numpad1 => "Numpad1",
        K::Numpad2 => "Numpad2",
        K::Numpad3 => "Numpad3",
        K::Numpad4 => "Numpad4",
        K::Numpad5 => "Numpad5",
        K::Numpad6 => "Numpad6",
        K::Numpad7 => "Numpad7",
        K::Numpad8 => "Numpad8",
        K::Numpad9 => "Numpad9",
        K::NumpadAdd => "NumpadAdd",
        K::NumpadSubtract => "NumpadSubtract",
        K::NumpadMultiply => "NumpadMultiply",
        K::NumpadDivide => "NumpadDivide",
        K::NumpadDecimal => "NumpadDecimal",
        K::NumpadEnter => "NumpadEnter",
        K::NumpadEqual => "NumpadEqual",
        K::BrowserBack => "BrowserBack",
        K::BrowserFavorites => "BrowserFavorites",
        K::BrowserForward => "BrowserForward",
        K::BrowserHome => "BrowserHome",
        K::BrowserRefresh => "BrowserRefresh",
        K::BrowserSearch => "BrowserSearch",
        K::BrowserStop => "BrowserStop",
        K::LaunchApp1 => "LaunchApp1",
        K::LaunchApp2 => "LaunchApp2",
        K::LaunchMail => "LaunchMail",
        K::MediaPlayPause => "MediaPlayPause",
        K::MediaSelect => "MediaSelect",
        K::MediaStop => "MediaStop",
        K::MediaTrackNext => "MediaTrackNext",
        K::MediaTrackPrevious => "MediaTrackPrevious",
        K::Sleep => "Sleep",
        K::AudioVolumeDown => "AudioVolumeDown",
        K::AudioVolumeMute => "AudioVolumeMute",
        K::AudioVolumeUp => "AudioVolumeUp",
        K::Lang1 => "Lang1",
        K::Lang2 => "Lang2",
        K::Lang3 => "Lang3",
        K::Lang4 => "Lang4",
        K::Lang5 => "Lang5",
        K::Convert => "Convert",
        K::NonConvert => "NonConvert",
        K::KanaMode => "KanaMode",
        K::F1 => "F1",
        K::F2 => "F2",
        K::F3 => "F3",
        K::F4 => "F4",
        K::F5 => "F5",
        K::F6 => "F6",
        K::F7 => "F7",
        K::F8 => "F8",
        K::F9 => "F9",
        K::F10 => "F10",
        K::F11 => "F11",
        K::F12 => "F12",
        K::F13 => "F13",
        K::F14 => "F14",
        K::F15 => "F15",
        K::F16 => "F16",
        K::F17 => "F17",
        K::F18 => "F18",
        K::F19 => "F19",
        K::F20 => "F20",
        K::F21 => "F21",
        K::F22 => "F22",
        K::F23 => "F23",
        K::F24 => "F24",
        K::Again => "Again",
        K::Copy => "Copy",
        K::Cut => "Cut",
        K::Find => "Find",
        K::Open => "Open",
        K::Paste => "Paste",
        K::Props => "Props",
        K::Select => "Select",
        K::Undo => "Undo",
        K::WakeUp => "WakeUp",
        _ => return None,
    };
    index_for_name(name)
}

/// Looks up a key's index in the table by its `KEY_*` constant name suffix (e.g. `"A"` for
/// `KEY_A`, matched against the `KeyA` table entry).
pub fn index_for_name(name: &str) -> Option<usize> {
    KEY_NAMES.iter().position(|n| *n == name)
}

/// Converts a table entry name to the `KEY_*` constant identifier the preprocessor emits
/// (e.g. `"KeyA"` -> `"KEY_A"`, `"ArrowUp"` -> `"KEY_ARROW_UP"`).
pub fn constant_name(table_name: &str) -> String {
    let stripped = table_name.strip_prefix("Key").unwrap_or(table_name);
    let mut out = String::from("KEY_");
    let mut prev_lower = false;
    for c in stripped.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
        prev_lower = c.is_ascii_lowercase();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_194_entries() {
        assert_eq!(KEY_NAMES.len(), NUM_KEYS);
    }

    #[test]
    fn letters_start_at_19() {
        assert_eq!(KEY_NAMES[19], "KeyA");
        assert_eq!(KEY_NAMES[44], "KeyZ");
    }

    #[test]
    fn function_keys_at_159_170() {
        assert_eq!(KEY_NAMES[159], "F1");
        assert_eq!(KEY_NAMES[170], "F12");
    }

    #[test]
    fn constant_names_match_spec_examples() {
        assert_eq!(constant_name("KeyA"), "KEY_A");
        assert_eq!(constant_name("ArrowUp"), "KEY_ARROW_UP");
        assert_eq!(constant_name("F1"), "KEY_F1");
    }

    #[test]
    fn key_a_constant_index_is_19() {
        assert_eq!(index_for_name("KeyA"), Some(19));
    }
}
