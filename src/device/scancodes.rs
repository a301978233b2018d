//! Scan Code Set 2 translation.
//!
//! Make codes only; a break is `F0` followed by the make code, and extended
//! keys put `E0` in front of both. PrintScreen and Pause don't follow that
//! shape and are sent as fixed macros.

use hex_literal::hex;
use tracing::warn;

use super::keycodes::*;
use super::report::Modifiers;

pub const PREFIX_E0: u8 = 0xE0;
pub const PREFIX_E1: u8 = 0xE1;
pub const PREFIX_BREAK: u8 = 0xF0;

pub const PRINT_SCREEN_MAKE: [u8; 4] = hex!("E0 12 E0 7C");
pub const PRINT_SCREEN_BREAK: [u8; 6] = hex!("E0 F0 7C E0 F0 12");
/// Pause has no break code; the macro already contains the releases.
pub const PAUSE_MAKE: [u8; 8] = hex!("E1 14 77 E1 F0 14 F0 77");

/// Longest make or break any mapping produces.
pub const MAX_SEQUENCE: usize = PAUSE_MAKE.len();

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpecialKey {
    #[default]
    Normal,
    PrintScreen,
    Pause,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScancodeMapping {
    pub scancode: u8,
    pub extended: bool,
    pub special: SpecialKey,
}

impl ScancodeMapping {
    pub const fn normal(scancode: u8) -> Self {
        Self {
            scancode,
            extended: false,
            special: SpecialKey::Normal,
        }
    }

    pub const fn extended(scancode: u8) -> Self {
        Self {
            scancode,
            extended: true,
            special: SpecialKey::Normal,
        }
    }

    const fn special(scancode: u8, special: SpecialKey) -> Self {
        Self {
            scancode,
            extended: false,
            special,
        }
    }

    pub fn make_bytes(&self) -> Vec<u8> {
        match self.special {
            SpecialKey::PrintScreen => PRINT_SCREEN_MAKE.to_vec(),
            SpecialKey::Pause => PAUSE_MAKE.to_vec(),
            SpecialKey::Normal if self.extended => vec![PREFIX_E0, self.scancode],
            SpecialKey::Normal => vec![self.scancode],
        }
    }

    /// Empty for Pause.
    pub fn break_bytes(&self) -> Vec<u8> {
        match self.special {
            SpecialKey::PrintScreen => PRINT_SCREEN_BREAK.to_vec(),
            SpecialKey::Pause => Vec::new(),
            SpecialKey::Normal if self.extended => {
                vec![PREFIX_E0, PREFIX_BREAK, self.scancode]
            }
            SpecialKey::Normal => vec![PREFIX_BREAK, self.scancode],
        }
    }
}

const fn n(scancode: u8) -> ScancodeMapping {
    ScancodeMapping::normal(scancode)
}

const fn e(scancode: u8) -> ScancodeMapping {
    ScancodeMapping::extended(scancode)
}

/// Ordinary keys, sorted by keycode for binary search.
const PRIMARY: &[(u16, ScancodeMapping)] = &[
    (KC_A, n(0x1C)),
    (KC_B, n(0x32)),
    (KC_C, n(0x21)),
    (KC_D, n(0x23)),
    (KC_E, n(0x24)),
    (KC_F, n(0x2B)),
    (KC_G, n(0x34)),
    (KC_H, n(0x33)),
    (KC_I, n(0x43)),
    (KC_J, n(0x3B)),
    (KC_K, n(0x42)),
    (KC_L, n(0x4B)),
    (KC_M, n(0x3A)),
    (KC_N, n(0x31)),
    (KC_O, n(0x44)),
    (KC_P, n(0x4D)),
    (KC_Q, n(0x15)),
    (KC_R, n(0x2D)),
    (KC_S, n(0x1B)),
    (KC_T, n(0x2C)),
    (KC_U, n(0x3C)),
    (KC_V, n(0x2A)),
    (KC_W, n(0x1D)),
    (KC_X, n(0x22)),
    (KC_Y, n(0x35)),
    (KC_Z, n(0x1A)),
    (KC_1, n(0x16)),
    (KC_2, n(0x1E)),
    (KC_3, n(0x26)),
    (KC_4, n(0x25)),
    (KC_5, n(0x2E)),
    (KC_6, n(0x36)),
    (KC_7, n(0x3D)),
    (KC_8, n(0x3E)),
    (KC_9, n(0x46)),
    (KC_0, n(0x45)),
    (KC_ENTER, n(0x5A)),
    (KC_ESCAPE, n(0x76)),
    (KC_BSPC, n(0x66)),
    (KC_TAB, n(0x0D)),
    (KC_SPACE, n(0x29)),
    (KC_MINUS, n(0x4E)),
    (KC_EQUAL, n(0x55)),
    (KC_LBRC, n(0x54)),
    (KC_RBRC, n(0x5B)),
    (KC_BSLS, n(0x5D)),
    (KC_NUHS, n(0x5D)),
    (KC_SCLN, n(0x4C)),
    (KC_QUOTE, n(0x52)),
    (KC_GRAVE, n(0x0E)),
    (KC_COMMA, n(0x41)),
    (KC_DOT, n(0x49)),
    (KC_SLASH, n(0x4A)),
    (KC_CAPS, n(0x58)),
    (KC_F1, n(0x05)),
    (KC_F2, n(0x06)),
    (KC_F3, n(0x04)),
    (KC_F4, n(0x0C)),
    (KC_F5, n(0x03)),
    (KC_F6, n(0x0B)),
    (KC_F7, n(0x83)),
    (KC_F8, n(0x0A)),
    (KC_F9, n(0x01)),
    (KC_F10, n(0x09)),
    (KC_F11, n(0x78)),
    (KC_F12, n(0x07)),
    (KC_PSCR, ScancodeMapping::special(0x7C, SpecialKey::PrintScreen)),
    (KC_SCRL, n(0x7E)),
    (KC_PAUSE, ScancodeMapping::special(0x77, SpecialKey::Pause)),
    (KC_INSERT, e(0x70)),
    (KC_HOME, e(0x6C)),
    (KC_PGUP, e(0x7D)),
    (KC_DELETE, e(0x71)),
    (KC_END, e(0x69)),
    (KC_PGDN, e(0x7A)),
    (KC_RIGHT, e(0x74)),
    (KC_LEFT, e(0x6B)),
    (KC_DOWN, e(0x72)),
    (KC_UP, e(0x75)),
    (KC_NUM, n(0x77)),
    (KC_KP_SLASH, e(0x4A)),
    (KC_KP_ASTERISK, n(0x7C)),
    (KC_KP_MINUS, n(0x7B)),
    (KC_KP_PLUS, n(0x79)),
    (KC_KP_ENTER, e(0x5A)),
    (KC_KP_1, n(0x69)),
    (KC_KP_2, n(0x72)),
    (KC_KP_3, n(0x7A)),
    (KC_KP_4, n(0x6B)),
    (KC_KP_5, n(0x73)),
    (KC_KP_6, n(0x74)),
    (KC_KP_7, n(0x6C)),
    (KC_KP_8, n(0x75)),
    (KC_KP_9, n(0x7D)),
    (KC_KP_0, n(0x70)),
    (KC_KP_DOT, n(0x71)),
    (KC_NUBS, n(0x61)),
    (KC_APPLICATION, e(0x2F)),
    (KC_INT1, n(0x51)),
    (KC_INT2, n(0x13)),
    (KC_INT3, n(0x6A)),
    (KC_INT4, n(0x64)),
    (KC_INT5, n(0x67)),
    (KC_INT6, n(0x13)),
    (KC_LNG1, n(0xF2)),
    (KC_LNG2, n(0xF1)),
    (KC_LNG3, n(0x63)),
    (KC_LNG4, n(0x64)),
    (KC_LNG5, n(0x67)),
    (KC_LCTL, n(0x14)),
    (KC_LSFT, n(0x12)),
    (KC_LALT, n(0x11)),
    (KC_LGUI, e(0x1F)),
    (KC_RCTL, e(0x14)),
    (KC_RSFT, n(0x59)),
    (KC_RALT, e(0x11)),
    (KC_RGUI, e(0x27)),
];

/// System, media, browser and F13–F24 keys.
const EXTENDED: &[(u16, ScancodeMapping)] = &[
    (KC_SYSTEM_POWER, e(0x37)),
    (KC_SYSTEM_SLEEP, e(0x3F)),
    (KC_SYSTEM_WAKE, e(0x5E)),
    (KC_AUDIO_MUTE, e(0x23)),
    (KC_AUDIO_VOL_UP, e(0x32)),
    (KC_AUDIO_VOL_DOWN, e(0x21)),
    (KC_MEDIA_NEXT_TRACK, e(0x4D)),
    (KC_MEDIA_PREV_TRACK, e(0x15)),
    (KC_MEDIA_STOP, e(0x3B)),
    (KC_MEDIA_PLAY_PAUSE, e(0x34)),
    (KC_MEDIA_SELECT, e(0x50)),
    (KC_WWW_SEARCH, e(0x10)),
    (KC_WWW_HOME, e(0x3A)),
    (KC_WWW_BACK, e(0x38)),
    (KC_WWW_FORWARD, e(0x30)),
    (KC_WWW_STOP, e(0x28)),
    (KC_WWW_REFRESH, e(0x20)),
    (KC_WWW_FAVORITES, e(0x18)),
    (KC_MAIL, e(0x48)),
    (KC_CALCULATOR, e(0x2B)),
    (KC_MY_COMPUTER, e(0x40)),
    (KC_F13, n(0x08)),
    (KC_F14, n(0x10)),
    (KC_F15, n(0x18)),
    (KC_F16, n(0x20)),
    (KC_F17, n(0x28)),
    (KC_F18, n(0x30)),
    (KC_F19, n(0x38)),
    (KC_F20, n(0x40)),
    (KC_F21, n(0x48)),
    (KC_F22, n(0x50)),
    (KC_F23, n(0x57)),
    (KC_F24, n(0x5F)),
];

/// HID consumer-page usages from the media-key report channel.
const CONSUMER: &[(u16, ScancodeMapping)] = &[
    (0x00E2, e(0x23)), // Mute
    (0x00E9, e(0x32)), // Volume Up
    (0x00EA, e(0x21)), // Volume Down
    (0x00B5, e(0x4D)), // Scan Next Track
    (0x00B6, e(0x15)), // Scan Previous Track
    (0x00B7, e(0x3B)), // Stop
    (0x00CD, e(0x34)), // Play/Pause
    (0x0183, e(0x50)), // Media Select
    (0x0221, e(0x10)), // AC Search
    (0x0223, e(0x3A)), // AC Home
    (0x0224, e(0x38)), // AC Back
    (0x0225, e(0x30)), // AC Forward
    (0x0226, e(0x28)), // AC Stop
    (0x0227, e(0x20)), // AC Refresh
    (0x022A, e(0x18)), // AC Bookmarks
    (0x018A, e(0x48)), // AL Email Reader
    (0x0192, e(0x2B)), // AL Calculator
    (0x0194, e(0x40)), // AL Local Machine Browser
];

pub fn translate_keycode(keycode: u16) -> Option<ScancodeMapping> {
    if let Ok(index) = PRIMARY.binary_search_by_key(&keycode, |&(code, _)| code) {
        return Some(PRIMARY[index].1);
    }
    let found = EXTENDED
        .iter()
        .find(|&&(code, _)| code == keycode)
        .map(|&(_, mapping)| mapping);
    if found.is_none() {
        warn!("PS2: unmapped keycode {keycode:04X}");
    }
    found
}

pub fn translate_consumer_usage(usage: u16) -> Option<ScancodeMapping> {
    let found = CONSUMER
        .iter()
        .find(|&&(code, _)| code == usage)
        .map(|&(_, mapping)| mapping);
    if found.is_none() {
        warn!("PS2: unmapped consumer usage {usage:04X}");
    }
    found
}

/// Reverse lookup for ordinary make codes. Where two keycodes share a code
/// the first one in table order wins.
pub fn keycode_for(scancode: u8, extended: bool) -> Option<u16> {
    PRIMARY
        .iter()
        .chain(EXTENDED)
        .find(|(_, m)| {
            m.special == SpecialKey::Normal && m.scancode == scancode && m.extended == extended
        })
        .map(|&(code, _)| code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierMapping {
    pub bit: Modifiers,
    pub mapping: ScancodeMapping,
}

/// One entry per modifier bit, in bit order.
pub const MODIFIERS: [ModifierMapping; 8] = [
    ModifierMapping {
        bit: Modifiers::LCTRL,
        mapping: n(0x14),
    },
    ModifierMapping {
        bit: Modifiers::LSHIFT,
        mapping: n(0x12),
    },
    ModifierMapping {
        bit: Modifiers::LALT,
        mapping: n(0x11),
    },
    ModifierMapping {
        bit: Modifiers::LGUI,
        mapping: e(0x1F),
    },
    ModifierMapping {
        bit: Modifiers::RCTRL,
        mapping: e(0x14),
    },
    ModifierMapping {
        bit: Modifiers::RSHIFT,
        mapping: n(0x59),
    },
    ModifierMapping {
        bit: Modifiers::RALT,
        mapping: e(0x11),
    },
    ModifierMapping {
        bit: Modifiers::RGUI,
        mapping: e(0x27),
    },
];
