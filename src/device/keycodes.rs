//! Keycodes delivered by the key-event pipeline.
//!
//! Basic keys use their HID keyboard usage IDs; system, media and browser
//! keys sit in the 0xA5–0xBA block the pipeline reserves for them.

macro_rules! def_keycodes {
    ($($name:ident = $value:literal;)*) => {
        $(pub const $name: u16 = $value;)*

        /// Every named keycode with its constant name.
        pub const ALL: &[(&str, u16)] = &[$((stringify!($name), $value),)*];
    };
}

def_keycodes!(
KC_NO = 0x00;
KC_A = 0x04;
KC_B = 0x05;
KC_C = 0x06;
KC_D = 0x07;
KC_E = 0x08;
KC_F = 0x09;
KC_G = 0x0A;
KC_H = 0x0B;
KC_I = 0x0C;
KC_J = 0x0D;
KC_K = 0x0E;
KC_L = 0x0F;
KC_M = 0x10;
KC_N = 0x11;
KC_O = 0x12;
KC_P = 0x13;
KC_Q = 0x14;
KC_R = 0x15;
KC_S = 0x16;
KC_T = 0x17;
KC_U = 0x18;
KC_V = 0x19;
KC_W = 0x1A;
KC_X = 0x1B;
KC_Y = 0x1C;
KC_Z = 0x1D;
KC_1 = 0x1E;
KC_2 = 0x1F;
KC_3 = 0x20;
KC_4 = 0x21;
KC_5 = 0x22;
KC_6 = 0x23;
KC_7 = 0x24;
KC_8 = 0x25;
KC_9 = 0x26;
KC_0 = 0x27;
KC_ENTER = 0x28;
KC_ESCAPE = 0x29;
KC_BSPC = 0x2A;
KC_TAB = 0x2B;
KC_SPACE = 0x2C;
KC_MINUS = 0x2D;
KC_EQUAL = 0x2E;
KC_LBRC = 0x2F;
KC_RBRC = 0x30;
KC_BSLS = 0x31;
KC_NUHS = 0x32;
KC_SCLN = 0x33;
KC_QUOTE = 0x34;
KC_GRAVE = 0x35;
KC_COMMA = 0x36;
KC_DOT = 0x37;
KC_SLASH = 0x38;
KC_CAPS = 0x39;
KC_F1 = 0x3A;
KC_F2 = 0x3B;
KC_F3 = 0x3C;
KC_F4 = 0x3D;
KC_F5 = 0x3E;
KC_F6 = 0x3F;
KC_F7 = 0x40;
KC_F8 = 0x41;
KC_F9 = 0x42;
KC_F10 = 0x43;
KC_F11 = 0x44;
KC_F12 = 0x45;
KC_PSCR = 0x46;
KC_SCRL = 0x47;
KC_PAUSE = 0x48;
KC_INSERT = 0x49;
KC_HOME = 0x4A;
KC_PGUP = 0x4B;
KC_DELETE = 0x4C;
KC_END = 0x4D;
KC_PGDN = 0x4E;
KC_RIGHT = 0x4F;
KC_LEFT = 0x50;
KC_DOWN = 0x51;
KC_UP = 0x52;
KC_NUM = 0x53;
KC_KP_SLASH = 0x54;
KC_KP_ASTERISK = 0x55;
KC_KP_MINUS = 0x56;
KC_KP_PLUS = 0x57;
KC_KP_ENTER = 0x58;
KC_KP_1 = 0x59;
KC_KP_2 = 0x5A;
KC_KP_3 = 0x5B;
KC_KP_4 = 0x5C;
KC_KP_5 = 0x5D;
KC_KP_6 = 0x5E;
KC_KP_7 = 0x5F;
KC_KP_8 = 0x60;
KC_KP_9 = 0x61;
KC_KP_0 = 0x62;
KC_KP_DOT = 0x63;
KC_NUBS = 0x64;
KC_APPLICATION = 0x65;
KC_F13 = 0x68;
KC_F14 = 0x69;
KC_F15 = 0x6A;
KC_F16 = 0x6B;
KC_F17 = 0x6C;
KC_F18 = 0x6D;
KC_F19 = 0x6E;
KC_F20 = 0x6F;
KC_F21 = 0x70;
KC_F22 = 0x71;
KC_F23 = 0x72;
KC_F24 = 0x73;
KC_INT1 = 0x87;
KC_INT2 = 0x88;
KC_INT3 = 0x89;
KC_INT4 = 0x8A;
KC_INT5 = 0x8B;
KC_INT6 = 0x8C;
KC_LNG1 = 0x90;
KC_LNG2 = 0x91;
KC_LNG3 = 0x92;
KC_LNG4 = 0x93;
KC_LNG5 = 0x94;
KC_SYSTEM_POWER = 0xA5;
KC_SYSTEM_SLEEP = 0xA6;
KC_SYSTEM_WAKE = 0xA7;
KC_AUDIO_MUTE = 0xA8;
KC_AUDIO_VOL_UP = 0xA9;
KC_AUDIO_VOL_DOWN = 0xAA;
KC_MEDIA_NEXT_TRACK = 0xAB;
KC_MEDIA_PREV_TRACK = 0xAC;
KC_MEDIA_STOP = 0xAD;
KC_MEDIA_PLAY_PAUSE = 0xAE;
KC_MEDIA_SELECT = 0xAF;
KC_MAIL = 0xB1;
KC_CALCULATOR = 0xB2;
KC_MY_COMPUTER = 0xB3;
KC_WWW_SEARCH = 0xB4;
KC_WWW_HOME = 0xB5;
KC_WWW_BACK = 0xB6;
KC_WWW_FORWARD = 0xB7;
KC_WWW_STOP = 0xB8;
KC_WWW_REFRESH = 0xB9;
KC_WWW_FAVORITES = 0xBA;
KC_LCTL = 0xE0;
KC_LSFT = 0xE1;
KC_LALT = 0xE2;
KC_LGUI = 0xE3;
KC_RCTL = 0xE4;
KC_RSFT = 0xE5;
KC_RALT = 0xE6;
KC_RGUI = 0xE7;
);

pub fn is_modifier(keycode: u16) -> bool {
    (KC_LCTL..=KC_RGUI).contains(&keycode)
}

/// Look up a keycode by its constant name, with or without the `KC_` prefix.
pub fn by_name(name: &str) -> Option<u16> {
    let name = name.trim();
    let bare = name
        .strip_prefix("KC_")
        .or_else(|| name.strip_prefix("kc_"))
        .unwrap_or(name);
    ALL.iter()
        .find(|(n, _)| n[3..].eq_ignore_ascii_case(bare))
        .map(|&(_, code)| code)
}

pub fn name(keycode: u16) -> Option<&'static str> {
    ALL.iter()
        .find(|&&(_, code)| code == keycode)
        .map(|&(n, _)| &n[3..])
}

/// Keycode and whether shift is needed to type `c` on a US layout.
pub fn for_char(c: char) -> Option<(u16, bool)> {
    let plain = |code| Some((code, false));
    let shifted = |code| Some((code, true));
    match c {
        'a'..='z' => plain(KC_A + (c as u16 - 'a' as u16)),
        'A'..='Z' => shifted(KC_A + (c as u16 - 'A' as u16)),
        '1'..='9' => plain(KC_1 + (c as u16 - '1' as u16)),
        '0' => plain(KC_0),
        '!' => shifted(KC_1),
        '@' => shifted(KC_2),
        '#' => shifted(KC_3),
        '$' => shifted(KC_4),
        '%' => shifted(KC_5),
        '^' => shifted(KC_6),
        '&' => shifted(KC_7),
        '*' => shifted(KC_8),
        '(' => shifted(KC_9),
        ')' => shifted(KC_0),
        '\n' => plain(KC_ENTER),
        '\t' => plain(KC_TAB),
        ' ' => plain(KC_SPACE),
        '-' => plain(KC_MINUS),
        '_' => shifted(KC_MINUS),
        '=' => plain(KC_EQUAL),
        '+' => shifted(KC_EQUAL),
        '[' => plain(KC_LBRC),
        '{' => shifted(KC_LBRC),
        ']' => plain(KC_RBRC),
        '}' => shifted(KC_RBRC),
        '\\' => plain(KC_BSLS),
        '|' => shifted(KC_BSLS),
        ';' => plain(KC_SCLN),
        ':' => shifted(KC_SCLN),
        '\'' => plain(KC_QUOTE),
        '"' => shifted(KC_QUOTE),
        '`' => plain(KC_GRAVE),
        '~' => shifted(KC_GRAVE),
        ',' => plain(KC_COMMA),
        '<' => shifted(KC_COMMA),
        '.' => plain(KC_DOT),
        '>' => shifted(KC_DOT),
        '/' => plain(KC_SLASH),
        '?' => shifted(KC_SLASH),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("A"), Some(KC_A));
        assert_eq!(by_name("kc_enter"), Some(KC_ENTER));
        assert_eq!(by_name("KC_PSCR"), Some(KC_PSCR));
        assert_eq!(by_name("pause"), Some(KC_PAUSE));
        assert_eq!(by_name("NOPE"), None);
        assert_eq!(name(KC_RGUI), Some("RGUI"));
    }

    #[test]
    fn test_for_char() {
        assert_eq!(for_char('a'), Some((KC_A, false)));
        assert_eq!(for_char('Z'), Some((KC_Z, true)));
        assert_eq!(for_char('0'), Some((KC_0, false)));
        assert_eq!(for_char('9'), Some((KC_9, false)));
        assert_eq!(for_char('?'), Some((KC_SLASH, true)));
        assert_eq!(for_char('é'), None);
    }

    #[test]
    fn test_modifier_range() {
        assert!(is_modifier(KC_LCTL));
        assert!(is_modifier(KC_RGUI));
        assert!(!is_modifier(KC_CAPS));
    }
}
