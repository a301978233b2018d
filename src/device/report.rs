//! Reports produced by the key-event pipeline.

use bit_set::BitSet;
use bitflags::bitflags;

/// Boot-protocol key slots.
pub const REPORT_KEYS: usize = 6;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const LCTRL = 1 << 0;
        const LSHIFT = 1 << 1;
        const LALT = 1 << 2;
        const LGUI = 1 << 3;
        const RCTRL = 1 << 4;
        const RSHIFT = 1 << 5;
        const RALT = 1 << 6;
        const RGUI = 1 << 7;
    }
}

impl Modifiers {
    /// Modifier bit for a keycode in the 0xE0–0xE7 range.
    pub fn from_keycode(keycode: u16) -> Option<Self> {
        match keycode {
            0xE0..=0xE7 => Some(Self::from_bits_retain(1 << (keycode - 0xE0))),
            _ => None,
        }
    }
}

/// Snapshot of the keyboard: modifier bits plus up to six pressed keys.
/// A zero slot is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardReport {
    pub mods: Modifiers,
    pub keys: [u8; REPORT_KEYS],
}

impl KeyboardReport {
    pub fn is_empty(&self) -> bool {
        self.mods.is_empty() && self.keys.iter().all(|&k| k == 0)
    }

    pub fn key_set(&self) -> BitSet {
        self.keys
            .iter()
            .filter(|&&k| k != 0)
            .map(|&k| k as usize)
            .collect()
    }

    pub fn pressed(&self) -> impl Iterator<Item = u8> + '_ {
        self.keys.iter().copied().filter(|&k| k != 0)
    }

    pub fn contains(&self, key: u8) -> bool {
        key != 0 && self.keys.contains(&key)
    }

    /// Record a key press. Modifier keycodes set their bit instead of taking a
    /// slot. Returns false when every slot is taken.
    pub fn add_key(&mut self, keycode: u16) -> bool {
        if let Some(bit) = Modifiers::from_keycode(keycode) {
            self.mods |= bit;
            return true;
        }
        let Ok(key) = u8::try_from(keycode) else {
            return false;
        };
        if key == 0 || self.contains(key) {
            return true;
        }
        match self.keys.iter_mut().find(|k| **k == 0) {
            Some(slot) => {
                *slot = key;
                true
            }
            None => false,
        }
    }

    pub fn del_key(&mut self, keycode: u16) {
        if let Some(bit) = Modifiers::from_keycode(keycode) {
            self.mods.remove(bit);
            return;
        }
        for slot in self.keys.iter_mut() {
            if u16::from(*slot) == keycode {
                *slot = 0;
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

bitflags! {
    /// Keyboard LEDs in the PS/2 SET_LEDS bit layout.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct LedState: u8 {
        const SCROLL_LOCK = 0x01;
        const NUM_LOCK = 0x02;
        const CAPS_LOCK = 0x04;
    }
}

bitflags! {
    /// Keyboard LEDs in the HID output-report layout the host pipeline uses.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct HostLeds: u8 {
        const NUM_LOCK = 0x01;
        const CAPS_LOCK = 0x02;
        const SCROLL_LOCK = 0x04;
    }
}

impl LedState {
    pub fn to_host_leds(self) -> HostLeds {
        let mut leds = HostLeds::empty();
        leds.set(HostLeds::NUM_LOCK, self.contains(Self::NUM_LOCK));
        leds.set(HostLeds::CAPS_LOCK, self.contains(Self::CAPS_LOCK));
        leds.set(HostLeds::SCROLL_LOCK, self.contains(Self::SCROLL_LOCK));
        leds
    }
}

/// Consumer-control report; `usage == 0` means nothing held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtraReport {
    pub usage: u16,
}

impl ExtraReport {
    pub fn new(usage: u16) -> Self {
        Self { usage }
    }
}
