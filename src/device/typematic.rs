//! Single-slot auto-repeat.
//!
//! Only the most recently pressed repeatable key repeats. The controller
//! itself never touches the queue: [`Typematic::due`] says when a repeat is
//! owed and the caller reports back with [`Typematic::record_repeat`] once
//! the make code was actually enqueued.

use tracing::debug;

use super::keycodes::{KC_CAPS, KC_NUM, KC_PAUSE, KC_PSCR, KC_SCRL, is_modifier};
use super::scancodes::ScancodeMapping;

pub const TYPEMATIC_DELAY_MS: u32 = 500;
pub const TYPEMATIC_RATE_MS: u32 = 33;

/// Keys that never auto-repeat.
pub fn is_repeatable(keycode: u16) -> bool {
    !is_modifier(keycode)
        && !matches!(keycode, KC_CAPS | KC_NUM | KC_SCRL | KC_PSCR | KC_PAUSE)
}

#[derive(Debug, Clone)]
pub struct Typematic {
    active: bool,
    keycode: u16,
    mapping: ScancodeMapping,
    press_time: u32,
    last_repeat: u32,
    delay_ms: u32,
    rate_ms: u32,
}

impl Default for Typematic {
    fn default() -> Self {
        Self::new(TYPEMATIC_DELAY_MS, TYPEMATIC_RATE_MS)
    }
}

impl Typematic {
    pub fn new(delay_ms: u32, rate_ms: u32) -> Self {
        Self {
            active: false,
            keycode: 0,
            mapping: ScancodeMapping::default(),
            press_time: 0,
            last_repeat: 0,
            delay_ms,
            rate_ms,
        }
    }

    /// Arm `keycode`, replacing whatever was armed before. Returns false (and
    /// leaves the slot untouched) for keys that never repeat.
    pub fn arm(&mut self, keycode: u16, mapping: ScancodeMapping, now: u32) -> bool {
        if !is_repeatable(keycode) {
            return false;
        }
        if self.active && self.keycode != keycode {
            debug!("PS2: typematic {:02X} replaced by {keycode:02X}", self.keycode);
        }
        self.active = true;
        self.keycode = keycode;
        self.mapping = mapping;
        self.press_time = now;
        self.last_repeat = now;
        true
    }

    /// Disarm, but only if `keycode` is the armed key.
    pub fn stop(&mut self, keycode: u16) {
        if self.active && self.keycode == keycode {
            self.active = false;
        }
    }

    pub fn disable(&mut self) {
        self.active = false;
        self.keycode = 0;
    }

    pub fn is_armed(&self) -> bool {
        self.active
    }

    pub fn armed_keycode(&self) -> Option<u16> {
        self.active.then_some(self.keycode)
    }

    /// The mapping to re-send if a repeat is owed at `now`.
    pub fn due(&self, now: u32) -> Option<ScancodeMapping> {
        if !self.active {
            return None;
        }
        let held = now.wrapping_sub(self.press_time);
        let since_last = now.wrapping_sub(self.last_repeat);
        (held >= self.delay_ms && since_last >= self.rate_ms).then_some(self.mapping)
    }

    pub fn record_repeat(&mut self, now: u32) {
        self.last_repeat = now;
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    pub fn rate_ms(&self) -> u32 {
        self.rate_ms
    }

    pub fn set_rate(&mut self, delay_ms: u32, rate_ms: u32) {
        self.delay_ms = delay_ms;
        self.rate_ms = rate_ms;
    }
}
