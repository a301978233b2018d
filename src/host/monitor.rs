//! Host-side view of the wire: rebuilds frames from a clock/data trace and
//! turns the Set 2 byte stream back into key events.

use std::fmt;

use crate::device::command::{
    KEYBOARD_ID, REPLY_ACK, REPLY_BAT_FAIL, REPLY_BAT_SUCCESS, REPLY_ECHO, REPLY_RESEND,
};
use crate::device::keycodes::{self, KC_PAUSE, KC_PSCR};
use crate::device::scancodes::{
    MAX_SEQUENCE, PAUSE_MAKE, PREFIX_BREAK, PREFIX_E0, PREFIX_E1, PRINT_SCREEN_BREAK,
    PRINT_SCREEN_MAKE, keycode_for,
};

/// Line levels at one instant; a new sample is taken whenever either changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub at_us: u64,
    pub clock: bool,
    pub data: bool,
}

/// One 11-bit frame as the host saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Time of the falling edge that latched the start bit.
    pub at_us: u64,
    pub start: bool,
    pub byte: u8,
    pub parity: bool,
    pub stop: bool,
}

impl Frame {
    pub fn is_valid(&self) -> bool {
        !self.start && self.stop && (self.byte.count_ones() + self.parity as u32) % 2 == 1
    }
}

/// Latches the data line on every falling clock edge, like a host does.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    prev_clock: bool,
    bits: u16,
    count: u8,
    started_at: u64,
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSampler {
    pub fn new() -> Self {
        Self {
            prev_clock: true,
            bits: 0,
            count: 0,
            started_at: 0,
        }
    }

    pub fn push(&mut self, sample: Sample) -> Option<Frame> {
        let falling = self.prev_clock && !sample.clock;
        self.prev_clock = sample.clock;
        if !falling {
            return None;
        }
        if self.count == 0 {
            self.started_at = sample.at_us;
        }
        self.bits |= u16::from(sample.data) << self.count;
        self.count += 1;
        if self.count < 11 {
            return None;
        }

        let bits = self.bits;
        self.bits = 0;
        self.count = 0;
        Some(Frame {
            at_us: self.started_at,
            start: bits & 1 != 0,
            byte: (bits >> 1) as u8,
            parity: bits & (1 << 9) != 0,
            stop: bits & (1 << 10) != 0,
        })
    }

    /// Drop a partially latched frame.
    pub fn reset(&mut self) {
        self.bits = 0;
        self.count = 0;
    }
}

pub fn sample_frames(samples: impl IntoIterator<Item = Sample>) -> Vec<Frame> {
    let mut sampler = FrameSampler::new();
    samples
        .into_iter()
        .filter_map(|sample| sampler.push(sample))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Set2Key {
    pub scancode: u8,
    pub extended: bool,
    pub keycode: Option<u16>,
}

impl Set2Key {
    fn lookup(scancode: u8, extended: bool) -> Self {
        Self {
            scancode,
            extended,
            keycode: keycode_for(scancode, extended),
        }
    }

    fn special(keycode: u16, scancode: u8) -> Self {
        Self {
            scancode,
            extended: false,
            keycode: Some(keycode),
        }
    }
}

impl fmt::Display for Set2Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.keycode.and_then(keycodes::name) {
            Some(name) => write!(f, "{name}"),
            None if self.extended => write!(f, "UNKNOWN_E0_{:02X}", self.scancode),
            None => write!(f, "UNKNOWN_{:02X}", self.scancode),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Set2Event {
    Press(Set2Key),
    Release(Set2Key),
    /// A reply to a host command (ACK, BAT, echo...).
    Reply(u8),
    Identify([u8; 2]),
    /// A prefix sequence that can't be completed.
    Invalid(Vec<u8>),
}

impl fmt::Display for Set2Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Set2Event::Press(key) => write!(f, "KEY DOWN: {key}"),
            Set2Event::Release(key) => write!(f, "KEY UP:   {key}"),
            Set2Event::Reply(byte) => write!(f, "{}", reply_name(*byte)),
            Set2Event::Identify(id) => write!(f, "ID {:02X} {:02X}", id[0], id[1]),
            Set2Event::Invalid(bytes) => write!(f, "INVALID {bytes:02X?}"),
        }
    }
}

fn reply_name(byte: u8) -> &'static str {
    match byte {
        REPLY_ACK => "ACK",
        REPLY_BAT_SUCCESS => "BAT OK",
        REPLY_BAT_FAIL => "BAT FAIL",
        REPLY_ECHO => "ECHO",
        REPLY_RESEND => "RESEND",
        _ => "?",
    }
}

fn is_reply(byte: u8) -> bool {
    matches!(
        byte,
        REPLY_ACK | REPLY_BAT_SUCCESS | REPLY_BAT_FAIL | REPLY_ECHO | REPLY_RESEND
    )
}

/// Groups a keyboard→host byte stream into key events.
///
/// PrintScreen and Pause come out as single events; the fake-shift halves of
/// the PrintScreen macro are never reported on their own.
#[derive(Debug, Clone, Default)]
pub struct Set2Decoder {
    pending: Vec<u8>,
}

impl Set2Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> Option<Set2Event> {
        self.pending.push(byte);
        let event = self.decode()?;
        self.pending.clear();
        Some(event)
    }

    pub fn decode_all(&mut self, bytes: &[u8]) -> Vec<Set2Event> {
        bytes.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Bytes of an unfinished sequence.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    fn decode(&self) -> Option<Set2Event> {
        let seq = self.pending.as_slice();
        if seq.len() > MAX_SEQUENCE {
            return Some(Set2Event::Invalid(seq.to_vec()));
        }

        if seq.first() == Some(&PREFIX_E1) {
            if PAUSE_MAKE.starts_with(seq) {
                return (seq == PAUSE_MAKE)
                    .then(|| Set2Event::Press(Set2Key::special(KC_PAUSE, PAUSE_MAKE[2])));
            }
            return Some(Set2Event::Invalid(seq.to_vec()));
        }
        if seq.len() >= 2 && PRINT_SCREEN_MAKE.starts_with(seq) {
            return (seq == PRINT_SCREEN_MAKE)
                .then(|| Set2Event::Press(Set2Key::special(KC_PSCR, PRINT_SCREEN_MAKE[3])));
        }
        if seq.len() >= 3 && PRINT_SCREEN_BREAK.starts_with(seq) {
            return (seq == PRINT_SCREEN_BREAK)
                .then(|| Set2Event::Release(Set2Key::special(KC_PSCR, PRINT_SCREEN_MAKE[3])));
        }

        match *seq {
            [PREFIX_E0] | [PREFIX_BREAK] | [PREFIX_E0, PREFIX_BREAK] => None,
            [id0] if id0 == KEYBOARD_ID[0] => None,
            [id0, id1] if id0 == KEYBOARD_ID[0] => Some(Set2Event::Identify([id0, id1])),
            [byte] if is_reply(byte) => Some(Set2Event::Reply(byte)),
            [code] => Some(Set2Event::Press(Set2Key::lookup(code, false))),
            [PREFIX_BREAK, code] => Some(Set2Event::Release(Set2Key::lookup(code, false))),
            [PREFIX_E0, PREFIX_BREAK, code] => {
                Some(Set2Event::Release(Set2Key::lookup(code, true)))
            }
            [PREFIX_E0, code] => Some(Set2Event::Press(Set2Key::lookup(code, true))),
            _ => Some(Set2Event::Invalid(seq.to_vec())),
        }
    }
}
