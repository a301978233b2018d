//! The PS/2 keyboard device: everything between a key report and the wire.

pub mod bus;
pub mod command;
pub mod keyboard;
pub mod keycodes;
pub mod pins;
pub mod queue;
pub mod report;
pub mod scancodes;
pub mod typematic;

use thiserror::Error;

pub use bus::{BusFault, BusTiming};
pub use keyboard::Ps2Keyboard;

/// Minimum spacing between two bytes on the wire.
pub const INTER_BYTE_DELAY_MS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Ps2Error {
    #[error("send buffer full: need {needed} bytes, {free} free")]
    BufferFull { needed: usize, free: usize },
    #[error("no scancode for keycode {0:04X}")]
    UnmappedKey(u16),
    #[error("keyboard disabled by host")]
    Disabled,
    #[error(transparent)]
    Bus(#[from] BusFault),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ps2Config {
    pub timing: BusTiming,
    pub inter_byte_delay_ms: u32,
    pub typematic_delay_ms: u32,
    pub typematic_rate_ms: u32,
}

impl Default for Ps2Config {
    fn default() -> Self {
        Self {
            timing: BusTiming::default(),
            inter_byte_delay_ms: INTER_BYTE_DELAY_MS,
            typematic_delay_ms: typematic::TYPEMATIC_DELAY_MS,
            typematic_rate_ms: typematic::TYPEMATIC_RATE_MS,
        }
    }
}
