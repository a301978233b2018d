//! Platform seams: GPIO lines and the delay/clock primitives.
//!
//! PS/2 lines are open-drain. A line is "high" when the device releases it
//! (input with pull-up) and "low" when the device actively drives it low
//! (write-low, then switch to output).

use thiserror::Error;

/// Failure reported by the platform for a pin operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pin {pin}: {reason}")]
pub struct PinError {
    pub pin: u8,
    pub reason: &'static str,
}

/// A single digital line.
pub trait Pin {
    /// Pin number, used only for diagnostics.
    fn id(&self) -> u8;

    /// Release the line: input with pull-up enabled.
    fn set_input_pullup(&mut self) -> Result<(), PinError>;

    /// Switch the pin to push/pull output at the currently latched level.
    fn set_output(&mut self) -> Result<(), PinError>;

    /// Latch a low level on the output register.
    fn write_low(&mut self) -> Result<(), PinError>;

    /// Sample the level on the line.
    fn read(&self) -> bool;
}

/// Blocking delays and a monotonic millisecond clock.
///
/// `now_ms` wraps like a 32-bit hardware timer; callers compare with
/// `wrapping_sub`.
pub trait Timer {
    fn delay_us(&self, us: u32);
    fn delay_ms(&self, ms: u32);
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `since`, tolerant of counter wrap.
    fn elapsed_ms(&self, since: u32) -> u32 {
        self.now_ms().wrapping_sub(since)
    }
}
