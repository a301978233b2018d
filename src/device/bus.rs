//! Bit-level PS/2 transmitter (device → host).
//!
//! One frame is 11 bits clocked by the device: start (0), eight data bits
//! LSB first, odd parity, stop (1). The host samples data on the falling
//! clock edge, so data is always set up a full half-cycle before the clock
//! goes low.

use thiserror::Error;
use tracing::trace;

use super::pins::{Pin, PinError, Timer};

/// Clock half-period in microseconds (10 kHz bit clock).
pub const CLK_HALF_PERIOD_US: u32 = 50;
/// Idle time with both lines released before a start bit.
pub const IDLE_US: u32 = 100;
/// Idle time with both lines released after the stop bit.
pub const SETTLE_US: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Clock,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusFault {
    #[error("{line:?} line fault")]
    Pin {
        line: Line,
        #[source]
        source: PinError,
    },
    /// The clock line read low after we released it: the host is inhibiting
    /// the bus or something else is holding the line.
    #[error("clock line held low")]
    ClockInhibited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTiming {
    pub half_period_us: u32,
    pub idle_us: u32,
    pub settle_us: u32,
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            half_period_us: CLK_HALF_PERIOD_US,
            idle_us: IDLE_US,
            settle_us: SETTLE_US,
        }
    }
}

impl BusTiming {
    /// Data setup, clock low and clock high each last two half-periods.
    pub fn phase_us(&self) -> u32 {
        self.half_period_us * 2
    }

    /// Wall time for one complete frame including idle and settle.
    pub fn frame_us(&self) -> u32 {
        self.idle_us + 11 * 3 * self.phase_us() + self.settle_us
    }
}

pub struct Transmitter<C, D, T> {
    clk: C,
    data: D,
    timer: T,
    timing: BusTiming,
}

impl<C: Pin, D: Pin, T: Timer> Transmitter<C, D, T> {
    pub fn new(clk: C, data: D, timer: T, timing: BusTiming) -> Self {
        Self {
            clk,
            data,
            timer,
            timing,
        }
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timing(&self) -> BusTiming {
        self.timing
    }

    pub fn set_timing(&mut self, timing: BusTiming) {
        self.timing = timing;
    }

    /// Put both lines into input-with-pull-up, the idle bus state.
    pub fn init(&mut self) -> Result<(), BusFault> {
        trace!(
            "PS2: bus init CLK={} DATA={}",
            self.clk.id(),
            self.data.id()
        );
        self.release()
    }

    /// Release both lines to their pull-ups.
    pub fn release(&mut self) -> Result<(), BusFault> {
        self.data_high()?;
        self.clock_high()
    }

    /// Clock one frame out on the wire.
    ///
    /// On any fault the lines are released before the error is returned.
    pub fn send_byte(&mut self, byte: u8) -> Result<(), BusFault> {
        let result = self.frame(byte);
        let released = self.release();
        result.and(released)?;
        self.timer.delay_us(self.timing.settle_us);
        trace!("PS2: sent {byte:02X}");
        Ok(())
    }

    fn frame(&mut self, byte: u8) -> Result<(), BusFault> {
        self.release()?;
        self.timer.delay_us(self.timing.idle_us);
        if !self.clk.read() {
            return Err(BusFault::ClockInhibited);
        }

        // Start bit
        self.clock_bit(false)?;

        let mut parity = true;
        for i in 0..8 {
            let bit = byte & (1 << i) != 0;
            parity ^= bit;
            self.clock_bit(bit)?;
        }

        self.clock_bit(parity)?;

        // Stop bit
        self.clock_bit(true)
    }

    fn clock_bit(&mut self, bit: bool) -> Result<(), BusFault> {
        let phase = self.timing.phase_us();
        if bit {
            self.data_high()?;
        } else {
            self.data_low()?;
        }
        self.timer.delay_us(phase);
        self.clock_low()?;
        self.timer.delay_us(phase);
        self.clock_high()?;
        self.timer.delay_us(phase);
        Ok(())
    }

    fn clock_high(&mut self) -> Result<(), BusFault> {
        self.clk.set_input_pullup().map_err(|source| BusFault::Pin {
            line: Line::Clock,
            source,
        })
    }

    fn clock_low(&mut self) -> Result<(), BusFault> {
        self.clk
            .write_low()
            .and_then(|_| self.clk.set_output())
            .map_err(|source| BusFault::Pin {
                line: Line::Clock,
                source,
            })
    }

    fn data_high(&mut self) -> Result<(), BusFault> {
        self.data.set_input_pullup().map_err(|source| BusFault::Pin {
            line: Line::Data,
            source,
        })
    }

    fn data_low(&mut self) -> Result<(), BusFault> {
        self.data
            .write_low()
            .and_then(|_| self.data.set_output())
            .map_err(|source| BusFault::Pin {
                line: Line::Data,
                source,
            })
    }
}

/// The parity bit that makes the nine bits (data + parity) contain an odd
/// number of ones.
pub fn odd_parity(byte: u8) -> bool {
    byte.count_ones() % 2 == 0
}
