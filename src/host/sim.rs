//! In-memory stand-ins for the hardware: open-drain PS/2 lines, a virtual
//! microsecond clock, the mode switch and a USB backend that just records.
//!
//! Everything is single-threaded and shared through `Rc`, so a test can hold
//! one handle while the device owns another.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::device::bus::Line;
use crate::device::pins::{Pin, PinError, Timer};
use crate::device::report::{ExtraReport, KeyboardReport};
use crate::host::monitor::{Frame, Sample, sample_frames};
use crate::mode::HostDriver;

pub const SIM_CLOCK_PIN: u8 = 2;
pub const SIM_DATA_PIN: u8 = 3;
pub const SIM_MODE_PIN: u8 = 4;

/// Virtual time. Delays return immediately after moving the clock forward.
#[derive(Debug, Clone, Default)]
pub struct SimClock(Rc<Cell<u64>>);

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_us(&self) -> u64 {
        self.0.get()
    }

    pub fn advance_us(&self, us: u64) {
        self.0.set(self.0.get() + us);
    }

    pub fn advance_ms(&self, ms: u32) {
        self.advance_us(u64::from(ms) * 1000);
    }

    pub fn set_ms(&self, ms: u64) {
        self.0.set(ms * 1000);
    }
}

impl Timer for SimClock {
    fn delay_us(&self, us: u32) {
        self.advance_us(u64::from(us));
    }

    fn delay_ms(&self, ms: u32) {
        self.advance_ms(ms);
    }

    fn now_ms(&self) -> u32 {
        (self.now_us() / 1000) as u32
    }
}

#[derive(Debug, Default)]
struct LineState {
    output: bool,
    latched_low: bool,
    held_by_host: bool,
    fail_output: bool,
}

impl LineState {
    fn level(&self) -> bool {
        !(self.output && self.latched_low) && !self.held_by_host
    }
}

#[derive(Debug)]
struct Wire {
    clock: LineState,
    data: LineState,
    trace: Vec<Sample>,
}

impl Wire {
    fn line(&mut self, line: Line) -> &mut LineState {
        match line {
            Line::Clock => &mut self.clock,
            Line::Data => &mut self.data,
        }
    }

    fn current(&self, at_us: u64) -> Sample {
        Sample {
            at_us,
            clock: self.clock.level(),
            data: self.data.level(),
        }
    }

    fn record(&mut self, at_us: u64) {
        let sample = self.current(at_us);
        let changed = self
            .trace
            .last()
            .is_none_or(|last| last.clock != sample.clock || last.data != sample.data);
        if changed {
            self.trace.push(sample);
        }
    }
}

/// Both PS/2 lines plus the host's view of them.
#[derive(Debug, Clone)]
pub struct SimBus {
    wire: Rc<RefCell<Wire>>,
    clock: SimClock,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    pub fn new() -> Self {
        Self::with_clock(SimClock::new())
    }

    pub fn with_clock(clock: SimClock) -> Self {
        let mut wire = Wire {
            clock: LineState::default(),
            data: LineState::default(),
            trace: Vec::new(),
        };
        wire.record(clock.now_us());
        Self {
            wire: Rc::new(RefCell::new(wire)),
            clock,
        }
    }

    pub fn clock(&self) -> SimClock {
        self.clock.clone()
    }

    pub fn clock_pin(&self) -> SimPin {
        self.pin(Line::Clock, SIM_CLOCK_PIN)
    }

    pub fn data_pin(&self) -> SimPin {
        self.pin(Line::Data, SIM_DATA_PIN)
    }

    fn pin(&self, line: Line, id: u8) -> SimPin {
        SimPin {
            line,
            id,
            wire: self.wire.clone(),
            clock: self.clock.clone(),
        }
    }

    pub fn clock_level(&self) -> bool {
        self.wire.borrow().clock.level()
    }

    pub fn data_level(&self) -> bool {
        self.wire.borrow().data.level()
    }

    /// Host pulls the clock line low (inhibit).
    pub fn host_hold_clock(&self, held: bool) {
        let mut wire = self.wire.borrow_mut();
        wire.clock.held_by_host = held;
        wire.record(self.clock.now_us());
    }

    /// Make `set_output` on a line report an error.
    pub fn fail_output(&self, line: Line, fail: bool) {
        self.wire.borrow_mut().line(line).fail_output = fail;
    }

    pub fn trace(&self) -> Vec<Sample> {
        self.wire.borrow().trace.clone()
    }

    /// Clock transitions as `(time, new level)`.
    pub fn clock_edges(&self) -> Vec<(u64, bool)> {
        self.wire
            .borrow()
            .trace
            .windows(2)
            .filter(|pair| pair[0].clock != pair[1].clock)
            .map(|pair| (pair[1].at_us, pair[1].clock))
            .collect()
    }

    pub fn frames(&self) -> Vec<Frame> {
        sample_frames(self.trace())
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.frames().iter().map(|f| f.byte).collect()
    }

    /// Forget everything recorded so far.
    pub fn clear_trace(&self) {
        let now = self.clock.now_us();
        let mut wire = self.wire.borrow_mut();
        wire.trace.clear();
        wire.record(now);
    }

    /// Decoded bytes since the last call.
    pub fn take_bytes(&self) -> Vec<u8> {
        let bytes = self.bytes();
        self.clear_trace();
        bytes
    }
}

#[derive(Debug, Clone)]
pub struct SimPin {
    line: Line,
    id: u8,
    wire: Rc<RefCell<Wire>>,
    clock: SimClock,
}

impl SimPin {
    fn update(&mut self, f: impl FnOnce(&mut LineState)) {
        let mut wire = self.wire.borrow_mut();
        f(wire.line(self.line));
        wire.record(self.clock.now_us());
    }
}

impl Pin for SimPin {
    fn id(&self) -> u8 {
        self.id
    }

    fn set_input_pullup(&mut self) -> Result<(), PinError> {
        self.update(|state| state.output = false);
        Ok(())
    }

    fn set_output(&mut self) -> Result<(), PinError> {
        if self.wire.borrow_mut().line(self.line).fail_output {
            return Err(PinError {
                pin: self.id,
                reason: "simulated output fault",
            });
        }
        self.update(|state| state.output = true);
        Ok(())
    }

    fn write_low(&mut self) -> Result<(), PinError> {
        self.update(|state| state.latched_low = true);
        Ok(())
    }

    fn read(&self) -> bool {
        let wire = self.wire.borrow();
        match self.line {
            Line::Clock => wire.clock.level(),
            Line::Data => wire.data.level(),
        }
    }
}

/// The physical USB/PS2 selector switch. High selects USB.
#[derive(Debug, Clone)]
pub struct SimSwitch(Rc<Cell<bool>>);

impl SimSwitch {
    pub fn new(level: bool) -> Self {
        Self(Rc::new(Cell::new(level)))
    }

    pub fn set(&self, level: bool) {
        self.0.set(level);
    }
}

impl Pin for SimSwitch {
    fn id(&self) -> u8 {
        SIM_MODE_PIN
    }

    fn set_input_pullup(&mut self) -> Result<(), PinError> {
        Ok(())
    }

    fn set_output(&mut self) -> Result<(), PinError> {
        Err(PinError {
            pin: SIM_MODE_PIN,
            reason: "mode switch is input only",
        })
    }

    fn write_low(&mut self) -> Result<(), PinError> {
        Ok(())
    }

    fn read(&self) -> bool {
        self.0.get()
    }
}

/// USB backend that keeps every report it was handed.
#[derive(Debug, Clone, Default)]
pub struct RecordingUsb {
    pub reports: Vec<KeyboardReport>,
    pub extras: Vec<ExtraReport>,
    /// LED state the USB host last set, in HID layout.
    pub leds: u8,
}

impl HostDriver for RecordingUsb {
    fn keyboard_leds(&mut self) -> u8 {
        self.leds
    }

    fn send_keyboard(&mut self, report: &KeyboardReport) {
        self.reports.push(*report);
    }

    fn send_extra(&mut self, report: &ExtraReport) {
        self.extras.push(*report);
    }
}
