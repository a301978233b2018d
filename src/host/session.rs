//! Runs key scripts against the whole device on a simulated bus.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::device::keycodes::{self, KC_LSFT};
use crate::device::pins::{PinError, Timer};
use crate::device::report::{ExtraReport, KeyboardReport};
use crate::device::{Ps2Config, Ps2Error, Ps2Keyboard};
use crate::host::monitor::{Set2Decoder, Set2Event};
use crate::host::script::Step;
use crate::host::sim::{RecordingUsb, SimBus, SimClock, SimPin, SimSwitch};
use crate::mode::{ArbiterConfig, HostSlot, Mode, ModeArbiter};

pub type SimArbiter = ModeArbiter<RecordingUsb, SimSwitch, SimPin, SimPin, SimClock>;

/// How long `tap` and `type` hold each key; well under the typematic delay.
pub const TAP_HOLD_MS: u32 = 30;
/// Upper bound on ticks spent waiting for the PS/2 queue to drain.
const MAX_DRAIN_MS: u32 = 1000;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Ps2(#[from] Ps2Error),
    #[error(transparent)]
    Pin(#[from] PinError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Ps2(Set2Event),
    Usb(KeyboardReport),
    UsbExtra(ExtraReport),
    Mode(Mode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub at_ms: u32,
    pub output: Output,
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8} ms  ", self.at_ms)?;
        match &self.output {
            Output::Ps2(event) => write!(f, "PS2   {event}"),
            Output::Usb(report) => {
                write!(f, "USB   mods={:02X} keys=", report.mods.bits())?;
                let names: Vec<_> = report
                    .pressed()
                    .map(|k| keycodes::name(k.into()).unwrap_or("?"))
                    .collect();
                write!(f, "[{}]", names.join(" "))
            }
            Output::UsbExtra(report) => write!(f, "USB   consumer={:04X}", report.usage),
            Output::Mode(mode) => write!(f, "MODE  -> {mode:?}"),
        }
    }
}

/// The key-event pipeline feeding a mode arbiter, with a decoding host on
/// the far end of the PS/2 bus.
pub struct Session {
    bus: SimBus,
    switch: SimSwitch,
    arbiter: SimArbiter,
    report: KeyboardReport,
    decoder: Set2Decoder,
    usb_seen: (usize, usize),
    events: Vec<SessionEvent>,
}

impl Session {
    pub fn new(ps2_config: Ps2Config, arbiter_config: ArbiterConfig) -> Result<Self, SessionError> {
        let bus = SimBus::new();
        let switch = SimSwitch::new(true);
        let ps2 = Ps2Keyboard::new(bus.clock_pin(), bus.data_pin(), bus.clock(), ps2_config);
        let mut arbiter = ModeArbiter::new(
            RecordingUsb::default(),
            ps2,
            switch.clone(),
            HostSlot::new(),
            arbiter_config,
        );
        arbiter.init()?;
        Ok(Self {
            bus,
            switch,
            arbiter,
            report: KeyboardReport::default(),
            decoder: Set2Decoder::new(),
            usb_seen: (0, 0),
            events: vec![],
        })
    }

    pub fn arbiter(&self) -> &SimArbiter {
        &self.arbiter
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn now_ms(&self) -> u32 {
        self.arbiter.timer().now_ms()
    }

    pub fn run(&mut self, steps: &[Step]) -> Result<(), SessionError> {
        for step in steps {
            self.step(step)?;
        }
        Ok(())
    }

    pub fn step(&mut self, step: &Step) -> Result<(), SessionError> {
        debug!("SIM: {step:?}");
        match step {
            Step::Down(key) => self.press(*key)?,
            Step::Up(key) => self.release(*key)?,
            Step::Tap(key) => self.tap(*key)?,
            Step::Media(usage) => {
                self.arbiter.process_extra(&ExtraReport::new(*usage));
                self.drain()?;
            }
            Step::Wait(ms) => self.tick_for(*ms)?,
            Step::Command(bytes) => {
                for &byte in bytes {
                    self.arbiter.process_host_command(byte)?;
                    self.collect();
                }
            }
            Step::Mode(mode) => {
                self.switch.set(*mode == Mode::Usb);
                let budget = self.arbiter.config().debounce_ms + 2;
                for _ in 0..budget {
                    if self.arbiter.mode() == *mode {
                        break;
                    }
                    self.tick()?;
                }
            }
            Step::Type(text) => {
                for ch in text.chars() {
                    match keycodes::for_char(ch) {
                        Some((key, true)) => {
                            self.press(KC_LSFT)?;
                            self.tap(key)?;
                            self.release(KC_LSFT)?;
                        }
                        Some((key, false)) => self.tap(key)?,
                        None => warn!("SIM: no key for {ch:?}"),
                    }
                }
            }
        }
        Ok(())
    }

    fn press(&mut self, key: u16) -> Result<(), SessionError> {
        if !self.report.add_key(key) {
            warn!("SIM: rollover, {key:02X} dropped");
        }
        self.arbiter.process_report(&self.report);
        self.drain()
    }

    fn release(&mut self, key: u16) -> Result<(), SessionError> {
        self.report.del_key(key);
        self.arbiter.process_report(&self.report);
        self.drain()
    }

    fn tap(&mut self, key: u16) -> Result<(), SessionError> {
        self.press(key)?;
        self.tick_for(TAP_HOLD_MS)?;
        self.release(key)
    }

    /// Tick until every queued PS/2 byte is on the wire.
    fn drain(&mut self) -> Result<(), SessionError> {
        for _ in 0..MAX_DRAIN_MS {
            if self.arbiter.ps2().queue().is_empty() {
                break;
            }
            self.tick()?;
        }
        self.collect();
        Ok(())
    }

    fn tick_for(&mut self, ms: u32) -> Result<(), SessionError> {
        for _ in 0..ms {
            self.tick()?;
        }
        Ok(())
    }

    fn tick(&mut self) -> Result<(), SessionError> {
        if let Some(mode) = self.arbiter.housekeeping_task()? {
            self.push(Output::Mode(mode));
            // Keys held across a switch were released by the handover
            self.report.clear();
        }
        self.bus.clock().advance_ms(1);
        self.collect();
        Ok(())
    }

    fn push(&mut self, output: Output) {
        let at_ms = self.now_ms();
        self.events.push(SessionEvent { at_ms, output });
    }

    fn collect(&mut self) {
        for byte in self.bus.take_bytes() {
            if let Some(event) = self.decoder.push(byte) {
                self.push(Output::Ps2(event));
            }
        }

        let usb = self.arbiter.usb();
        let reports: Vec<_> = usb.reports[self.usb_seen.0..].to_vec();
        let extras: Vec<_> = usb.extras[self.usb_seen.1..].to_vec();
        self.usb_seen = (usb.reports.len(), usb.extras.len());
        for report in reports {
            self.push(Output::Usb(report));
        }
        for extra in extras {
            self.push(Output::UsbExtra(extra));
        }
    }
}
