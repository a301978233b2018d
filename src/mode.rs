//! Live switching between the USB and PS/2 outputs.
//!
//! Both backends exist for the whole session. A shared [`HostSlot`] names
//! the one the key-event pipeline currently talks to; the arbiter hands that
//! backend out as a `&mut dyn HostDriver` and never drives both at once.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, error, info, trace, warn};

use crate::device::pins::{Pin, PinError, Timer};
use crate::device::report::{ExtraReport, KeyboardReport};
use crate::device::{Ps2Error, Ps2Keyboard};

/// The reporting interface every output backend implements.
pub trait HostDriver {
    /// LED state in HID layout (num = 1, caps = 2, scroll = 4).
    fn keyboard_leds(&mut self) -> u8;
    fn send_keyboard(&mut self, report: &KeyboardReport);
    fn send_extra(&mut self, report: &ExtraReport);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverId {
    Usb,
    Ps2,
}

/// Which backend the key-event pipeline is wired to. Cloned handles share
/// the same slot.
#[derive(Debug, Clone, Default)]
pub struct HostSlot(Rc<Cell<Option<DriverId>>>);

impl HostSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<DriverId> {
        self.0.get()
    }

    pub fn set(&self, driver: Option<DriverId>) {
        self.0.set(driver);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Usb,
    Ps2,
}

impl Mode {
    /// The selector reads high for USB and low for PS/2.
    pub fn from_pin(level: bool) -> Self {
        if level { Mode::Usb } else { Mode::Ps2 }
    }
}

pub const MODE_DEBOUNCE_MS: u32 = 50;
pub const MODE_SETTLE_MS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbiterConfig {
    /// How long the selector must read the other mode before switching.
    pub debounce_ms: u32,
    /// Pause around driver handovers.
    pub settle_ms: u32,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: MODE_DEBOUNCE_MS,
            settle_ms: MODE_SETTLE_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    pub current: Mode,
    /// When the selector first disagreed with `current`.
    pub pending_since: Option<u32>,
}

pub struct ModeArbiter<U, M, C, D, T> {
    usb: U,
    ps2: Ps2Keyboard<C, D, T>,
    mode_pin: M,
    slot: HostSlot,
    saved_usb: Option<DriverId>,
    state: ModeState,
    config: ArbiterConfig,
}

impl<U, M, C, D, T> ModeArbiter<U, M, C, D, T>
where
    U: HostDriver,
    M: Pin,
    C: Pin,
    D: Pin,
    T: Timer,
{
    pub fn new(
        usb: U,
        ps2: Ps2Keyboard<C, D, T>,
        mode_pin: M,
        slot: HostSlot,
        config: ArbiterConfig,
    ) -> Self {
        Self {
            usb,
            ps2,
            mode_pin,
            slot,
            saved_usb: None,
            state: ModeState {
                current: Mode::Usb,
                pending_since: None,
            },
            config,
        }
    }

    /// Configure the selector input. The session always starts in USB mode;
    /// a selector already in the PS/2 position switches after the debounce
    /// window like any other change.
    pub fn init(&mut self) -> Result<(), PinError> {
        self.mode_pin.set_input_pullup()?;
        if self.slot.get().is_none() {
            self.slot.set(Some(DriverId::Usb));
        }
        info!("MODE: starting in {:?} mode", self.state.current);
        Ok(())
    }

    /// One scheduler tick: debounce the selector, then run PS/2 work.
    ///
    /// Returns the new mode when a switch was committed during this tick.
    pub fn housekeeping_task(&mut self) -> Result<Option<Mode>, Ps2Error> {
        let switched = self.debounce();
        if self.state.current == Mode::Ps2 {
            self.ps2.periodic_task()?;
        }
        Ok(switched)
    }

    fn debounce(&mut self) -> Option<Mode> {
        let reading = Mode::from_pin(self.mode_pin.read());
        let now = self.ps2.timer().now_ms();
        if reading == self.state.current {
            if self.state.pending_since.take().is_some() {
                trace!("MODE: selector bounced back to {reading:?}");
            }
            return None;
        }

        let since = *self.state.pending_since.get_or_insert(now);
        if now.wrapping_sub(since) < self.config.debounce_ms {
            return None;
        }

        self.state.pending_since = None;
        self.state.current = reading;
        info!("MODE: switching to {reading:?}");
        match reading {
            Mode::Ps2 => self.enter_ps2(),
            Mode::Usb => self.enter_usb(),
        }
        Some(reading)
    }

    fn enter_ps2(&mut self) {
        if self.saved_usb.is_none() {
            self.saved_usb = self.slot.get().filter(|&id| id != DriverId::Ps2);
        }

        // Release everything on the USB side while it's still installed
        self.clear_keyboard();
        self.ps2.timer().delay_ms(self.config.settle_ms);

        if let Err(err) = self.ps2.init() {
            warn!("MODE: PS/2 bus init failed: {err}");
        }
        self.slot.set(Some(DriverId::Ps2));
        info!("MODE: PS/2 driver activated");
    }

    fn enter_usb(&mut self) {
        self.ps2.typematic_disable();
        self.ps2.discard_pending();

        match self.saved_usb {
            Some(id) => {
                self.slot.set(Some(id));
                info!("MODE: USB driver restored");
            }
            None => error!("MODE: no USB driver was captured, nothing to restore"),
        }

        self.ps2.timer().delay_ms(self.config.settle_ms);
        self.clear_keyboard();
        self.ps2.timer().delay_ms(self.config.settle_ms);
    }

    /// Send an all-released report through the installed driver.
    pub fn clear_keyboard(&mut self) {
        if let Some(driver) = self.active() {
            driver.send_keyboard(&KeyboardReport::default());
            driver.send_extra(&ExtraReport::default());
        }
    }

    /// In PS/2 mode the PS/2 driver must own the slot; put it back if
    /// anything else was installed.
    fn ensure_driver(&mut self) {
        if self.state.current == Mode::Ps2 && self.slot.get() != Some(DriverId::Ps2) {
            warn!(
                "MODE: {:?} driver installed in PS/2 mode, reinstalling PS/2",
                self.slot.get()
            );
            self.slot.set(Some(DriverId::Ps2));
        }
    }

    pub fn active(&mut self) -> Option<&mut dyn HostDriver> {
        match self.slot.get()? {
            DriverId::Usb => Some(&mut self.usb as &mut dyn HostDriver),
            DriverId::Ps2 => Some(&mut self.ps2 as &mut dyn HostDriver),
        }
    }

    pub fn process_report(&mut self, report: &KeyboardReport) {
        self.ensure_driver();
        debug!("MODE: {:?} report {report:?}", self.state.current);
        match self.active() {
            Some(driver) => driver.send_keyboard(report),
            None => warn!("MODE: no host driver, report dropped"),
        }
    }

    pub fn process_extra(&mut self, report: &ExtraReport) {
        self.ensure_driver();
        match self.active() {
            Some(driver) => driver.send_extra(report),
            None => warn!("MODE: no host driver, report dropped"),
        }
    }

    pub fn keyboard_leds(&mut self) -> u8 {
        self.ensure_driver();
        self.active().map_or(0, |driver| driver.keyboard_leds())
    }

    /// A byte from the PS/2 host. Ignored unless PS/2 is the active mode.
    pub fn process_host_command(&mut self, byte: u8) -> Result<(), Ps2Error> {
        if self.state.current != Mode::Ps2 {
            trace!("MODE: host byte {byte:02X} ignored in USB mode");
            return Ok(());
        }
        self.ps2.process_host_command(byte)
    }

    pub fn mode(&self) -> Mode {
        self.state.current
    }

    pub fn state(&self) -> ModeState {
        self.state
    }

    pub fn config(&self) -> ArbiterConfig {
        self.config
    }

    pub fn host_slot(&self) -> HostSlot {
        self.slot.clone()
    }

    pub fn usb(&self) -> &U {
        &self.usb
    }

    pub fn ps2(&self) -> &Ps2Keyboard<C, D, T> {
        &self.ps2
    }

    pub fn ps2_mut(&mut self) -> &mut Ps2Keyboard<C, D, T> {
        &mut self.ps2
    }

    pub fn timer(&self) -> &T {
        self.ps2.timer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Ps2Config;
    use crate::device::keycodes::*;
    use crate::device::report::LedState;
    use crate::host::sim::{RecordingUsb, SimBus, SimClock, SimPin, SimSwitch};
    use hex_literal::hex;

    type TestArbiter = ModeArbiter<RecordingUsb, SimSwitch, SimPin, SimPin, SimClock>;

    fn arbiter() -> (SimBus, SimSwitch, TestArbiter) {
        let bus = SimBus::new();
        let switch = SimSwitch::new(true);
        let ps2 = Ps2Keyboard::new(
            bus.clock_pin(),
            bus.data_pin(),
            bus.clock(),
            Ps2Config::default(),
        );
        let mut arb = ModeArbiter::new(
            RecordingUsb::default(),
            ps2,
            switch.clone(),
            HostSlot::new(),
            ArbiterConfig::default(),
        );
        arb.init().unwrap();
        (bus, switch, arb)
    }

    /// Tick once per millisecond; returns every committed switch.
    fn run(bus: &SimBus, arb: &mut TestArbiter, ms: u32) -> Vec<Mode> {
        let mut switches = vec![];
        for _ in 0..ms {
            switches.extend(arb.housekeeping_task().unwrap());
            bus.clock().advance_ms(1);
        }
        switches
    }

    fn to_ps2(bus: &SimBus, switch: &SimSwitch, arb: &mut TestArbiter) {
        switch.set(false);
        assert_eq!(run(bus, arb, 60), vec![Mode::Ps2]);
        bus.clear_trace();
    }

    fn key(keycode: u16) -> KeyboardReport {
        let mut report = KeyboardReport::default();
        report.add_key(keycode);
        report
    }

    #[test]
    fn test_starts_in_usb() {
        let (bus, _switch, mut arb) = arbiter();
        assert_eq!(arb.mode(), Mode::Usb);
        assert_eq!(arb.host_slot().get(), Some(DriverId::Usb));
        arb.process_report(&key(KC_A));
        assert_eq!(arb.usb().reports, vec![key(KC_A)]);
        assert!(run(&bus, &mut arb, 100).is_empty());
        assert!(bus.bytes().is_empty());
    }

    #[test]
    fn test_flicker_does_not_switch() {
        let (bus, switch, mut arb) = arbiter();
        for _ in 0..5 {
            switch.set(false);
            assert!(run(&bus, &mut arb, 49).is_empty());
            assert!(arb.state().pending_since.is_some());
            switch.set(true);
            assert!(run(&bus, &mut arb, 1).is_empty());
            assert_eq!(arb.state().pending_since, None);
        }
        assert_eq!(arb.mode(), Mode::Usb);
        assert!(arb.usb().reports.is_empty());
    }

    #[test]
    fn test_stable_reading_switches_once() {
        let (bus, switch, mut arb) = arbiter();
        arb.process_report(&key(KC_A));
        switch.set(false);
        let start = bus.clock().now_us();
        let switches = run(&bus, &mut arb, 200);
        assert_eq!(switches, vec![Mode::Ps2]);
        assert_eq!(arb.mode(), Mode::Ps2);
        assert_eq!(arb.host_slot().get(), Some(DriverId::Ps2));
        // USB saw the key, then the all-released report
        assert_eq!(arb.usb().reports, vec![key(KC_A), KeyboardReport::default()]);
        assert_eq!(arb.usb().extras, vec![ExtraReport::default()]);
        // 200 ticks plus the handover settle
        assert_eq!(bus.clock().now_us() - start, 220_000);
        assert!(bus.bytes().is_empty());
    }

    #[test]
    fn test_switch_commits_at_debounce_window() {
        let (bus, switch, mut arb) = arbiter();
        switch.set(false);
        assert!(run(&bus, &mut arb, 50).is_empty());
        assert_eq!(arb.housekeeping_task().unwrap(), Some(Mode::Ps2));
    }

    #[test]
    fn test_ps2_mode_emits_scancodes() {
        let (bus, switch, mut arb) = arbiter();
        to_ps2(&bus, &switch, &mut arb);
        arb.process_report(&key(KC_A));
        arb.process_report(&KeyboardReport::default());
        run(&bus, &mut arb, 20);
        assert_eq!(bus.take_bytes(), hex!("1C F0 1C"));
        assert_eq!(arb.usb().reports.len(), 1);
    }

    #[test]
    fn test_back_to_usb() {
        let (bus, switch, mut arb) = arbiter();
        to_ps2(&bus, &switch, &mut arb);
        arb.process_report(&key(KC_K));

        switch.set(true);
        let start = bus.clock().now_us();
        assert!(run(&bus, &mut arb, 1).is_empty());
        assert_eq!(bus.take_bytes(), hex!("42"));

        let mut held = key(KC_K);
        held.add_key(KC_J);
        arb.process_report(&held);
        assert_eq!(arb.ps2().typematic().armed_keycode(), Some(KC_J));
        assert!(!arb.ps2().queue().is_empty());

        bus.clock().advance_ms(50);
        assert_eq!(arb.housekeeping_task().unwrap(), Some(Mode::Usb));
        assert!(bus.clock().now_us() - start >= 90_000);

        assert!(!arb.ps2().typematic().is_armed());
        assert!(arb.ps2().queue().is_empty());
        assert_eq!(arb.host_slot().get(), Some(DriverId::Usb));
        assert_eq!(arb.usb().reports.last(), Some(&KeyboardReport::default()));
        run(&bus, &mut arb, 600);
        assert!(bus.bytes().is_empty());
    }

    #[test]
    fn test_reinstalls_ps2_driver() {
        let (bus, switch, mut arb) = arbiter();
        to_ps2(&bus, &switch, &mut arb);
        let usb_reports = arb.usb().reports.len();
        arb.host_slot().set(Some(DriverId::Usb));
        arb.process_report(&key(KC_B));
        assert_eq!(arb.host_slot().get(), Some(DriverId::Ps2));
        assert_eq!(arb.usb().reports.len(), usb_reports);
        run(&bus, &mut arb, 10);
        assert_eq!(bus.take_bytes(), hex!("32"));
    }

    #[test]
    fn test_missing_usb_driver() {
        let (bus, switch, mut arb) = arbiter();
        arb.host_slot().set(None);
        to_ps2(&bus, &switch, &mut arb);
        switch.set(true);
        assert_eq!(run(&bus, &mut arb, 60), vec![Mode::Usb]);
        // Nothing to restore: the PS/2 driver stays in the slot
        assert_eq!(arb.host_slot().get(), Some(DriverId::Ps2));
    }

    #[test]
    fn test_leds_follow_active_driver() {
        let (bus, switch, mut arb) = arbiter();
        assert_eq!(arb.keyboard_leds(), 0);
        to_ps2(&bus, &switch, &mut arb);
        arb.process_host_command(0xED).unwrap();
        arb.process_host_command(0x01).unwrap();
        assert_eq!(arb.keyboard_leds(), 0x04);
        assert_eq!(bus.take_bytes(), hex!("FA FA"));
    }

    #[test]
    fn test_led_query_reinstalls_ps2_driver() {
        let (bus, switch, mut arb) = arbiter();
        to_ps2(&bus, &switch, &mut arb);
        arb.process_host_command(0xED).unwrap();
        arb.process_host_command(0x02).unwrap();
        arb.host_slot().set(Some(DriverId::Usb));
        // PS/2 num lock, reported in HID layout
        assert_eq!(arb.keyboard_leds(), 0x01);
        assert_eq!(arb.host_slot().get(), Some(DriverId::Ps2));
    }

    #[test]
    fn test_reentering_ps2_restores_defaults() {
        let (bus, switch, mut arb) = arbiter();
        to_ps2(&bus, &switch, &mut arb);
        for byte in hex!("ED 04 F5") {
            arb.process_host_command(byte).unwrap();
        }
        assert!(!arb.ps2().is_enabled());
        assert_eq!(arb.ps2().led_state(), LedState::CAPS_LOCK);

        switch.set(true);
        assert_eq!(run(&bus, &mut arb, 60), vec![Mode::Usb]);
        to_ps2(&bus, &switch, &mut arb);

        assert!(arb.ps2().is_enabled());
        assert_eq!(arb.ps2().led_state(), LedState::empty());
        arb.process_report(&key(KC_A));
        run(&bus, &mut arb, 10);
        assert_eq!(bus.take_bytes(), hex!("1C"));
    }

    #[test]
    fn test_host_commands_ignored_in_usb_mode() {
        let (bus, _switch, mut arb) = arbiter();
        arb.process_host_command(0xFF).unwrap();
        assert!(bus.bytes().is_empty());
    }

    #[test]
    fn test_media_keys_in_ps2_mode() {
        let (bus, switch, mut arb) = arbiter();
        to_ps2(&bus, &switch, &mut arb);
        arb.process_extra(&ExtraReport::new(0x00E2));
        arb.process_extra(&ExtraReport::default());
        run(&bus, &mut arb, 30);
        assert_eq!(bus.take_bytes(), hex!("E0 23 E0 F0 23"));
    }
}
