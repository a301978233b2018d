//! The PS/2 keyboard driver.
//!
//! Key reports are diffed against the previous one and turned into Set 2
//! make/break sequences on the transmit queue; [`Ps2Keyboard::periodic_task`]
//! drains that queue one byte per call and drives auto-repeat. Host commands
//! are answered straight on the bus, ahead of anything queued.

use tracing::{debug, info, trace, warn};

use super::bus::{BusFault, Transmitter};
use super::command::{
    DataByte, Ps2Command, Ps2Response, REPLY_ACK, RESET_SETTLE_MS, SCANCODE_SET_2,
    ScancodeSetRequest, decode_leds, decode_scancode_set, decode_typematic,
};
use super::pins::{Pin, Timer};
use super::queue::TransmitQueue;
use super::report::{ExtraReport, KeyboardReport, LedState};
use super::scancodes::{MODIFIERS, translate_consumer_usage, translate_keycode};
use super::typematic::Typematic;
use super::{Ps2Config, Ps2Error};
use crate::mode::HostDriver;

pub struct Ps2Keyboard<C, D, T> {
    tx: Transmitter<C, D, T>,
    queue: TransmitQueue,
    typematic: Typematic,
    config: Ps2Config,
    leds: LedState,
    enabled: bool,
    scancode_set: u8,
    /// Set after a command that takes a parameter byte.
    awaiting: Option<DataByte>,
    last_sent: Option<u8>,
    last_send_ms: Option<u32>,
    prev_report: KeyboardReport,
    prev_usage: u16,
}

impl<C: Pin, D: Pin, T: Timer> Ps2Keyboard<C, D, T> {
    pub fn new(clk: C, data: D, timer: T, config: Ps2Config) -> Self {
        Self {
            tx: Transmitter::new(clk, data, timer, config.timing),
            queue: TransmitQueue::new(),
            typematic: Typematic::new(config.typematic_delay_ms, config.typematic_rate_ms),
            config,
            leds: LedState::empty(),
            enabled: true,
            scancode_set: SCANCODE_SET_2,
            awaiting: None,
            last_sent: None,
            last_send_ms: None,
            prev_report: KeyboardReport::default(),
            prev_usage: 0,
        }
    }

    /// Release the bus, restore host-settable defaults and forget any key
    /// state from a previous session.
    pub fn init(&mut self) -> Result<(), Ps2Error> {
        self.set_defaults();
        self.queue.clear();
        self.typematic.disable();
        self.prev_report.clear();
        self.prev_usage = 0;
        self.awaiting = None;
        self.tx.init()?;
        info!("PS2: keyboard initialized");
        Ok(())
    }

    /// Send at most one queued byte, then check auto-repeat.
    ///
    /// A bus fault leaves the byte at the head of the queue for the next call.
    pub fn periodic_task(&mut self) -> Result<(), Ps2Error> {
        let sent = self.drain_one();
        self.typematic_task();
        sent
    }

    pub fn send_make(&mut self, keycode: u16) -> Result<(), Ps2Error> {
        self.check_enabled()?;
        let mapping = translate_keycode(keycode).ok_or(Ps2Error::UnmappedKey(keycode))?;
        self.enqueue(&mapping.make_bytes())?;
        debug!("PS2: make {keycode:02X}");
        let now = self.now();
        self.typematic.arm(keycode, mapping, now);
        Ok(())
    }

    pub fn send_break(&mut self, keycode: u16) -> Result<(), Ps2Error> {
        self.typematic.stop(keycode);
        self.check_enabled()?;
        let mapping = translate_keycode(keycode).ok_or(Ps2Error::UnmappedKey(keycode))?;
        self.enqueue(&mapping.break_bytes())?;
        debug!("PS2: break {keycode:02X}");
        Ok(())
    }

    /// Handle one framed byte from the host.
    pub fn process_host_command(&mut self, byte: u8) -> Result<(), Ps2Error> {
        let command = Ps2Command::from(byte);
        if let Some(kind) = self.awaiting.take() {
            if let Ps2Command::Unknown(_) = command {
                return self.process_data_byte(kind, byte);
            }
            debug!("PS2: {kind:?} parameter abandoned for {command:?}");
        }

        debug!("PS2: host command {command:?}");
        match command {
            Ps2Command::Resend => return self.resend(),
            Ps2Command::Reset => return self.reset(),
            Ps2Command::Enable => self.enabled = true,
            Ps2Command::Disable => self.enabled = false,
            Ps2Command::SetDefaults => self.set_defaults(),
            Ps2Command::Unknown(byte) => warn!("PS2: unknown host command {byte:02X}, ACKing"),
            _ => {}
        }
        self.awaiting = command.data_byte();
        match command.response() {
            Some(response) => self.reply(&response.to_bytes()),
            None => Ok(()),
        }
    }

    fn process_data_byte(&mut self, kind: DataByte, byte: u8) -> Result<(), Ps2Error> {
        let response = match kind {
            DataByte::Leds => {
                self.leds = decode_leds(byte);
                debug!("PS2: LEDs {:?}", self.leds);
                Ps2Response::Ack
            }
            DataByte::Typematic => {
                let rate = decode_typematic(byte);
                debug!("PS2: typematic {rate:?}");
                self.typematic.set_rate(rate.delay_ms, rate.period_ms);
                Ps2Response::Ack
            }
            DataByte::ScancodeSet => match decode_scancode_set(byte) {
                ScancodeSetRequest::Query => Ps2Response::ScancodeSet(self.scancode_set),
                ScancodeSetRequest::Select(SCANCODE_SET_2) => {
                    self.scancode_set = SCANCODE_SET_2;
                    Ps2Response::Ack
                }
                ScancodeSetRequest::Select(set) => {
                    warn!("PS2: scan code set {set} not supported, staying on set 2");
                    Ps2Response::Ack
                }
                ScancodeSetRequest::Invalid(set) => {
                    warn!("PS2: invalid scan code set {set:02X}");
                    Ps2Response::Resend
                }
            },
        };
        self.reply(&response.to_bytes())
    }

    fn resend(&mut self) -> Result<(), Ps2Error> {
        let byte = self.last_sent.unwrap_or(REPLY_ACK);
        debug!("PS2: resending {byte:02X}");
        self.reply(&[byte])
    }

    /// ACK, self-test pause, BAT. Nothing is sent in between.
    fn reset(&mut self) -> Result<(), Ps2Error> {
        info!("PS2: reset requested by host");
        self.set_defaults();
        self.queue.clear();
        self.typematic.disable();
        self.prev_report.clear();
        self.prev_usage = 0;
        self.reply(&Ps2Response::Ack.to_bytes())?;
        self.tx.timer().delay_ms(RESET_SETTLE_MS);
        self.reply(&Ps2Response::BatSuccess.to_bytes())
    }

    fn set_defaults(&mut self) {
        self.enabled = true;
        self.scancode_set = SCANCODE_SET_2;
        self.leds = LedState::empty();
        self.typematic
            .set_rate(self.config.typematic_delay_ms, self.config.typematic_rate_ms);
    }

    pub fn led_state(&self) -> LedState {
        self.leds
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn scancode_set(&self) -> u8 {
        self.scancode_set
    }

    pub fn typematic(&self) -> &Typematic {
        &self.typematic
    }

    pub fn typematic_disable(&mut self) {
        self.typematic.disable();
    }

    pub fn queue(&self) -> &TransmitQueue {
        &self.queue
    }

    /// Throw away bytes that were queued but never sent.
    pub fn discard_pending(&mut self) {
        if !self.queue.is_empty() {
            debug!("PS2: discarding {} pending bytes", self.queue.len());
        }
        self.queue.clear();
    }

    pub fn last_sent(&self) -> Option<u8> {
        self.last_sent
    }

    pub fn config(&self) -> &Ps2Config {
        &self.config
    }

    pub fn timer(&self) -> &T {
        self.tx.timer()
    }

    fn now(&self) -> u32 {
        self.tx.timer().now_ms()
    }

    fn check_enabled(&self) -> Result<(), Ps2Error> {
        if self.enabled {
            Ok(())
        } else {
            Err(Ps2Error::Disabled)
        }
    }

    fn enqueue(&mut self, bytes: &[u8]) -> Result<(), Ps2Error> {
        if self.queue.enqueue_sequence(bytes) {
            Ok(())
        } else {
            Err(Ps2Error::BufferFull {
                needed: bytes.len(),
                free: self.queue.free(),
            })
        }
    }

    fn inter_byte_elapsed(&self) -> bool {
        self.last_send_ms
            .is_none_or(|at| self.tx.timer().elapsed_ms(at) >= self.config.inter_byte_delay_ms)
    }

    fn drain_one(&mut self) -> Result<(), Ps2Error> {
        let Some(byte) = self.queue.peek() else {
            return Ok(());
        };
        if !self.inter_byte_elapsed() {
            return Ok(());
        }
        self.transmit(byte)?;
        self.queue.pop();
        Ok(())
    }

    fn typematic_task(&mut self) {
        if !self.enabled {
            return;
        }
        let now = self.now();
        let Some(mapping) = self.typematic.due(now) else {
            return;
        };
        if self.queue.enqueue_sequence(&mapping.make_bytes()) {
            trace!("PS2: typematic repeat {:02X}", mapping.scancode);
            self.typematic.record_repeat(now);
        }
    }

    /// Send bytes directly, blocking for the inter-byte gap before each one.
    fn reply(&mut self, bytes: &[u8]) -> Result<(), Ps2Error> {
        for &byte in bytes {
            if let Some(at) = self.last_send_ms {
                let elapsed = self.tx.timer().elapsed_ms(at);
                if elapsed < self.config.inter_byte_delay_ms {
                    self.tx
                        .timer()
                        .delay_ms(self.config.inter_byte_delay_ms - elapsed);
                }
            }
            self.transmit(byte)?;
        }
        Ok(())
    }

    fn transmit(&mut self, byte: u8) -> Result<(), BusFault> {
        self.tx.send_byte(byte)?;
        self.last_sent = Some(byte);
        self.last_send_ms = Some(self.now());
        Ok(())
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<(), Ps2Error> {
        self.check_enabled()?;
        self.enqueue(bytes)
    }
}

/// Anything dropped on the way to the queue has already been logged where it
/// was detected.
fn dropped(result: Result<(), Ps2Error>) {
    match result {
        Ok(()) => {}
        Err(Ps2Error::Disabled) => trace!("PS2: keyboard disabled, key dropped"),
        Err(err) => debug!("PS2: key dropped: {err}"),
    }
}

impl<C: Pin, D: Pin, T: Timer> HostDriver for Ps2Keyboard<C, D, T> {
    fn keyboard_leds(&mut self) -> u8 {
        self.leds.to_host_leds().bits()
    }

    fn send_keyboard(&mut self, report: &KeyboardReport) {
        let prev = std::mem::replace(&mut self.prev_report, *report);

        let changed = prev.mods ^ report.mods;
        for entry in &MODIFIERS {
            if !changed.contains(entry.bit) {
                continue;
            }
            let bytes = if report.mods.contains(entry.bit) {
                entry.mapping.make_bytes()
            } else {
                entry.mapping.break_bytes()
            };
            dropped(self.emit(&bytes));
        }

        let current = report.key_set();
        let previous = prev.key_set();
        for key in prev.pressed().filter(|&k| !current.contains(k as usize)) {
            dropped(self.send_break(key.into()));
        }
        for key in report.pressed().filter(|&k| !previous.contains(k as usize)) {
            dropped(self.send_make(key.into()));
        }
    }

    fn send_extra(&mut self, report: &ExtraReport) {
        if report.usage == self.prev_usage {
            return;
        }
        let prev = std::mem::replace(&mut self.prev_usage, report.usage);
        if prev != 0 {
            if let Some(mapping) = translate_consumer_usage(prev) {
                dropped(self.emit(&mapping.break_bytes()));
            }
        }
        if report.usage != 0 {
            if let Some(mapping) = translate_consumer_usage(report.usage) {
                dropped(self.emit(&mapping.make_bytes()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::keycodes::*;
    use crate::device::report::Modifiers;
    use crate::device::scancodes::{PAUSE_MAKE, PRINT_SCREEN_BREAK, PRINT_SCREEN_MAKE};
    use crate::host::sim::{SimBus, SimClock, SimPin};
    use hex_literal::hex;

    type TestKeyboard = Ps2Keyboard<SimPin, SimPin, SimClock>;

    fn keyboard() -> (SimBus, TestKeyboard) {
        let bus = SimBus::new();
        let mut kb = Ps2Keyboard::new(
            bus.clock_pin(),
            bus.data_pin(),
            bus.clock(),
            Ps2Config::default(),
        );
        kb.init().unwrap();
        (bus, kb)
    }

    fn report(mods: Modifiers, keys: &[u16]) -> KeyboardReport {
        let mut report = KeyboardReport {
            mods,
            ..Default::default()
        };
        for &key in keys {
            report.add_key(key);
        }
        report
    }

    /// Run the scheduler until the queue is empty.
    fn drain(bus: &SimBus, kb: &mut TestKeyboard) {
        while !kb.queue().is_empty() {
            kb.periodic_task().unwrap();
            bus.clock().advance_ms(1);
        }
    }

    /// Bytes on the wire followed by bytes still queued.
    fn emitted(bus: &SimBus, kb: &TestKeyboard) -> Vec<u8> {
        let mut bytes = bus.bytes();
        bytes.extend(kb.queue().iter());
        bytes
    }

    fn tap(bus: &SimBus, kb: &mut TestKeyboard, key: u16) -> Vec<u8> {
        kb.send_keyboard(&report(Modifiers::empty(), &[key]));
        kb.send_keyboard(&KeyboardReport::default());
        drain(bus, kb);
        bus.take_bytes()
    }

    #[test]
    fn test_press_release() {
        let (bus, mut kb) = keyboard();
        assert_eq!(tap(&bus, &mut kb, KC_A), hex!("1C F0 1C"));
        assert_eq!(tap(&bus, &mut kb, KC_RIGHT), hex!("E0 74 E0 F0 74"));
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_print_screen() {
        let (bus, mut kb) = keyboard();
        kb.send_keyboard(&report(Modifiers::empty(), &[KC_PSCR]));
        assert!(!kb.typematic().is_armed());
        drain(&bus, &mut kb);
        assert_eq!(bus.take_bytes(), PRINT_SCREEN_MAKE);
        kb.send_keyboard(&KeyboardReport::default());
        drain(&bus, &mut kb);
        assert_eq!(bus.take_bytes(), PRINT_SCREEN_BREAK);
    }

    #[test]
    fn test_pause_has_no_break() {
        let (bus, mut kb) = keyboard();
        assert_eq!(tap(&bus, &mut kb, KC_PAUSE), PAUSE_MAKE);
        assert!(!kb.typematic().is_armed());
    }

    #[test]
    fn test_inter_byte_spacing() {
        let (bus, mut kb) = keyboard();
        tap(&bus, &mut kb, KC_UP);
        kb.send_keyboard(&report(Modifiers::empty(), &[KC_UP]));
        drain(&bus, &mut kb);
        let frames = bus.frames();
        assert_eq!(frames.len(), 2);
        assert!(frames[1].at_us - frames[0].at_us >= 2000);
    }

    #[test]
    fn test_typematic_repeats() {
        let (bus, mut kb) = keyboard();
        let clock = bus.clock();
        let delay = kb.config().typematic_delay_ms;
        let rate = kb.config().typematic_rate_ms;
        let t0 = clock.now_ms();
        kb.send_keyboard(&report(Modifiers::empty(), &[KC_K]));
        clock.set_ms(u64::from(t0 + delay + rate));
        kb.periodic_task().unwrap();
        clock.set_ms(u64::from(t0 + delay + 2 * rate));
        kb.periodic_task().unwrap();
        assert_eq!(emitted(&bus, &kb), hex!("42 42 42"));
    }

    #[test]
    fn test_first_repeat_after_delay() {
        let (bus, mut kb) = keyboard();
        let clock = bus.clock();
        kb.send_keyboard(&report(Modifiers::empty(), &[KC_UP]));
        drain(&bus, &mut kb);
        clock.set_ms(499);
        kb.periodic_task().unwrap();
        assert!(kb.queue().is_empty());
        clock.set_ms(500);
        kb.periodic_task().unwrap();
        assert_eq!(kb.queue().iter().collect::<Vec<_>>(), hex!("E0 75"));
    }

    #[test]
    fn test_typematic_follows_last_key() {
        let (bus, mut kb) = keyboard();
        kb.send_keyboard(&report(Modifiers::empty(), &[KC_K]));
        kb.send_keyboard(&report(Modifiers::empty(), &[KC_K, KC_J]));
        assert_eq!(kb.typematic().armed_keycode(), Some(KC_J));
        kb.send_keyboard(&report(Modifiers::empty(), &[KC_K]));
        assert!(!kb.typematic().is_armed());
        drain(&bus, &mut kb);
        assert_eq!(bus.take_bytes(), hex!("42 3B F0 3B"));
    }

    #[test]
    fn test_modifiers_then_releases_then_presses() {
        let (bus, mut kb) = keyboard();
        kb.send_keyboard(&report(Modifiers::RCTRL, &[KC_A]));
        drain(&bus, &mut kb);
        assert_eq!(bus.take_bytes(), hex!("E0 14 1C"));

        kb.send_keyboard(&report(Modifiers::LSHIFT, &[KC_B]));
        drain(&bus, &mut kb);
        // LSHIFT make (bit 1), RCTRL break (bit 4), then A up, then B down
        assert_eq!(bus.take_bytes(), hex!("12 E0 F0 14 F0 1C 32"));
        assert_eq!(kb.typematic().armed_keycode(), Some(KC_B));
    }

    #[test]
    fn test_modifier_never_arms_typematic() {
        let (_bus, mut kb) = keyboard();
        kb.send_keyboard(&report(Modifiers::LGUI, &[]));
        assert!(!kb.typematic().is_armed());
        assert_eq!(kb.queue().iter().collect::<Vec<_>>(), hex!("E0 1F"));
    }

    #[test]
    fn test_consumer_usage_change() {
        let (bus, mut kb) = keyboard();
        kb.send_extra(&ExtraReport::new(0x00E9));
        kb.send_extra(&ExtraReport::new(0x00E9));
        kb.send_extra(&ExtraReport::new(0x00EA));
        kb.send_extra(&ExtraReport::new(0));
        assert!(!kb.typematic().is_armed());
        drain(&bus, &mut kb);
        assert_eq!(bus.take_bytes(), hex!("E0 32 E0 F0 32 E0 21 E0 F0 21"));
    }

    #[test]
    fn test_full_queue_drops_whole_sequence() {
        let (_bus, mut kb) = keyboard();
        for _ in 0..15 {
            kb.send_make(KC_UP).unwrap();
        }
        assert_eq!(kb.queue().free(), 1);
        assert_eq!(
            kb.send_break(KC_UP),
            Err(Ps2Error::BufferFull { needed: 3, free: 1 })
        );
        assert_eq!(kb.queue().len(), 30);
        kb.send_make(KC_A).unwrap();
        assert_eq!(kb.queue().free(), 0);
    }

    #[test]
    fn test_unmapped_key() {
        let (_bus, mut kb) = keyboard();
        assert_eq!(kb.send_make(0x7F), Err(Ps2Error::UnmappedKey(0x7F)));
        assert!(kb.queue().is_empty());
    }

    #[test]
    fn test_bus_fault_keeps_byte() {
        let (bus, mut kb) = keyboard();
        kb.send_make(KC_A).unwrap();
        bus.host_hold_clock(true);
        assert!(matches!(kb.periodic_task(), Err(Ps2Error::Bus(BusFault::ClockInhibited))));
        assert_eq!(kb.queue().peek(), Some(0x1C));
        bus.host_hold_clock(false);
        bus.clear_trace();
        kb.periodic_task().unwrap();
        assert!(kb.queue().is_empty());
        assert_eq!(bus.bytes(), hex!("1C"));
    }

    #[test]
    fn test_identify_and_echo() {
        let (bus, mut kb) = keyboard();
        kb.process_host_command(0xF2).unwrap();
        assert_eq!(bus.take_bytes(), hex!("FA AB 83"));
        kb.process_host_command(0xEE).unwrap();
        assert_eq!(bus.take_bytes(), hex!("EE"));
    }

    #[test]
    fn test_reply_preempts_queue() {
        let (bus, mut kb) = keyboard();
        kb.send_make(KC_A).unwrap();
        kb.process_host_command(0xF2).unwrap();
        drain(&bus, &mut kb);
        assert_eq!(bus.take_bytes(), hex!("FA AB 83 1C"));
    }

    #[test]
    fn test_reset() {
        let (bus, mut kb) = keyboard();
        kb.send_make(KC_A).unwrap();
        kb.process_host_command(0xED).unwrap();
        kb.process_host_command(0x07).unwrap();
        bus.clear_trace();

        kb.process_host_command(0xFF).unwrap();
        let frames = bus.frames();
        let bytes: Vec<u8> = frames.iter().map(|f| f.byte).collect();
        assert_eq!(bytes, hex!("FA AA"));
        assert!(frames[1].at_us - frames[0].at_us >= 100_000);
        assert!(kb.queue().is_empty());
        assert!(!kb.typematic().is_armed());
        assert_eq!(kb.led_state(), LedState::empty());
        assert!(kb.is_enabled());
    }

    #[test]
    fn test_set_leds() {
        let (bus, mut kb) = keyboard();
        kb.process_host_command(0xED).unwrap();
        assert_eq!(kb.led_state(), LedState::empty());
        kb.process_host_command(0x04).unwrap();
        assert_eq!(kb.led_state(), LedState::CAPS_LOCK);
        assert_eq!(kb.keyboard_leds(), 0x02);
        assert_eq!(bus.take_bytes(), hex!("FA FA"));
    }

    #[test]
    fn test_command_abandons_parameter() {
        let (bus, mut kb) = keyboard();
        kb.process_host_command(0xED).unwrap();
        kb.process_host_command(0xEE).unwrap();
        assert_eq!(bus.take_bytes(), hex!("FA EE"));
        // Not taken as an LED byte
        kb.process_host_command(0x02).unwrap();
        assert_eq!(kb.led_state(), LedState::empty());
    }

    #[test]
    fn test_set_typematic() {
        let (bus, mut kb) = keyboard();
        kb.process_host_command(0xF3).unwrap();
        kb.process_host_command(0x2B).unwrap();
        assert_eq!(kb.typematic().delay_ms(), 500);
        assert_eq!(kb.typematic().rate_ms(), 92);
        kb.process_host_command(0xF6).unwrap();
        assert_eq!(kb.typematic().rate_ms(), 33);
        assert_eq!(bus.take_bytes(), hex!("FA FA FA"));
    }

    #[test]
    fn test_scancode_set() {
        let (bus, mut kb) = keyboard();
        kb.process_host_command(0xF0).unwrap();
        kb.process_host_command(0x00).unwrap();
        assert_eq!(bus.take_bytes(), hex!("FA FA 02"));
        kb.process_host_command(0xF0).unwrap();
        kb.process_host_command(0x03).unwrap();
        assert_eq!(kb.scancode_set(), 2);
        kb.process_host_command(0xF0).unwrap();
        kb.process_host_command(0x09).unwrap();
        assert_eq!(bus.take_bytes(), hex!("FA FA FA FE"));
    }

    #[test]
    fn test_disable_blocks_keys() {
        let (bus, mut kb) = keyboard();
        kb.process_host_command(0xF5).unwrap();
        assert!(!kb.is_enabled());
        kb.send_keyboard(&report(Modifiers::LSHIFT, &[KC_A]));
        assert_eq!(kb.send_make(KC_B), Err(Ps2Error::Disabled));
        assert!(kb.queue().is_empty());
        kb.process_host_command(0xF4).unwrap();
        assert!(kb.is_enabled());
        assert_eq!(bus.take_bytes(), hex!("FA FA"));
    }

    #[test]
    fn test_resend_repeats_last_byte() {
        let (bus, mut kb) = keyboard();
        assert_eq!(tap(&bus, &mut kb, KC_Z), hex!("1A F0 1A"));
        kb.process_host_command(0xFE).unwrap();
        assert_eq!(bus.take_bytes(), hex!("1A"));
        assert_eq!(kb.last_sent(), Some(0x1A));
    }

    #[test]
    fn test_unknown_command_is_acked() {
        let (bus, mut kb) = keyboard();
        kb.process_host_command(0xF7).unwrap();
        assert_eq!(bus.take_bytes(), hex!("FA"));
    }

    #[test]
    fn test_init_resets_key_state() {
        let (bus, mut kb) = keyboard();
        kb.send_keyboard(&report(Modifiers::empty(), &[KC_K]));
        kb.init().unwrap();
        assert!(kb.queue().is_empty());
        assert!(!kb.typematic().is_armed());
        // K is "pressed" again from a clean slate
        kb.send_keyboard(&report(Modifiers::empty(), &[KC_K]));
        drain(&bus, &mut kb);
        assert_eq!(bus.take_bytes(), hex!("42"));
    }
}
