//! Host-to-keyboard commands and the keyboard's replies.
//!
//! The host's command set is documented in
//! <https://wiki.osdev.org/PS/2_Keyboard#Commands>. Bytes arrive here already
//! framed; the bit-level receive path is out of scope.

use super::report::LedState;

pub const CMD_SET_LEDS: u8 = 0xED;
pub const CMD_ECHO: u8 = 0xEE;
pub const CMD_SET_SCANCODE_SET: u8 = 0xF0;
pub const CMD_IDENTIFY: u8 = 0xF2;
pub const CMD_SET_TYPEMATIC: u8 = 0xF3;
pub const CMD_ENABLE: u8 = 0xF4;
pub const CMD_DISABLE: u8 = 0xF5;
pub const CMD_SET_DEFAULTS: u8 = 0xF6;
pub const CMD_RESEND: u8 = 0xFE;
pub const CMD_RESET: u8 = 0xFF;

pub const REPLY_ACK: u8 = 0xFA;
pub const REPLY_RESEND: u8 = 0xFE;
pub const REPLY_BAT_SUCCESS: u8 = 0xAA;
pub const REPLY_BAT_FAIL: u8 = 0xFC;
pub const REPLY_ECHO: u8 = 0xEE;
pub const KEYBOARD_ID: [u8; 2] = [0xAB, 0x83];

/// The only scan code set this keyboard speaks.
pub const SCANCODE_SET_2: u8 = 2;

/// Time the keyboard spends "self testing" between the ACK and BAT of a reset.
pub const RESET_SETTLE_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ps2Command {
    SetLeds,
    Echo,
    SetScancodeSet,
    Identify,
    SetTypematic,
    Enable,
    Disable,
    SetDefaults,
    Resend,
    Reset,
    Unknown(u8),
}

impl From<u8> for Ps2Command {
    fn from(byte: u8) -> Self {
        match byte {
            CMD_SET_LEDS => Ps2Command::SetLeds,
            CMD_ECHO => Ps2Command::Echo,
            CMD_SET_SCANCODE_SET => Ps2Command::SetScancodeSet,
            CMD_IDENTIFY => Ps2Command::Identify,
            CMD_SET_TYPEMATIC => Ps2Command::SetTypematic,
            CMD_ENABLE => Ps2Command::Enable,
            CMD_DISABLE => Ps2Command::Disable,
            CMD_SET_DEFAULTS => Ps2Command::SetDefaults,
            CMD_RESEND => Ps2Command::Resend,
            CMD_RESET => Ps2Command::Reset,
            other => Ps2Command::Unknown(other),
        }
    }
}

impl Ps2Command {
    pub fn code(&self) -> u8 {
        match self {
            Ps2Command::SetLeds => CMD_SET_LEDS,
            Ps2Command::Echo => CMD_ECHO,
            Ps2Command::SetScancodeSet => CMD_SET_SCANCODE_SET,
            Ps2Command::Identify => CMD_IDENTIFY,
            Ps2Command::SetTypematic => CMD_SET_TYPEMATIC,
            Ps2Command::Enable => CMD_ENABLE,
            Ps2Command::Disable => CMD_DISABLE,
            Ps2Command::SetDefaults => CMD_SET_DEFAULTS,
            Ps2Command::Resend => CMD_RESEND,
            Ps2Command::Reset => CMD_RESET,
            Ps2Command::Unknown(byte) => *byte,
        }
    }

    /// Commands that are followed by a single data byte from the host.
    pub fn data_byte(&self) -> Option<DataByte> {
        match self {
            Ps2Command::SetLeds => Some(DataByte::Leds),
            Ps2Command::SetTypematic => Some(DataByte::Typematic),
            Ps2Command::SetScancodeSet => Some(DataByte::ScancodeSet),
            _ => None,
        }
    }

    /// The reply sent as soon as the command byte is received.
    ///
    /// RESET only gets its ACK here; the BAT result follows after the
    /// settle delay. RESEND has no fixed reply: it repeats whatever went out
    /// last.
    pub fn response(&self) -> Option<Ps2Response> {
        Some(match self {
            Ps2Command::Echo => Ps2Response::Echo,
            Ps2Command::Identify => Ps2Response::Identify,
            Ps2Command::Resend => return None,
            // Unknown commands are acknowledged and otherwise ignored
            _ => Ps2Response::Ack,
        })
    }
}

/// What the next host byte means after a command that takes a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataByte {
    Leds,
    Typematic,
    ScancodeSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ps2Response {
    Ack,
    Resend,
    BatSuccess,
    BatFail,
    Echo,
    /// ACK followed by the two keyboard ID bytes.
    Identify,
    /// ACK followed by the active scan code set.
    ScancodeSet(u8),
}

impl Ps2Response {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Ps2Response::Ack => vec![REPLY_ACK],
            Ps2Response::Resend => vec![REPLY_RESEND],
            Ps2Response::BatSuccess => vec![REPLY_BAT_SUCCESS],
            Ps2Response::BatFail => vec![REPLY_BAT_FAIL],
            Ps2Response::Echo => vec![REPLY_ECHO],
            Ps2Response::Identify => vec![REPLY_ACK, KEYBOARD_ID[0], KEYBOARD_ID[1]],
            Ps2Response::ScancodeSet(set) => vec![REPLY_ACK, *set],
        }
    }
}

/// SET_LEDS parameter: bits 0-2 are scroll, num and caps lock.
pub fn decode_leds(byte: u8) -> LedState {
    LedState::from_bits_truncate(byte & 0x07)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypematicRate {
    pub delay_ms: u32,
    pub period_ms: u32,
}

/// SET_TYPEMATIC parameter.
///
/// Bits 5-6 select the delay (250 ms steps starting at 250 ms). The period
/// is `(8 + A) * 2^B * 4.17 ms` where A is bits 0-2 and B is bits 3-4,
/// rounded to the nearest millisecond: 0x00 is ~30 cps, 0x1F is ~2 cps.
pub fn decode_typematic(byte: u8) -> TypematicRate {
    let delay_ms = 250 * (1 + u32::from((byte >> 5) & 0x03));
    let a = u32::from(byte & 0x07);
    let b = u32::from((byte >> 3) & 0x03);
    let period_centi_ms = (8 + a) * (1 << b) * 417;
    TypematicRate {
        delay_ms,
        period_ms: (period_centi_ms + 50) / 100,
    }
}

/// SET_SCANCODE_SET parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScancodeSetRequest {
    /// Report the current set.
    Query,
    Select(u8),
    Invalid(u8),
}

pub fn decode_scancode_set(byte: u8) -> ScancodeSetRequest {
    match byte {
        0 => ScancodeSetRequest::Query,
        1..=3 => ScancodeSetRequest::Select(byte),
        other => ScancodeSetRequest::Invalid(other),
    }
}
