//! Device side of a PS/2 keyboard, with live switching between a USB and a
//! PS/2 output.
//!
//! [`device`] holds the protocol itself: bit transmitter, transmit queue,
//! Set 2 translation, auto-repeat and the host command responder.
//! [`mode`] debounces the selector switch and hands key reports to whichever
//! backend is installed. [`host`] is everything needed to run it without
//! hardware.

pub mod device;
pub mod host;
pub mod mode;
