//! Heater command protocol
//!
//! The supervising host (a Raspberry Pi in the reference build) talks to the
//! controller over a UART with newline-terminated ASCII lines:
//!
//! ```text
//! SET_HEATER_TEMP,45\n     target temperature in °C
//! SET_HEATER_DUTY,30\n     duty-cycle ceiling in percent
//! HEATER_ON\n
//! HEATER_OFF\n
//! ```
//!
//! Lines are assembled by [`LineBuffer`] and turned into a typed
//! [`Command`] here, at the channel boundary, so the control core never
//! sees the wire format.

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod line;

pub use command::{Command, ParseError};
pub use line::{Line, LineBuffer, LineError, MAX_LINE_LEN};
