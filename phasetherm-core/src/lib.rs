//! Board-agnostic control logic for the AC heater controller
//!
//! This crate contains the parts of the controller that do not depend on
//! a concrete board or sensor:
//!
//! - Hardware abstraction traits (temperature source, gate output, duty actuator)
//! - Configuration types with validated defaults
//! - Error taxonomy and the bounded retry policy
//! - The event journal that replaces ad-hoc logging
//! - Control state machine
//! - Cooperative task scheduler
//! - Safety monitoring logic

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod journal;
pub mod retry;
pub mod safety;
pub mod scheduler;
pub mod state;
pub mod traits;

pub use phasetherm_hal::Instant;
pub use phasetherm_protocol::{Command, ParseError};
