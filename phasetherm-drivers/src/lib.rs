//! Driver implementations
//!
//! This crate provides the concrete control components built on the
//! traits defined in phasetherm-core:
//!
//! - Phase-control firing driver synchronized to the mains zero-cross
//! - Triac gate output over a GPIO pin
//! - PID regulator and hysteresis gate
//! - Ziegler–Nichols auto-tuner
//! - Temperature sensors (NTC thermistor)
//! - The supervisor that schedules all of the above

#![no_std]
#![deny(unsafe_code)]

pub mod heater;
pub mod sensor;
pub mod supervisor;

pub use supervisor::Supervisor;
