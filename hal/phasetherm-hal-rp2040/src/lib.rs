//! RP2040 bindings for the phasetherm heater controller
//!
//! This crate provides RP2040 implementations of the `phasetherm-hal`
//! traits:
//!
//! - Zero-cross edge counter fed from a GPIO interrupt wait
//!   (implements `phasetherm_hal::ZeroCrossTimer`)
//! - Blocking ADC channel for the vessel thermistor
//!   (implements `phasetherm_core::traits::AdcReader`)
//!
//! The triac gate needs no wrapper: `embassy_rp::gpio::Output` implements
//! `embedded_hal::digital::OutputPin` and plugs into
//! `phasetherm_drivers::heater::EmbeddedPin` directly.

#![no_std]

pub mod adc;
pub mod zero_cross;

pub use adc::ThermistorAdc;
pub use zero_cross::{count_edges, EdgeCounter, ZeroCrossClock};
