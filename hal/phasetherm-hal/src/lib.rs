//! Phasetherm Hardware Abstraction Layer
//!
//! Traits implemented by chip-specific HALs so the control code runs the
//! same on the board and on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  phasetherm-drivers / phasetherm-firmware │
//! └──────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │  phasetherm-hal (this crate - traits)     │
//! └──────────────────────────────────────────┘
//!                     │
//!                     ▼
//!          ┌──────────────────────┐
//!          │ phasetherm-hal-rp2040 │
//!          └──────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital output
//! - [`timer::Monotonic`] - Microsecond clock that never goes backwards
//! - [`timer::ZeroCrossTimer`] - Edge counter on the mains zero-cross detector

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod timer;

pub use gpio::OutputPin;
pub use timer::{edges_between, Instant, Monotonic, ZeroCrossTimer};
