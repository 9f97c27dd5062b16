//! Error taxonomy
//!
//! Every error in the controller falls into one of three classes:
//!
//! - **Transient**: retried locally a bounded number of times, then escalated.
//! - **Degraded**: the request is clamped or rejected at the setter and the
//!   loop keeps running.
//! - **Fatal**: the heater is forced off and the control subsystem needs a
//!   controlled restart.
//!
//! Journal records reuse the same scale with one extra informational level.

use phasetherm_protocol::ParseError;

use crate::config::ConfigError;
use crate::state::FaultKind;
use crate::traits::SensorError;

/// Severity of a journal record or error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Severity {
    /// Normal operation
    Info,
    /// Recoverable hiccup, retried locally
    Transient,
    /// Request clamped or rejected, operation continues
    Degraded,
    /// Heater forced off, restart required
    Fatal,
}

impl Severity {
    /// Check if this severity describes an error
    pub fn is_error(&self) -> bool {
        *self != Severity::Info
    }

    /// Check if this severity requires the safe-shutdown sequence
    pub fn requires_shutdown(&self) -> bool {
        *self == Severity::Fatal
    }
}

/// Map an error onto the taxonomy
pub trait Classify {
    /// Severity class of this error
    fn severity(&self) -> Severity;
}

impl Classify for SensorError {
    fn severity(&self) -> Severity {
        Severity::Transient
    }
}

impl Classify for ParseError {
    fn severity(&self) -> Severity {
        Severity::Degraded
    }
}

impl Classify for FaultKind {
    fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl Classify for ConfigError {
    fn severity(&self) -> Severity {
        Severity::Fatal
    }
}
