//! Events that trigger state transitions

use super::machine::FaultKind;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Startup checks passed
    BootComplete,

    // Operator commands
    /// Enable heating
    HeaterOn,
    /// Disable heating
    HeaterOff,

    // Auto-tuning
    /// Start a tuning session
    StartTuning,
    /// Tuning produced new gains
    TuningComplete,
    /// Tuning stopped without a result
    TuningCancelled,

    /// A fatal condition was detected
    FaultDetected(FaultKind),
    /// Controlled restart after a fault
    Restart,
}
