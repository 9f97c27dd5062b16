//! State machine definition

use super::events::Event;

/// Controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Power-on initialization
    Boot,
    /// Heater off, waiting for a command
    Idle,
    /// PID loop drives the duty cycle
    Regulating,
    /// Auto-tuner owns the duty cycle
    Tuning,
    /// Fault detected; gate forced off until restart
    Halted(FaultKind),
}

/// Fatal fault causes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// No zero-cross edge within the fault timeout
    ZeroCrossLost,
    /// Auto-tuning could not complete
    TuningFailed,
    /// Temperature source failed past its retry budget
    SensorUnavailable,
    /// Temperature exceeded the safety limit
    OverTemperature,
}

impl State {
    /// Check if this state may fire the gate
    pub fn heater_allowed(&self) -> bool {
        matches!(self, State::Regulating | State::Tuning)
    }

    /// Check if this is a halted state
    pub fn is_halted(&self) -> bool {
        matches!(self, State::Halted(_))
    }

    /// Fault that caused the halt, if any
    pub fn fault(&self) -> Option<FaultKind> {
        match self {
            State::Halted(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Process an event and return the next state
    ///
    /// Events that do not apply to the current state leave it unchanged.
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            (Boot, BootComplete) => Idle,

            (Idle, HeaterOn) => Regulating,
            (Idle | Regulating, StartTuning) => Tuning,

            (Regulating, HeaterOff) => Idle,

            (Tuning, TuningComplete) => Regulating,
            (Tuning, TuningCancelled | HeaterOff) => Idle,

            // A halt keeps the first fault
            (Halted(kind), FaultDetected(_)) => Halted(kind),
            (Halted(_), Restart) => Idle,
            (_, FaultDetected(kind)) => Halted(kind),

            (state, _) => state,
        }
    }
}
