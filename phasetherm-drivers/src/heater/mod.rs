//! Heater control implementations

pub mod autotune;
pub mod gate;
pub mod hysteresis;
pub mod phase;
pub mod pid;

pub use autotune::{AutoTuner, Sample, TuneError, TunerState};
pub use gate::{EmbeddedPin, GateOutput};
pub use hysteresis::HysteresisGate;
pub use phase::{phase_delay_us, EdgeOutcome, HeaterState, PhaseControlDriver};
pub use pid::{PidRegulator, SetpointError};
