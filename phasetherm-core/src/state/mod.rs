//! Control state machine
//!
//! The supervisor's mode is a function of the current state and an event.
//! The machine is explicit, finite, and deterministic.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::{FaultKind, State};
