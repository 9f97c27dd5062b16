//! Hardware abstraction traits
//!
//! These traits define the interface between the control logic and the
//! board-specific implementations.

pub mod channel;
pub mod heater;

pub use channel::CommandChannel;
pub use heater::{AdcReader, DutyActuator, HeaterOutput, SensorError, TemperatureSource};
