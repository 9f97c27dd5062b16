//! Safety monitoring
//!
//! Detects fault conditions and latches the first one until restart.

pub mod monitor;

pub use monitor::{SafetyMonitor, SafetyStatus};
