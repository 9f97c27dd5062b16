//! Journal sink over defmt-rtt

use defmt::*;

use phasetherm_core::error::Severity;
use phasetherm_core::journal::{EventSink, LogRecord};

/// Writes each journal record as one defmt frame at the matching level
pub struct DefmtSink;

impl EventSink for DefmtSink {
    fn emit(&mut self, record: &LogRecord) {
        let at = record.timestamp_us;
        match record.severity {
            Severity::Info => info!("[{=u64} us] {}", at, record.event),
            Severity::Transient => debug!("[{=u64} us] {}", at, record.event),
            Severity::Degraded => warn!("[{=u64} us] {}", at, record.event),
            Severity::Fatal => error!("[{=u64} us] {}", at, record.event),
        }
    }
}
