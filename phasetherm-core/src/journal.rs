//! Event journal
//!
//! Components never log through a global. They receive a `&mut dyn EventLog`
//! handle and record structured events with a severity; the owning
//! `Journal` timestamps, buffers and forwards them to an `EventSink`
//! (defmt on the board, a test double on the host).
//!
//! Buffered records are only guaranteed to reach the sink after `flush`,
//! which the supervisor calls periodically and on every shutdown.

use heapless::Deque;
use phasetherm_protocol::ParseError;

use crate::error::Severity;
use crate::state::{FaultKind, State};
use crate::Instant;

/// Default journal capacity in records
pub const JOURNAL_CAPACITY: usize = 32;

/// Structured journal events
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LogEvent {
    /// Stored duty cycle changed (%)
    DutyChanged(f32),
    /// Duty request outside `[0, max]` was clamped
    DutyClamped { requested: f32, applied: f32 },
    /// Duty ceiling changed (%)
    MaxDutyChanged(u8),
    /// Setpoint accepted (°C)
    SetpointChanged(f32),
    /// Setpoint rejected (°C)
    SetpointRejected(f32),
    /// Firing enabled
    HeaterEnabled,
    /// Firing disabled
    HeaterDisabled,
    /// Control state transition
    StateChanged { from: State, to: State },
    /// Tuning session forced a step input (%)
    TuningStarted { step: f32 },
    /// Critical gain after adaptation
    GainAdjusted(f32),
    /// Peak detected with the given period (s)
    OscillationDetected { period_s: f32 },
    /// New gains installed
    GainsTuned { kp: f32, ki: f32, kd: f32 },
    /// Tuning session aborted
    TuningFailed,
    /// Several zero-cross edges arrived between two observations
    EdgesCoalesced(u32),
    /// Edge rejected by the debounce window
    EdgeRejected,
    /// Temperature read failed, retry number
    SensorRetry { attempt: u8 },
    /// Malformed command line
    CommandRejected(ParseError),
    /// Fatal fault
    Fault(FaultKind),
    /// Controlled shutdown completed
    Shutdown,
    /// Control subsystem restarted
    Restart,
}

/// One timestamped journal entry
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogRecord {
    /// Monotonic time of the record (µs)
    pub timestamp_us: Instant,
    pub severity: Severity,
    pub event: LogEvent,
}

/// Handle passed to components that report events
pub trait EventLog {
    /// Record an event
    fn record(&mut self, severity: Severity, event: LogEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl EventLog for NullLog {
    fn record(&mut self, _severity: Severity, _event: LogEvent) {}
}

/// Destination of flushed records
pub trait EventSink {
    /// Write one record
    fn emit(&mut self, record: &LogRecord);

    /// Push any output the sink itself buffers
    fn flush(&mut self) {}
}

/// Buffering journal owned by the supervisor
#[derive(Debug)]
pub struct Journal<S: EventSink, const N: usize = JOURNAL_CAPACITY> {
    sink: S,
    pending: Deque<LogRecord, N>,
    now: Instant,
}

impl<S: EventSink, const N: usize> Journal<S, N> {
    /// Create an empty journal
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            pending: Deque::new(),
            now: 0,
        }
    }

    /// Set the timestamp applied to subsequent records
    pub fn stamp(&mut self, now: Instant) {
        self.now = now;
    }

    /// Forward every buffered record to the sink
    pub fn flush(&mut self) {
        while let Some(record) = self.pending.pop_front() {
            self.sink.emit(&record);
        }
        self.sink.flush();
    }

    /// Buffered record count
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Borrow the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: EventSink, const N: usize> EventLog for Journal<S, N> {
    fn record(&mut self, severity: Severity, event: LogEvent) {
        let record = LogRecord {
            timestamp_us: self.now,
            severity,
            event,
        };
        // Full buffer: drain to the sink rather than lose the oldest record
        if self.pending.is_full() {
            while let Some(old) = self.pending.pop_front() {
                self.sink.emit(&old);
            }
        }
        if let Err(record) = self.pending.push_back(record) {
            self.sink.emit(&record);
        }
        if severity.requires_shutdown() {
            self.flush();
        }
    }
}
