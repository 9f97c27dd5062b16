//! PID regulator
//!
//! Computes a duty-cycle request from the setpoint and a measured
//! temperature over irregular sample intervals. Elapsed time comes from the
//! monotonic clock, so every term is scaled by the real spacing of the calls.
//!
//! The output is not clamped here; the caller limits it to
//! `[0, max_duty_cycle]` before feeding the phase-control driver.

use phasetherm_core::config::{PidGains, RegulatorConfig};
use phasetherm_core::error::Severity;
use phasetherm_core::journal::{EventLog, LogEvent};
use phasetherm_core::Instant;

const MICROS_PER_SECOND: f32 = 1_000_000.0;

/// Setpoint rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SetpointError {
    /// NaN or infinite
    NotFinite,
    /// Outside the configured setpoint range
    OutOfRange,
}

/// PID regulator state
#[derive(Debug, Clone)]
pub struct PidRegulator {
    gains: PidGains,
    setpoint: f32,
    min_setpoint: f32,
    max_setpoint: f32,
    integral: f32,
    prev_error: f32,
    prev_timestamp: Instant,
}

impl PidRegulator {
    /// Create a regulator whose first interval starts at `now`
    pub fn new(config: &RegulatorConfig, now: Instant) -> Self {
        Self {
            gains: config.gains,
            setpoint: config.setpoint_c,
            min_setpoint: config.min_setpoint_c,
            max_setpoint: config.max_setpoint_c,
            integral: 0.0,
            prev_error: 0.0,
            prev_timestamp: now,
        }
    }

    /// Compute the control output for a reading taken at `now`
    ///
    /// Returns 0 without touching any state if `now` is not after the
    /// previous call.
    pub fn compute(&mut self, measured: f32, now: Instant) -> f32 {
        if now <= self.prev_timestamp {
            return 0.0;
        }
        let elapsed = (now - self.prev_timestamp) as f32 / MICROS_PER_SECOND;
        let error = self.setpoint - measured;

        let p = self.gains.kp * error;

        self.integral += error * elapsed;
        let i = self.gains.ki * self.integral;

        let derivative = (error - self.prev_error) / elapsed;
        let d = self.gains.kd * derivative;

        self.prev_error = error;
        self.prev_timestamp = now;
        p + i + d
    }

    /// Zero the integral accumulator
    pub fn reset_integral(&mut self) {
        self.integral = 0.0;
    }

    /// Replace the gains; the integral is left alone
    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
    }

    /// Change the target temperature
    pub fn set_setpoint(
        &mut self,
        celsius: f32,
        log: &mut dyn EventLog,
    ) -> Result<(), SetpointError> {
        let check = if !celsius.is_finite() {
            Err(SetpointError::NotFinite)
        } else if celsius < self.min_setpoint || celsius > self.max_setpoint {
            Err(SetpointError::OutOfRange)
        } else {
            Ok(())
        };

        match check {
            Ok(()) => {
                self.setpoint = celsius;
                log.record(Severity::Info, LogEvent::SetpointChanged(celsius));
            }
            Err(_) => log.record(Severity::Degraded, LogEvent::SetpointRejected(celsius)),
        }
        check
    }

    /// Start the next interval at `now` without computing
    ///
    /// Used when regulation resumes so idle time does not count as elapsed.
    pub fn rebase(&mut self, now: Instant) {
        self.prev_timestamp = self.prev_timestamp.max(now);
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn prev_timestamp(&self) -> Instant {
        self.prev_timestamp
    }
}
