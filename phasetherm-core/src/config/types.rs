//! Configuration type definitions

use crate::retry::RetryPolicy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper bound for any duty cycle, in percent
pub const FULL_POWER: u8 = 100;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Duty-cycle ceiling above 100 %
    DutyCeiling,
    /// Pulse width zero or not shorter than a half-cycle
    PulseWidth,
    /// Zero-cross fault timeout shorter than two half-cycles
    FaultTimeout,
    /// Shortest accepted half-cycle zero or above the default estimate
    HalfCycle,
    /// Negative or non-finite PID gain
    Gains,
    /// Setpoint range empty or above the safety limit
    SetpointRange,
    /// Negative or non-finite hysteresis band
    Hysteresis,
    /// Critical gain range empty or initial gain outside it
    GainRange,
    /// Gain adaptation rates on the wrong side of 1
    GainRates,
    /// Tuning step, threshold or sample budget invalid
    Tuning,
    /// Zero task interval
    Interval,
    /// Retry policy allows no attempt
    Retry,
    /// Stored bytes could not be encoded or decoded
    Encoding,
}

/// PID gains
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidGains {
    /// Proportional gain (Kp)
    pub kp: f32,
    /// Integral gain (Ki)
    pub ki: f32,
    /// Derivative gain (Kd)
    pub kd: f32,
}

impl PidGains {
    /// Create gains from their three terms
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// All gains are finite and not negative
    pub fn is_valid(&self) -> bool {
        [self.kp, self.ki, self.kd]
            .iter()
            .all(|g| g.is_finite() && *g >= 0.0)
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::new(2.0, 0.1, 0.05)
    }
}

/// Phase-control driver configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseConfig {
    /// Gate pulse width (µs)
    pub pulse_width_us: u32,
    /// Half-cycle assumed until two edges have been seen (µs)
    ///
    /// 10 ms matches 50 Hz mains.
    pub default_half_cycle_us: u32,
    /// Edges implying a shorter half-cycle are rejected as noise (µs)
    ///
    /// 4 ms admits mains up to 125 Hz.
    pub min_half_cycle_us: u32,
    /// No accepted edge for this long is a fatal fault (µs)
    pub fault_timeout_us: u32,
    /// Duty-cycle safety ceiling (%)
    pub max_duty_cycle: u8,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            pulse_width_us: 100,
            default_half_cycle_us: 10_000,
            min_half_cycle_us: 4_000,
            fault_timeout_us: 100_000,
            max_duty_cycle: 30,
        }
    }
}

/// PID regulation configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RegulatorConfig {
    /// Gains used until auto-tuning replaces them
    pub gains: PidGains,
    /// Initial setpoint (°C)
    pub setpoint_c: f32,
    /// Lowest accepted setpoint (°C)
    pub min_setpoint_c: f32,
    /// Highest accepted setpoint (°C)
    pub max_setpoint_c: f32,
    /// Deadband around the setpoint for on/off control (°C)
    ///
    /// The heater switches on below `setpoint - hysteresis` and off at or
    /// above `setpoint + hysteresis`.
    pub hysteresis_c: f32,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            gains: PidGains::default(),
            setpoint_c: 43.0,
            min_setpoint_c: 0.0,
            max_setpoint_c: 50.0,
            hysteresis_c: 0.5,
        }
    }
}

/// Ziegler–Nichols auto-tuning configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AutotuneConfig {
    /// Run a tuning session when the controller starts
    pub run_on_start: bool,
    /// Forced step duty cycle (%), still subject to the ceiling
    pub step_size: f32,
    /// Minimum drop between samples that counts as a peak (°C)
    pub oscillation_threshold_c: f32,
    /// Critical gain at the start of a session
    pub initial_gain: f32,
    /// Lower bound for the critical gain
    pub min_gain: f32,
    /// Upper bound for the critical gain
    pub max_gain: f32,
    /// Gain multiplier when no oscillation was seen (> 1)
    pub gain_increase_rate: f32,
    /// Gain multiplier when an oscillation was seen (< 1)
    pub gain_decrease_rate: f32,
    /// Samples without oscillation before giving up
    pub max_samples: u32,
    /// Abort tuning at or above this temperature (°C)
    pub max_temperature_c: f32,
}

impl Default for AutotuneConfig {
    fn default() -> Self {
        Self {
            run_on_start: true,
            step_size: 100.0,
            oscillation_threshold_c: 0.05,
            initial_gain: 100.0,
            min_gain: 50.0,
            max_gain: 200.0,
            gain_increase_rate: 1.1,
            gain_decrease_rate: 0.9,
            max_samples: 240, // 20 minutes at 5 s
            max_temperature_c: 55.0,
        }
    }
}

/// Cooperative scheduler intervals
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SchedulerConfig {
    /// Longest gap between zero-cross services (µs)
    ///
    /// Edges and pulse deadlines wake the loop directly; this only bounds
    /// how late a missing edge is noticed.
    pub zero_cross_poll_us: u32,
    /// PID-maintain task period (ms)
    pub maintain_interval_ms: u32,
    /// Auto-tune sampling period (ms)
    pub autotune_interval_ms: u32,
    /// Command intake period (ms)
    pub command_interval_ms: u32,
    /// Journal flush period (ms)
    pub flush_interval_ms: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            zero_cross_poll_us: 1_000,
            maintain_interval_ms: 5_000,
            autotune_interval_ms: 5_000,
            command_interval_ms: 100,
            flush_interval_ms: 60_000,
        }
    }
}

/// Safety limits
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SafetyConfig {
    /// Fatal over-temperature limit (°C)
    pub max_temperature_c: f32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_temperature_c: 55.0,
        }
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlConfig {
    pub phase: PhaseConfig,
    pub regulator: RegulatorConfig,
    pub autotune: AutotuneConfig,
    pub retry: RetryPolicy,
    pub scheduler: SchedulerConfig,
    pub safety: SafetyConfig,
}

impl ControlConfig {
    /// Check every value against its documented range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let phase = &self.phase;
        if phase.max_duty_cycle > FULL_POWER {
            return Err(ConfigError::DutyCeiling);
        }
        if phase.min_half_cycle_us == 0 || phase.min_half_cycle_us > phase.default_half_cycle_us {
            return Err(ConfigError::HalfCycle);
        }
        if phase.pulse_width_us == 0 || phase.pulse_width_us >= phase.min_half_cycle_us {
            return Err(ConfigError::PulseWidth);
        }
        if phase.fault_timeout_us < phase.default_half_cycle_us.saturating_mul(2) {
            return Err(ConfigError::FaultTimeout);
        }

        let reg = &self.regulator;
        if !reg.gains.is_valid() {
            return Err(ConfigError::Gains);
        }
        if !(reg.min_setpoint_c < reg.max_setpoint_c
            && reg.max_setpoint_c < self.safety.max_temperature_c)
        {
            return Err(ConfigError::SetpointRange);
        }
        if !(reg.min_setpoint_c..=reg.max_setpoint_c).contains(&reg.setpoint_c) {
            return Err(ConfigError::SetpointRange);
        }
        if !(reg.hysteresis_c.is_finite() && reg.hysteresis_c >= 0.0) {
            return Err(ConfigError::Hysteresis);
        }

        let tune = &self.autotune;
        if !(tune.min_gain > 0.0
            && tune.min_gain <= tune.max_gain
            && (tune.min_gain..=tune.max_gain).contains(&tune.initial_gain))
        {
            return Err(ConfigError::GainRange);
        }
        if !(tune.gain_increase_rate > 1.0
            && tune.gain_decrease_rate > 0.0
            && tune.gain_decrease_rate < 1.0)
        {
            return Err(ConfigError::GainRates);
        }
        if !(tune.step_size > 0.0 && tune.step_size <= FULL_POWER as f32)
            || !(tune.oscillation_threshold_c >= 0.0)
            || tune.max_samples == 0
        {
            return Err(ConfigError::Tuning);
        }

        let sched = &self.scheduler;
        if sched.zero_cross_poll_us == 0
            || sched.maintain_interval_ms == 0
            || sched.autotune_interval_ms == 0
            || sched.command_interval_ms == 0
            || sched.flush_interval_ms == 0
        {
            return Err(ConfigError::Interval);
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Retry);
        }

        Ok(())
    }
}

#[cfg(feature = "serde")]
impl ControlConfig {
    /// Serialize into `buf` as postcard bytes
    pub fn to_bytes<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Encoding)
    }

    /// Deserialize postcard bytes and validate the result
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Encoding)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(ControlConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_default_values() {
        let config = ControlConfig::default();
        assert_eq!(config.phase.max_duty_cycle, 30);
        assert_eq!(config.phase.pulse_width_us, 100);
        assert_eq!(config.regulator.hysteresis_c, 0.5);
        assert_eq!(config.autotune.oscillation_threshold_c, 0.05);
        assert_eq!(config.scheduler.maintain_interval_ms, 5_000);
    }

    #[test]
    fn test_rejects_duty_ceiling_above_full_power() {
        let mut config = ControlConfig::default();
        config.phase.max_duty_cycle = 101;
        assert_eq!(config.validate(), Err(ConfigError::DutyCeiling));
    }

    #[test]
    fn test_rejects_setpoint_above_safety_limit() {
        let mut config = ControlConfig::default();
        config.regulator.max_setpoint_c = 60.0;
        assert_eq!(config.validate(), Err(ConfigError::SetpointRange));
    }

    #[test]
    fn test_rejects_inverted_gain_rates() {
        let mut config = ControlConfig::default();
        config.autotune.gain_decrease_rate = 1.2;
        assert_eq!(config.validate(), Err(ConfigError::GainRates));
    }

    #[test]
    fn test_rejects_negative_gain() {
        let mut config = ControlConfig::default();
        config.regulator.gains.ki = -0.1;
        assert_eq!(config.validate(), Err(ConfigError::Gains));
    }

    #[test]
    fn test_rejects_short_fault_timeout() {
        let mut config = ControlConfig::default();
        config.phase.fault_timeout_us = 15_000;
        assert_eq!(config.validate(), Err(ConfigError::FaultTimeout));
    }

    #[test]
    fn test_rejects_zero_min_half_cycle() {
        let mut config = ControlConfig::default();
        config.phase.min_half_cycle_us = 0;
        assert_eq!(config.validate(), Err(ConfigError::HalfCycle));
        config.phase.min_half_cycle_us = 12_000;
        assert_eq!(config.validate(), Err(ConfigError::HalfCycle));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_postcard_storage() {
        let mut config = ControlConfig::default();
        config.phase.max_duty_cycle = 45;
        config.autotune.run_on_start = false;

        let mut buf = [0u8; 256];
        let bytes = config.to_bytes(&mut buf).unwrap();
        let loaded = ControlConfig::from_bytes(bytes).unwrap();
        assert_eq!(loaded, config);

        assert_eq!(
            ControlConfig::from_bytes(&[0xFF, 0x01]),
            Err(ConfigError::Encoding)
        );
    }
}
