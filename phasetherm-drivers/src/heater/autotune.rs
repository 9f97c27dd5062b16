//! Ziegler–Nichols auto-tuner
//!
//! Forces a duty-cycle step onto the heater, samples the temperature and
//! waits for the first falling peak. The critical gain (Ku) is adapted on
//! every sample: pushed up by `gain_increase_rate` while nothing is seen,
//! pulled back by `gain_decrease_rate` on a detection, and always clamped to
//! `[min_gain, max_gain]`. The first detection ends the session and its
//! inter-sample time becomes the critical period (Pu).
//!
//! ```text
//! Idle -> Forcing -> Sampling -> Tuned
//!            \          \
//!             +----------+-> Failed
//! ```
//!
//! Gains follow the classic relations `Kp = 0.6 Ku`, `Ki = 2 Kp / Pu`,
//! `Kd = Kp Pu / 8`.
//!
//! A failed session always drops the forced step: the duty cycle is zeroed
//! and firing disabled before the error is returned.

use heapless::Deque;
use phasetherm_core::config::{AutotuneConfig, PidGains};
use phasetherm_core::error::Severity;
use phasetherm_core::journal::{EventLog, LogEvent};
use phasetherm_core::traits::{DutyActuator, SensorError};
use phasetherm_core::Instant;

const MICROS_PER_SECOND: f32 = 1_000_000.0;

/// Samples kept for peak detection
const WINDOW: usize = 2;

/// Auto-tuner state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TunerState {
    /// Not running
    Idle,
    /// Step input applied, sampling not started
    Forcing,
    /// Collecting samples
    Sampling,
    /// Critical gain and period available
    Tuned,
    /// Session aborted
    Failed(TuneError),
}

/// Auto-tune error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuneError {
    /// Temperature source failed past its retry budget
    SensorFault,
    /// Temperature reached the tuning limit
    OverTemp,
    /// Sample budget spent without an oscillation
    Timeout,
    /// Stopped by the operator
    Cancelled,
    /// Critical gain or period not measured yet
    NotTuned,
}

/// One temperature sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub at: Instant,
    pub temperature_c: f32,
}

/// Auto-tuning session
#[derive(Debug, Clone)]
pub struct AutoTuner {
    config: AutotuneConfig,
    state: TunerState,
    window: Deque<Sample, WINDOW>,
    critical_gain: Option<f32>,
    critical_period_s: Option<f32>,
    sample_count: u32,
}

impl AutoTuner {
    /// Create an idle tuner
    pub fn new(config: &AutotuneConfig) -> Self {
        Self {
            config: config.clone(),
            state: TunerState::Idle,
            window: Deque::new(),
            critical_gain: None,
            critical_period_s: None,
            sample_count: 0,
        }
    }

    /// Apply the step input and enable firing
    ///
    /// Only valid from `Idle`; returns false otherwise.
    pub fn force_oscillation(
        &mut self,
        actuator: &mut dyn DutyActuator,
        log: &mut dyn EventLog,
    ) -> bool {
        if self.state != TunerState::Idle {
            return false;
        }
        self.window.clear();
        self.sample_count = 0;
        self.critical_period_s = None;
        self.critical_gain = Some(self.clamp_gain(self.config.initial_gain));

        let step = actuator.set_duty_cycle(self.config.step_size, log);
        actuator.turn_on(log);
        log.record(Severity::Info, LogEvent::TuningStarted { step });
        self.state = TunerState::Forcing;
        true
    }

    /// Move from `Forcing` to `Sampling`
    pub fn begin_sampling(&mut self) {
        if self.state == TunerState::Forcing {
            self.state = TunerState::Sampling;
        }
    }

    /// Feed one sample to the peak detector
    ///
    /// The first two samples only fill the window. After that a drop of more
    /// than `oscillation_threshold_c` from the previous sample is a peak, and
    /// the time between the two samples is returned as the period (s).
    pub fn detect_oscillation(&mut self, sample: Sample) -> Option<f32> {
        let Some(prev) = self.window.back().copied() else {
            let _ = self.window.push_back(sample);
            return None;
        };
        if sample.at <= prev.at {
            return None;
        }
        let filling = !self.window.is_full();

        let drop = prev.temperature_c - sample.temperature_c;
        let period = if !filling && drop > self.config.oscillation_threshold_c {
            Some((sample.at - prev.at) as f32 / MICROS_PER_SECOND)
        } else {
            None
        };

        if !filling {
            self.window.pop_front();
        }
        let _ = self.window.push_back(sample);
        period
    }

    /// Adapt the critical gain after one sample
    pub fn adjust_critical_gain(&mut self, detected: bool, log: &mut dyn EventLog) -> f32 {
        let rate = if detected {
            self.config.gain_decrease_rate
        } else {
            self.config.gain_increase_rate
        };
        let current = self.critical_gain.unwrap_or(self.config.initial_gain);
        let gain = self.clamp_gain(current * rate);
        self.critical_gain = Some(gain);
        log.record(Severity::Info, LogEvent::GainAdjusted(gain));
        gain
    }

    fn clamp_gain(&self, gain: f32) -> f32 {
        if gain.is_nan() {
            return self.config.min_gain;
        }
        gain.clamp(self.config.min_gain, self.config.max_gain)
    }

    /// Process one sampling tick
    ///
    /// `reading` is the temperature source result after its own retries; an
    /// error here fails the session.
    pub fn sample(
        &mut self,
        at: Instant,
        reading: Result<f32, SensorError>,
        actuator: &mut dyn DutyActuator,
        log: &mut dyn EventLog,
    ) -> Result<TunerState, TuneError> {
        self.begin_sampling();
        match self.state {
            TunerState::Sampling => {}
            TunerState::Failed(err) => return Err(err),
            state => return Ok(state),
        }

        let temperature_c = match reading {
            Ok(t) => t,
            Err(_) => return Err(self.fail(TuneError::SensorFault, actuator, log)),
        };
        if !(temperature_c < self.config.max_temperature_c) {
            return Err(self.fail(TuneError::OverTemp, actuator, log));
        }

        self.sample_count = self.sample_count.saturating_add(1);
        let detected = self.detect_oscillation(Sample { at, temperature_c });
        self.adjust_critical_gain(detected.is_some(), log);

        if let Some(period_s) = detected {
            log.record(Severity::Info, LogEvent::OscillationDetected { period_s });
            self.critical_period_s = Some(period_s);
            self.state = TunerState::Tuned;
            return Ok(TunerState::Tuned);
        }

        if self.sample_count >= self.config.max_samples {
            return Err(self.fail(TuneError::Timeout, actuator, log));
        }
        Ok(TunerState::Sampling)
    }

    /// Stop an active session and drop the step input
    pub fn cancel(&mut self, actuator: &mut dyn DutyActuator, log: &mut dyn EventLog) {
        if self.is_active() {
            actuator.set_duty_cycle(0.0, log);
            actuator.turn_off(log);
            self.state = TunerState::Failed(TuneError::Cancelled);
            log.record(Severity::Info, LogEvent::TuningFailed);
        }
    }

    fn fail(
        &mut self,
        err: TuneError,
        actuator: &mut dyn DutyActuator,
        log: &mut dyn EventLog,
    ) -> TuneError {
        actuator.set_duty_cycle(0.0, log);
        actuator.turn_off(log);
        self.state = TunerState::Failed(err);
        log.record(Severity::Fatal, LogEvent::TuningFailed);
        err
    }

    /// Ziegler–Nichols gains from the measured Ku and Pu
    pub fn calculate_pid_parameters(&self) -> Result<PidGains, TuneError> {
        match (self.critical_gain, self.critical_period_s) {
            (Some(ku), Some(pu)) if pu > 0.0 => {
                let kp = 0.6 * ku;
                Ok(PidGains::new(kp, 2.0 * kp / pu, kp * pu / 8.0))
            }
            _ => Err(TuneError::NotTuned),
        }
    }

    /// Check if the session owns the duty cycle
    pub fn is_active(&self) -> bool {
        matches!(self.state, TunerState::Forcing | TunerState::Sampling)
    }

    pub fn state(&self) -> TunerState {
        self.state
    }

    pub fn critical_gain(&self) -> Option<f32> {
        self.critical_gain
    }

    pub fn critical_period_s(&self) -> Option<f32> {
        self.critical_period_s
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phasetherm_core::journal::NullLog;
    use proptest::prelude::*;

    const SECOND: Instant = 1_000_000;

    struct MockActuator {
        duty: f32,
        max: u8,
        enabled: bool,
    }

    impl MockActuator {
        fn new(max: u8) -> Self {
            Self {
                duty: 0.0,
                max,
                enabled: false,
            }
        }
    }

    impl DutyActuator for MockActuator {
        fn set_duty_cycle(&mut self, percent: f32, _log: &mut dyn EventLog) -> f32 {
            self.duty = percent.clamp(0.0, self.max as f32);
            self.duty
        }

        fn duty_cycle(&self) -> f32 {
            self.duty
        }

        fn max_duty_cycle(&self) -> u8 {
            self.max
        }

        fn turn_on(&mut self, _log: &mut dyn EventLog) {
            self.enabled = true;
        }

        fn turn_off(&mut self, _log: &mut dyn EventLog) {
            self.enabled = false;
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        let d = a - b;
        (if d < 0.0 { -d } else { d }) < 1e-3
    }

    fn started() -> (AutoTuner, MockActuator) {
        let mut tuner = AutoTuner::new(&AutotuneConfig::default());
        let mut actuator = MockActuator::new(30);
        assert!(tuner.force_oscillation(&mut actuator, &mut NullLog));
        (tuner, actuator)
    }

    #[test]
    fn test_force_oscillation_applies_clamped_step() {
        let (tuner, actuator) = started();
        assert_eq!(tuner.state(), TunerState::Forcing);
        assert_eq!(actuator.duty, 30.0);
        assert!(actuator.enabled);
        assert_eq!(tuner.critical_gain(), Some(100.0));
    }

    #[test]
    fn test_force_only_from_idle() {
        let (mut tuner, mut actuator) = started();
        assert!(!tuner.force_oscillation(&mut actuator, &mut NullLog));
    }

    #[test]
    fn test_detects_falling_peak_on_third_sample() {
        let mut tuner = AutoTuner::new(&AutotuneConfig::default());
        let samples = [(5, 20.0), (10, 20.5), (17, 20.3)];
        let results: [Option<f32>; 3] = samples.map(|(s, t)| {
            tuner.detect_oscillation(Sample {
                at: s * SECOND,
                temperature_c: t,
            })
        });
        assert_eq!(results[0], None);
        assert_eq!(results[1], None);
        assert!(approx(results[2].unwrap(), 7.0));
    }

    #[test]
    fn test_small_drop_is_noise() {
        let mut tuner = AutoTuner::new(&AutotuneConfig::default());
        for (s, t) in [(1, 20.0), (2, 20.5), (3, 20.46)] {
            assert_eq!(
                tuner.detect_oscillation(Sample {
                    at: s * SECOND,
                    temperature_c: t
                }),
                None
            );
        }
    }

    #[test]
    fn test_window_rolls_forward() {
        let mut tuner = AutoTuner::new(&AutotuneConfig::default());
        for (s, t) in [(1, 20.0), (2, 20.5), (3, 21.0)] {
            tuner.detect_oscillation(Sample {
                at: s * SECOND,
                temperature_c: t,
            });
        }
        // Compared with the 21.0 sample, not the 20.5 one
        let period = tuner.detect_oscillation(Sample {
            at: 5 * SECOND,
            temperature_c: 20.8,
        });
        assert!(approx(period.unwrap(), 2.0));
    }

    #[test]
    fn test_session_tunes_on_first_oscillation() {
        let (mut tuner, mut actuator) = started();
        let mut log = NullLog;
        let readings = [20.0, 20.5, 20.3];
        let mut last = Ok(TunerState::Idle);
        for (n, t) in readings.iter().enumerate() {
            last = tuner.sample((n as u64 + 1) * 5 * SECOND, Ok(*t), &mut actuator, &mut log);
        }
        assert_eq!(last, Ok(TunerState::Tuned));
        assert_eq!(tuner.sample_count(), 3);
        assert!(approx(tuner.critical_period_s().unwrap(), 5.0));
        // 100 * 1.1 * 1.1 * 0.9
        assert!(approx(tuner.critical_gain().unwrap(), 108.9));
        assert!(tuner.calculate_pid_parameters().is_ok());
    }

    #[test]
    fn test_sensor_error_fails_and_drops_step() {
        let (mut tuner, mut actuator) = started();
        let result = tuner.sample(
            SECOND,
            Err(SensorError::Disconnected),
            &mut actuator,
            &mut NullLog,
        );
        assert_eq!(result, Err(TuneError::SensorFault));
        assert_eq!(tuner.state(), TunerState::Failed(TuneError::SensorFault));
        assert_eq!(actuator.duty, 0.0);
        assert!(!actuator.enabled);
    }

    #[test]
    fn test_over_temperature_fails() {
        let (mut tuner, mut actuator) = started();
        let result = tuner.sample(SECOND, Ok(55.0), &mut actuator, &mut NullLog);
        assert_eq!(result, Err(TuneError::OverTemp));
        assert!(!actuator.enabled);
    }

    #[test]
    fn test_sample_budget_times_out() {
        let config = AutotuneConfig {
            max_samples: 4,
            ..AutotuneConfig::default()
        };
        let mut tuner = AutoTuner::new(&config);
        let mut actuator = MockActuator::new(30);
        let mut log = NullLog;
        tuner.force_oscillation(&mut actuator, &mut log);
        for n in 1..4u64 {
            let rising = 20.0 + n as f32;
            assert_eq!(
                tuner.sample(n * SECOND, Ok(rising), &mut actuator, &mut log),
                Ok(TunerState::Sampling)
            );
        }
        assert_eq!(
            tuner.sample(4 * SECOND, Ok(30.0), &mut actuator, &mut log),
            Err(TuneError::Timeout)
        );
        assert_eq!(actuator.duty, 0.0);
    }

    #[test]
    fn test_cancel() {
        let (mut tuner, mut actuator) = started();
        tuner.cancel(&mut actuator, &mut NullLog);
        assert_eq!(tuner.state(), TunerState::Failed(TuneError::Cancelled));
        assert!(!tuner.is_active());
        assert!(!actuator.enabled);
    }

    #[test]
    fn test_calculate_requires_measurements() {
        let tuner = AutoTuner::new(&AutotuneConfig::default());
        assert_eq!(tuner.calculate_pid_parameters(), Err(TuneError::NotTuned));
    }

    #[test]
    fn test_ziegler_nichols_relations() {
        let mut tuner = AutoTuner::new(&AutotuneConfig::default());
        tuner.critical_gain = Some(100.0);
        tuner.critical_period_s = Some(10.0);
        let gains = tuner.calculate_pid_parameters().unwrap();
        assert!(approx(gains.kp, 60.0));
        assert!(approx(gains.ki, 12.0));
        assert!(approx(gains.kd, 75.0));
    }

    proptest! {
        #[test]
        fn critical_gain_stays_bounded(steps in proptest::collection::vec(any::<bool>(), 0..200)) {
            let mut tuner = AutoTuner::new(&AutotuneConfig::default());
            let mut log = NullLog;
            for detected in steps {
                let gain = tuner.adjust_critical_gain(detected, &mut log);
                prop_assert!((50.0..=200.0).contains(&gain));
            }
        }
    }
}
