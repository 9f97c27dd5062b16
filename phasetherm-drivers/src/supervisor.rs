//! Control supervisor
//!
//! Owns every control component and runs them as cooperative tasks on one
//! logical thread:
//!
//! | Task          | Period              | Body                                     |
//! |---------------|---------------------|------------------------------------------|
//! | ZeroCross     | every poll          | edge observation, pulse timing, watchdog |
//! | Maintain      | `maintain_interval` | probe read, safety check, PID tick       |
//! | Autotune      | `autotune_interval` | one tuning sample (session only)         |
//! | CommandIntake | `command_interval`  | at most one pending command              |
//! | JournalFlush  | `flush_interval`    | push buffered records to the sink        |
//!
//! The zero-cross body runs at the start of every poll and again before
//! each lower-priority task, so a slow task never delays a pulse by more
//! than its own run time. Task bodies finish their state changes before
//! returning; nothing is held across a poll.
//!
//! Every fatal condition ends up in `halt`: the gate is forced off, the
//! fault is journaled and flushed, and all tasks stop until `restart`.

use phasetherm_core::config::{ConfigError, ControlConfig};
use phasetherm_core::error::{Classify, Severity};
use phasetherm_core::journal::{EventLog, EventSink, Journal, LogEvent};
use phasetherm_core::retry::{RetryDecision, RetryTracker};
use phasetherm_core::safety::{SafetyMonitor, SafetyStatus};
use phasetherm_core::scheduler::{TaskId, TaskScheduler};
use phasetherm_core::state::{Event, FaultKind, State};
use phasetherm_core::traits::{
    CommandChannel, DutyActuator, HeaterOutput, SensorError, TemperatureSource,
};
use phasetherm_core::{Command, Instant};
use phasetherm_hal::ZeroCrossTimer;

use crate::heater::{AutoTuner, HysteresisGate, PhaseControlDriver, PidRegulator, TunerState};

/// Outcome of a probe read under the retry policy
enum Reading {
    Value(f32),
    Retrying,
    Unavailable,
}

/// Control supervisor
pub struct Supervisor<Z, G, T, C, S>
where
    S: EventSink,
{
    timer: Z,
    driver: PhaseControlDriver<G>,
    regulator: PidRegulator,
    hysteresis: HysteresisGate,
    tuner: Option<AutoTuner>,
    source: T,
    commands: C,
    journal: Journal<S>,
    scheduler: TaskScheduler,
    safety: SafetyMonitor,
    state: State,
    config: ControlConfig,
    maintain_retry: RetryTracker,
    tune_retry: RetryTracker,
}

impl<Z, G, T, C, S> Supervisor<Z, G, T, C, S>
where
    Z: ZeroCrossTimer,
    G: HeaterOutput,
    T: TemperatureSource,
    C: CommandChannel,
    S: EventSink,
{
    /// Build the control subsystem from a validated configuration
    pub fn new(
        timer: Z,
        gate: G,
        source: T,
        commands: C,
        sink: S,
        config: ControlConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let now = timer.now();
        Ok(Self {
            driver: PhaseControlDriver::new(gate, &config.phase, now),
            regulator: PidRegulator::new(&config.regulator, now),
            hysteresis: HysteresisGate::new(config.regulator.hysteresis_c),
            tuner: None,
            source,
            commands,
            journal: Journal::new(sink),
            scheduler: TaskScheduler::new(&config.scheduler, now),
            safety: SafetyMonitor::new(&config.safety),
            state: State::Boot,
            maintain_retry: config.retry.tracker(),
            tune_retry: config.retry.tracker(),
            timer,
            config,
        })
    }

    /// Leave `Boot`, and start a tuning session if configured to
    pub fn start(&mut self) {
        let now = self.timer.now();
        self.journal.stamp(now);
        self.transition(Event::BootComplete);
        if self.config.autotune.run_on_start {
            self.start_tuning();
        }
    }

    /// Run every due task once, highest priority first
    ///
    /// Returns the fault if the subsystem is halted.
    pub fn poll(&mut self) -> Result<(), FaultKind> {
        if let Some(fault) = self.state.fault() {
            return Err(fault);
        }

        let now = self.timer.now();
        self.journal.stamp(now);
        if let Err(fault) = self.service_zero_cross(now) {
            self.halt(fault);
            return Err(fault);
        }

        for id in TaskId::ALL.into_iter().skip(1) {
            let now = self.timer.now();
            if !self.scheduler.is_due(id, now) {
                continue;
            }
            self.journal.stamp(now);
            let result = self
                .service_zero_cross(now)
                .and_then(|()| self.run_task(id, now));
            if let Err(fault) = result {
                self.halt(fault);
                return Err(fault);
            }
        }
        Ok(())
    }

    /// Earliest time `poll` has work to do
    pub fn next_wake(&self) -> Option<Instant> {
        match (self.scheduler.next_deadline(), self.driver.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn service_zero_cross(&mut self, now: Instant) -> Result<(), FaultKind> {
        self.driver.poll(&self.timer, &mut self.journal)?;
        self.scheduler.complete(TaskId::ZeroCross, now);
        Ok(())
    }

    fn run_task(&mut self, id: TaskId, now: Instant) -> Result<(), FaultKind> {
        match id {
            TaskId::ZeroCross => Ok(()),
            TaskId::Maintain => self.run_maintain(now),
            TaskId::Autotune => self.run_autotune(now),
            TaskId::CommandIntake => {
                self.run_command_intake(now);
                self.scheduler.complete(TaskId::CommandIntake, now);
                Ok(())
            }
            TaskId::JournalFlush => {
                self.journal.flush();
                self.scheduler.complete(TaskId::JournalFlush, now);
                Ok(())
            }
        }
    }

    fn read_probe(&mut self, task: TaskId, now: Instant) -> Reading {
        let tracker = match task {
            TaskId::Autotune => &mut self.tune_retry,
            _ => &mut self.maintain_retry,
        };
        match self.source.read_celsius() {
            Ok(celsius) => {
                tracker.record_success();
                Reading::Value(celsius)
            }
            Err(err) => match tracker.record_failure() {
                RetryDecision::RetryAfter(ms) => {
                    let attempt = tracker.failures();
                    self.journal
                        .record(err.severity(), LogEvent::SensorRetry { attempt });
                    self.scheduler
                        .defer(task, now.saturating_add(u64::from(ms) * 1_000));
                    Reading::Retrying
                }
                RetryDecision::GiveUp => Reading::Unavailable,
            },
        }
    }

    fn run_maintain(&mut self, now: Instant) -> Result<(), FaultKind> {
        let celsius = match self.read_probe(TaskId::Maintain, now) {
            Reading::Value(celsius) => Some(celsius),
            Reading::Retrying => return Ok(()),
            Reading::Unavailable => None,
        };
        self.safety.update_temperature(celsius);
        if let SafetyStatus::Fault(kind) = self.safety.check() {
            return Err(kind);
        }

        if let (State::Regulating, Some(measured)) = (self.state, celsius) {
            let output = self.regulator.compute(measured, now);
            let ceiling = self.driver.max_duty_cycle() as f32;
            // Output pinned at a limit the error pushes further into: stop winding up
            let error = self.regulator.setpoint() - measured;
            if (output >= ceiling && error > 0.0) || (output <= 0.0 && error < 0.0) {
                self.regulator.reset_integral();
            }
            if self.hysteresis.update(measured, self.regulator.setpoint()) {
                let duty = if output.is_nan() {
                    0.0
                } else {
                    output.clamp(0.0, ceiling)
                };
                self.driver.set_duty_cycle(duty, &mut self.journal);
                self.driver.turn_on(&mut self.journal);
            } else {
                self.driver.turn_off(&mut self.journal);
            }
        }

        self.scheduler.complete(TaskId::Maintain, now);
        Ok(())
    }

    fn run_autotune(&mut self, now: Instant) -> Result<(), FaultKind> {
        if self.tuner.is_none() {
            self.scheduler.deactivate(TaskId::Autotune);
            return Ok(());
        }
        let reading = match self.read_probe(TaskId::Autotune, now) {
            Reading::Value(celsius) => Ok(celsius),
            Reading::Retrying => return Ok(()),
            Reading::Unavailable => Err(SensorError::Disconnected),
        };

        let outcome = match self.tuner.as_mut() {
            Some(tuner) => tuner.sample(now, reading, &mut self.driver, &mut self.journal),
            None => return Ok(()),
        };
        match outcome {
            Ok(TunerState::Tuned) => self.install_tuned_gains(now),
            Ok(_) => {
                self.scheduler.complete(TaskId::Autotune, now);
                Ok(())
            }
            Err(_) => Err(FaultKind::TuningFailed),
        }
    }

    fn install_tuned_gains(&mut self, now: Instant) -> Result<(), FaultKind> {
        let gains = self
            .tuner
            .take()
            .ok_or(FaultKind::TuningFailed)?
            .calculate_pid_parameters()
            .map_err(|_| FaultKind::TuningFailed)?;

        self.regulator.set_gains(gains);
        self.regulator.reset_integral();
        self.regulator.rebase(now);
        self.hysteresis.reset();
        self.journal.record(
            Severity::Info,
            LogEvent::GainsTuned {
                kp: gains.kp,
                ki: gains.ki,
                kd: gains.kd,
            },
        );

        self.scheduler.deactivate(TaskId::Autotune);
        self.transition(Event::TuningComplete);
        self.scheduler.activate(TaskId::Maintain, now);
        Ok(())
    }

    fn run_command_intake(&mut self, now: Instant) {
        let command = match self.commands.try_receive() {
            None => return,
            Some(Err(err)) => {
                self.journal
                    .record(err.severity(), LogEvent::CommandRejected(err));
                return;
            }
            Some(Ok(command)) => command,
        };

        match command {
            Command::SetTemperature(celsius) => {
                // Rejections are journaled by the regulator
                let _ = self.regulator.set_setpoint(celsius, &mut self.journal);
            }
            Command::SetMaxDuty(percent) => {
                self.driver.set_max_duty_cycle(percent, &mut self.journal);
            }
            Command::HeaterOn => {
                if self.state == State::Idle {
                    self.regulator.rebase(now);
                    self.hysteresis.reset();
                    self.transition(Event::HeaterOn);
                    self.scheduler.activate(TaskId::Maintain, now);
                }
            }
            Command::HeaterOff => match self.state {
                State::Tuning => self.cancel_tuning(),
                State::Regulating => {
                    self.driver.turn_off(&mut self.journal);
                    self.transition(Event::HeaterOff);
                }
                _ => {}
            },
        }
    }

    /// Start a tuning session from `Idle` or `Regulating`
    pub fn start_tuning(&mut self) -> bool {
        if !matches!(self.state, State::Idle | State::Regulating) {
            return false;
        }
        let now = self.timer.now();
        self.journal.stamp(now);

        let mut tuner = AutoTuner::new(&self.config.autotune);
        if !tuner.force_oscillation(&mut self.driver, &mut self.journal) {
            return false;
        }
        self.tuner = Some(tuner);
        self.tune_retry.record_success();
        self.transition(Event::StartTuning);
        self.scheduler.activate(TaskId::Autotune, now);
        true
    }

    /// Stop the tuning session and return to `Idle`
    pub fn cancel_tuning(&mut self) {
        if let Some(mut tuner) = self.tuner.take() {
            tuner.cancel(&mut self.driver, &mut self.journal);
        }
        self.scheduler.deactivate(TaskId::Autotune);
        self.transition(Event::TuningCancelled);
    }

    fn halt(&mut self, fault: FaultKind) {
        self.driver.shutdown();
        self.tuner = None;
        self.safety.trip(fault);
        self.transition(Event::FaultDetected(fault));
        self.journal.record(fault.severity(), LogEvent::Fault(fault));
        self.journal.flush();
        self.scheduler.deactivate_all();
    }

    /// Controlled shutdown: gate off, journal flushed, tasks stopped
    pub fn shutdown(&mut self) {
        self.journal.stamp(self.timer.now());
        self.driver.shutdown();
        self.tuner = None;
        self.scheduler.deactivate_all();
        self.journal.record(Severity::Info, LogEvent::Shutdown);
        self.journal.flush();
    }

    /// Restart the control subsystem after a halt
    ///
    /// Returns false if the subsystem is not halted.
    pub fn restart(&mut self) -> bool {
        if !self.state.is_halted() {
            return false;
        }
        let now = self.timer.now();
        self.journal.stamp(now);

        self.driver.reset(now);
        self.safety.clear();
        self.regulator.reset_integral();
        self.regulator.rebase(now);
        self.hysteresis.reset();
        self.maintain_retry.record_success();
        self.tune_retry.record_success();
        self.scheduler = TaskScheduler::new(&self.config.scheduler, now);

        self.transition(Event::Restart);
        self.journal.record(Severity::Info, LogEvent::Restart);
        true
    }

    fn transition(&mut self, event: Event) {
        let next = self.state.transition(event);
        if next != self.state {
            self.journal.record(
                Severity::Info,
                LogEvent::StateChanged {
                    from: self.state,
                    to: next,
                },
            );
            self.state = next;
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn driver(&self) -> &PhaseControlDriver<G> {
        &self.driver
    }

    pub fn regulator(&self) -> &PidRegulator {
        &self.regulator
    }

    pub fn tuner(&self) -> Option<&AutoTuner> {
        self.tuner.as_ref()
    }

    pub fn safety(&self) -> &SafetyMonitor {
        &self.safety
    }

    pub fn journal(&self) -> &Journal<S> {
        &self.journal
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};
    use heapless::{Deque, Vec};
    use phasetherm_core::journal::LogRecord;
    use phasetherm_core::ParseError;
    use phasetherm_hal::Monotonic;

    const MS: Instant = 1_000;
    const SECOND: Instant = 1_000_000;
    const STEP: Instant = 500;
    const EDGE_SPACING: Instant = 20 * MS;

    struct Clock {
        now: Cell<Instant>,
        edges: Cell<u32>,
        mains: Cell<bool>,
    }

    impl Clock {
        fn new() -> Self {
            Self {
                now: Cell::new(0),
                edges: Cell::new(0),
                mains: Cell::new(true),
            }
        }
    }

    impl Monotonic for &Clock {
        fn now(&self) -> Instant {
            self.now.get()
        }
    }

    impl ZeroCrossTimer for &Clock {
        fn edge_count(&self) -> u32 {
            self.edges.get()
        }
    }

    struct Probe {
        reading: Cell<Result<f32, SensorError>>,
    }

    impl Probe {
        fn new(celsius: f32) -> Self {
            Self {
                reading: Cell::new(Ok(celsius)),
            }
        }

        fn set(&self, celsius: f32) {
            self.reading.set(Ok(celsius));
        }
    }

    impl TemperatureSource for &Probe {
        fn read_celsius(&mut self) -> Result<f32, SensorError> {
            self.reading.get()
        }
    }

    #[derive(Default)]
    struct Inbox {
        pending: RefCell<Deque<Result<Command, ParseError>, 4>>,
    }

    impl Inbox {
        fn send(&self, line: &str) {
            let _ = self.pending.borrow_mut().push_back(Command::parse(line));
        }
    }

    impl CommandChannel for &Inbox {
        fn try_receive(&mut self) -> Option<Result<Command, ParseError>> {
            self.pending.borrow_mut().pop_front()
        }
    }

    #[derive(Default)]
    struct MockGate {
        on: bool,
        pulses: u32,
    }

    impl HeaterOutput for MockGate {
        fn set_on(&mut self, on: bool) {
            if on && !self.on {
                self.pulses += 1;
            }
            self.on = on;
        }

        fn is_on(&self) -> bool {
            self.on
        }
    }

    #[derive(Default)]
    struct CaptureSink {
        records: Vec<LogRecord, 512>,
    }

    impl CaptureSink {
        fn contains(&self, severity: Severity, event: LogEvent) -> bool {
            self.records
                .iter()
                .any(|r| r.severity == severity && r.event == event)
        }
    }

    impl EventSink for CaptureSink {
        fn emit(&mut self, record: &LogRecord) {
            let _ = self.records.push(*record);
        }
    }

    type TestSupervisor<'a> = Supervisor<&'a Clock, MockGate, &'a Probe, &'a Inbox, CaptureSink>;

    fn config(run_on_start: bool) -> ControlConfig {
        let mut config = ControlConfig::default();
        config.autotune.run_on_start = run_on_start;
        config
    }

    fn supervisor<'a>(
        clock: &'a Clock,
        probe: &'a Probe,
        inbox: &'a Inbox,
        config: ControlConfig,
    ) -> TestSupervisor<'a> {
        let mut sup = Supervisor::new(
            clock,
            MockGate::default(),
            probe,
            inbox,
            CaptureSink::default(),
            config,
        )
        .unwrap();
        sup.start();
        sup
    }

    /// Advance simulated time, feeding mains edges, until `until` or a fault
    fn run_until(
        sup: &mut TestSupervisor<'_>,
        clock: &Clock,
        until: Instant,
    ) -> Result<(), FaultKind> {
        let mut now = clock.now.get();
        sup.poll()?;
        while now < until {
            now += STEP;
            clock.now.set(now);
            if clock.mains.get() && now % EDGE_SPACING == 0 {
                clock.edges.set(clock.edges.get() + 1);
            }
            sup.poll()?;
        }
        Ok(())
    }

    fn approx(a: f32, b: f32) -> bool {
        let d = a - b;
        (if d < 0.0 { -d } else { d }) < 0.01
    }

    fn flushed<'s>(sup: &'s mut TestSupervisor<'_>) -> &'s CaptureSink {
        sup.journal.flush();
        sup.journal().sink()
    }

    #[test]
    fn test_start_enters_idle() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        assert_eq!(sup.state(), State::Idle);
        assert!(flushed(&mut sup).contains(
            Severity::Info,
            LogEvent::StateChanged {
                from: State::Boot,
                to: State::Idle
            }
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        let mut bad = config(false);
        bad.phase.max_duty_cycle = 120;
        let result = Supervisor::new(
            &clock,
            MockGate::default(),
            &probe,
            &inbox,
            CaptureSink::default(),
            bad,
        );
        assert!(matches!(result, Err(ConfigError::DutyCeiling)));
    }

    #[test]
    fn test_heater_on_regulates_at_ceiling() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(40.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("HEATER_ON");

        run_until(&mut sup, &clock, SECOND).unwrap();
        assert_eq!(sup.state(), State::Regulating);
        assert!(sup.driver().is_enabled());
        // Large PID output clamped to the 30 % ceiling
        assert_eq!(sup.driver().duty_cycle(), 30.0);
        assert!(sup.driver().gate().pulses > 40);
    }

    #[test]
    fn test_integral_does_not_wind_up_at_ceiling() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(40.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("HEATER_ON");

        // 3 °C below setpoint: kp alone gives 6 %, the integral is reset
        // whenever it pushes the output to the 30 % ceiling
        run_until(&mut sup, &clock, 120 * SECOND).unwrap();
        assert!(sup.regulator().integral() < 270.0);

        // Just above the setpoint, inside the band: output leaves the ceiling
        probe.set(43.3);
        run_until(&mut sup, &clock, 126 * SECOND).unwrap();
        assert_eq!(sup.state(), State::Regulating);
        assert!(sup.driver().is_enabled());
        assert!(sup.driver().duty_cycle() < 30.0);
    }

    #[test]
    fn test_hysteresis_turns_heater_off_above_band() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(40.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("HEATER_ON");
        run_until(&mut sup, &clock, SECOND).unwrap();

        probe.set(43.6);
        run_until(&mut sup, &clock, 6 * SECOND).unwrap();
        assert_eq!(sup.state(), State::Regulating);
        assert!(!sup.driver().is_enabled());

        let pulses = sup.driver().gate().pulses;
        run_until(&mut sup, &clock, 7 * SECOND).unwrap();
        assert_eq!(sup.driver().gate().pulses, pulses);
    }

    #[test]
    fn test_heater_off_returns_to_idle() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(40.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("HEATER_ON");
        run_until(&mut sup, &clock, SECOND).unwrap();
        inbox.send("HEATER_OFF");
        run_until(&mut sup, &clock, 2 * SECOND).unwrap();
        assert_eq!(sup.state(), State::Idle);
        assert!(!sup.driver().is_enabled());
    }

    #[test]
    fn test_setpoint_and_ceiling_commands() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("SET_HEATER_TEMP,45");
        inbox.send("SET_HEATER_DUTY,20");
        inbox.send("SET_HEATER_TEMP,90");
        run_until(&mut sup, &clock, SECOND).unwrap();

        assert_eq!(sup.regulator().setpoint(), 45.0);
        assert_eq!(sup.driver().max_duty_cycle(), 20);
        assert!(flushed(&mut sup).contains(Severity::Degraded, LogEvent::SetpointRejected(90.0)));
    }

    #[test]
    fn test_one_command_per_intake_tick() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("SET_HEATER_TEMP,30");
        inbox.send("SET_HEATER_TEMP,35");
        sup.poll().unwrap();
        assert_eq!(sup.regulator().setpoint(), 30.0);
        run_until(&mut sup, &clock, 100 * MS).unwrap();
        assert_eq!(sup.regulator().setpoint(), 35.0);
    }

    #[test]
    fn test_malformed_command_is_degraded() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("MAKE_COFFEE");
        run_until(&mut sup, &clock, 10 * MS).unwrap();
        assert_eq!(sup.state(), State::Idle);
        assert!(flushed(&mut sup).contains(
            Severity::Degraded,
            LogEvent::CommandRejected(ParseError::UnknownCommand)
        ));
    }

    #[test]
    fn test_lost_mains_halts() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(40.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("HEATER_ON");
        run_until(&mut sup, &clock, SECOND).unwrap();

        clock.mains.set(false);
        let result = run_until(&mut sup, &clock, 2 * SECOND);
        assert_eq!(result, Err(FaultKind::ZeroCrossLost));
        assert_eq!(sup.state(), State::Halted(FaultKind::ZeroCrossLost));
        assert!(!sup.driver().is_enabled());
        assert!(!sup.driver().gate().is_on());
        assert_eq!(sup.next_wake(), None);
        // Already on the sink, no explicit flush needed
        assert!(sup
            .journal()
            .sink()
            .contains(Severity::Fatal, LogEvent::Fault(FaultKind::ZeroCrossLost)));
        assert_eq!(sup.poll(), Err(FaultKind::ZeroCrossLost));
    }

    #[test]
    fn test_over_temperature_halts() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(40.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("HEATER_ON");
        run_until(&mut sup, &clock, SECOND).unwrap();

        probe.set(56.0);
        let result = run_until(&mut sup, &clock, 6 * SECOND);
        assert_eq!(result, Err(FaultKind::OverTemperature));
        assert!(!sup.driver().is_enabled());
    }

    #[test]
    fn test_sensor_retries_then_halts() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        probe.reading.set(Err(SensorError::Disconnected));
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));

        run_until(&mut sup, &clock, 9 * SECOND).unwrap();
        assert_eq!(sup.state(), State::Idle);

        let result = run_until(&mut sup, &clock, 11 * SECOND);
        assert_eq!(result, Err(FaultKind::SensorUnavailable));
        let sink = sup.journal().sink();
        assert!(sink.contains(Severity::Transient, LogEvent::SensorRetry { attempt: 1 }));
        assert!(sink.contains(Severity::Transient, LogEvent::SensorRetry { attempt: 2 }));
    }

    #[test]
    fn test_sensor_recovers_within_budget() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        probe.reading.set(Err(SensorError::ConversionError));
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        run_until(&mut sup, &clock, 6 * SECOND).unwrap();

        probe.set(21.0);
        run_until(&mut sup, &clock, 30 * SECOND).unwrap();
        assert_eq!(sup.state(), State::Idle);
        assert_eq!(sup.safety().temperature(), Some(21.0));
    }

    #[test]
    fn test_tuning_on_start_installs_gains() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(true));
        assert_eq!(sup.state(), State::Tuning);
        assert_eq!(sup.driver().duty_cycle(), 30.0);
        assert!(sup.driver().is_enabled());

        run_until(&mut sup, &clock, 4 * SECOND).unwrap();
        probe.set(20.5);
        run_until(&mut sup, &clock, 9 * SECOND).unwrap();
        assert_eq!(sup.state(), State::Tuning);
        probe.set(20.3);
        run_until(&mut sup, &clock, 11 * SECOND).unwrap();

        assert_eq!(sup.state(), State::Regulating);
        assert!(sup.tuner().is_none());
        let gains = sup.regulator().gains();
        // Ku = 100 * 1.1 * 1.1 * 0.9, Pu = 5 s
        assert!(approx(gains.kp, 0.6 * 108.9));
        assert!(approx(gains.ki, 2.0 * gains.kp / 5.0));
        assert!(approx(gains.kd, gains.kp * 5.0 / 8.0));
    }

    #[test]
    fn test_tuning_over_temperature_halts() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        let mut tuning = config(true);
        tuning.autotune.max_temperature_c = 50.0;
        let mut sup = supervisor(&clock, &probe, &inbox, tuning);
        run_until(&mut sup, &clock, SECOND).unwrap();

        // Below the safety limit, above the tuning limit
        probe.set(52.0);
        let result = run_until(&mut sup, &clock, 6 * SECOND);
        assert_eq!(result, Err(FaultKind::TuningFailed));
        assert!(!sup.driver().is_enabled());
        assert_eq!(sup.driver().duty_cycle(), 0.0);
        assert!(sup.tuner().is_none());
    }

    #[test]
    fn test_heater_off_cancels_tuning() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(true));
        inbox.send("HEATER_OFF");
        run_until(&mut sup, &clock, SECOND).unwrap();
        assert_eq!(sup.state(), State::Idle);
        assert!(sup.tuner().is_none());
        assert_eq!(sup.driver().duty_cycle(), 0.0);
        assert!(!sup.driver().is_enabled());
    }

    #[test]
    fn test_restart_after_fault() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(20.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        assert!(!sup.restart());

        clock.mains.set(false);
        assert!(run_until(&mut sup, &clock, SECOND).is_err());

        clock.mains.set(true);
        assert!(sup.restart());
        assert_eq!(sup.state(), State::Idle);
        assert_eq!(sup.safety().latched(), None);
        let now = clock.now.get();
        run_until(&mut sup, &clock, now + 2 * SECOND).unwrap();

        inbox.send("HEATER_ON");
        run_until(&mut sup, &clock, now + 3 * SECOND).unwrap();
        assert_eq!(sup.state(), State::Regulating);
    }

    #[test]
    fn test_shutdown_flushes_journal() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(40.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("HEATER_ON");
        run_until(&mut sup, &clock, SECOND).unwrap();

        sup.shutdown();
        assert!(sup.journal().is_empty());
        assert!(sup.journal().sink().contains(Severity::Info, LogEvent::Shutdown));
        assert!(!sup.driver().is_enabled());
        assert!(!sup.driver().gate().is_on());
        assert_eq!(sup.next_wake(), None);
    }

    #[test]
    fn test_next_wake_tracks_pulse_deadline() {
        let (clock, probe, inbox) = (Clock::new(), Probe::new(40.0), Inbox::default());
        let mut sup = supervisor(&clock, &probe, &inbox, config(false));
        inbox.send("HEATER_ON");
        run_until(&mut sup, &clock, SECOND).unwrap();

        // Edge at 1 s arms a pulse 7 ms later (30 % duty, 10 ms half-cycle)
        assert_eq!(sup.driver().next_deadline(), Some(SECOND + 7 * MS));
        let wake = sup.next_wake().unwrap();
        assert!(wake <= SECOND + 7 * MS);
    }
}
