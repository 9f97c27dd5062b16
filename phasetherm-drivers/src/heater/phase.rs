//! Phase-control firing driver
//!
//! Converts a duty cycle into one gate pulse per mains half-cycle, delayed
//! from the zero-cross edge so that only the tail of the half-wave is
//! conducted:
//!
//! ```text
//!  edge                        edge
//!   |<------- half-cycle ------>|
//!   |<-- phase delay -->|_|     |
//!                       pulse
//! ```
//!
//! `phase_delay = (1 - duty / 100) * half_cycle`. The half-cycle estimate is
//! derived from the spacing of accepted edges. Edges closer together than
//! the debounce window (10 % of the estimate), or implying a half-cycle
//! shorter than the configured minimum, are rejected as noise, so the
//! estimate never collapses towards zero.
//!
//! The driver never blocks: `observe_edge` arms a pulse deadline and
//! `service` asserts and releases the gate when the deadlines pass.

use phasetherm_core::config::{PhaseConfig, FULL_POWER};
use phasetherm_core::error::Severity;
use phasetherm_core::journal::{EventLog, LogEvent};
use phasetherm_core::state::FaultKind;
use phasetherm_core::traits::{DutyActuator, HeaterOutput};
use phasetherm_core::Instant;
use phasetherm_hal::{edges_between, ZeroCrossTimer};

/// Debounce window as a fraction of the half-cycle estimate
const DEBOUNCE_DIVISOR: u32 = 10;

/// Phase delay in µs for a duty cycle and half-cycle length
///
/// Duty is clamped to `[0, 100]`, so the result always lies in
/// `[0, half_cycle_us]`.
pub fn phase_delay_us(duty_cycle: f32, half_cycle_us: u32) -> u32 {
    let duty = if duty_cycle.is_nan() {
        0.0
    } else {
        duty_cycle.clamp(0.0, FULL_POWER as f32)
    };
    let delay = (1.0 - duty / FULL_POWER as f32) * half_cycle_us as f32;
    (delay as u32).min(half_cycle_us)
}

/// Heater state owned by the driver
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeaterState {
    duty_cycle: f32,
    max_duty_cycle: u8,
    enabled: bool,
    half_cycle_us: u32,
    debounce_us: u32,
    last_edge: Option<Instant>,
}

impl HeaterState {
    fn new(config: &PhaseConfig) -> Self {
        Self {
            duty_cycle: 0.0,
            max_duty_cycle: config.max_duty_cycle.min(FULL_POWER),
            enabled: false,
            half_cycle_us: config.default_half_cycle_us,
            debounce_us: config.default_half_cycle_us / DEBOUNCE_DIVISOR,
            last_edge: None,
        }
    }

    /// Actuated duty cycle (%)
    pub fn duty_cycle(&self) -> f32 {
        self.duty_cycle
    }

    /// Safety ceiling (%)
    pub fn max_duty_cycle(&self) -> u8 {
        self.max_duty_cycle
    }

    /// Firing enabled
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Half-cycle estimate (µs)
    pub fn half_cycle_us(&self) -> u32 {
        self.half_cycle_us
    }

    /// Minimum spacing between accepted edges (µs)
    pub fn debounce_us(&self) -> u32 {
        self.debounce_us
    }

    /// Time of the last accepted edge
    pub fn last_edge(&self) -> Option<Instant> {
        self.last_edge
    }
}

/// Pulse timing within the current half-cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Firing {
    Idle,
    Armed { fire_at: Instant },
    Pulsing { release_at: Instant },
}

/// Result of one edge observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeOutcome {
    /// Edge count unchanged
    NoEdge,
    /// Edge accepted; `coalesced` edges arrived since the last observation
    Accepted { coalesced: u32 },
    /// Edge inside the debounce window
    Rejected,
}

/// Zero-cross synchronized phase-control driver
pub struct PhaseControlDriver<G> {
    gate: G,
    pulse_width_us: u32,
    fault_timeout_us: u32,
    default_half_cycle_us: u32,
    min_half_cycle_us: u32,
    state: HeaterState,
    firing: Firing,
    /// Edge count at the last observation, `None` until the first poll
    edge_count: Option<u32>,
    /// Start of the current watchdog window
    watchdog_from: Instant,
    faulted: bool,
}

impl<G: HeaterOutput> PhaseControlDriver<G> {
    /// Create a driver with the gate released and firing disabled
    pub fn new(mut gate: G, config: &PhaseConfig, now: Instant) -> Self {
        gate.set_on(false);
        Self {
            gate,
            pulse_width_us: config.pulse_width_us,
            fault_timeout_us: config.fault_timeout_us,
            default_half_cycle_us: config.default_half_cycle_us,
            min_half_cycle_us: config.min_half_cycle_us.max(1),
            state: HeaterState::new(config),
            firing: Firing::Idle,
            edge_count: None,
            watchdog_from: now,
            faulted: false,
        }
    }

    /// Observe the zero-cross timer and service the gate
    pub fn poll<T: ZeroCrossTimer>(
        &mut self,
        timer: &T,
        log: &mut dyn EventLog,
    ) -> Result<EdgeOutcome, FaultKind> {
        let now = timer.now();
        let outcome = self.observe_edge(timer.edge_count(), now, log);
        self.service(now);
        self.check_watchdog(now)?;
        Ok(outcome)
    }

    /// Process the edge counter read at `now`
    pub fn observe_edge(
        &mut self,
        count: u32,
        now: Instant,
        log: &mut dyn EventLog,
    ) -> EdgeOutcome {
        let Some(previous) = self.edge_count else {
            self.edge_count = Some(count);
            return EdgeOutcome::NoEdge;
        };
        let advanced = edges_between(previous, count);
        if advanced == 0 {
            return EdgeOutcome::NoEdge;
        }
        // Rejected edges are consumed too, or the next poll would see them again
        self.edge_count = Some(count);

        if let Some(last) = self.state.last_edge {
            let cycle_us = now.saturating_sub(last);
            let floor_us = u64::from(self.min_half_cycle_us) * 2;
            if cycle_us < u64::from(self.state.debounce_us) || cycle_us < floor_us {
                log.record(Severity::Transient, LogEvent::EdgeRejected);
                return EdgeOutcome::Rejected;
            }
            if advanced > 1 {
                log.record(Severity::Transient, LogEvent::EdgesCoalesced(advanced));
            }
            let half = u32::try_from(cycle_us / 2).unwrap_or(u32::MAX);
            self.state.half_cycle_us = half;
            self.state.debounce_us = half / DEBOUNCE_DIVISOR;
            self.arm(now);
        }

        self.state.last_edge = Some(now);
        self.watchdog_from = now;
        EdgeOutcome::Accepted {
            coalesced: advanced,
        }
    }

    fn arm(&mut self, edge_at: Instant) {
        if let Firing::Pulsing { .. } = self.firing {
            self.gate.set_on(false);
        }
        self.firing = if self.state.enabled && self.state.duty_cycle > 0.0 && !self.faulted {
            let delay = phase_delay_us(self.state.duty_cycle, self.state.half_cycle_us);
            Firing::Armed {
                fire_at: edge_at + u64::from(delay),
            }
        } else {
            Firing::Idle
        };
    }

    /// Assert or release the gate when a pulse deadline has passed
    pub fn service(&mut self, now: Instant) {
        match self.firing {
            Firing::Armed { fire_at } if now >= fire_at => {
                self.gate.set_on(true);
                self.firing = Firing::Pulsing {
                    release_at: now + u64::from(self.pulse_width_us),
                };
            }
            Firing::Pulsing { release_at } if now >= release_at => {
                self.gate.set_on(false);
                self.firing = Firing::Idle;
            }
            _ => {}
        }
    }

    /// Fail if no edge was accepted within the fault timeout
    ///
    /// On timeout firing is disabled and the gate released; a stale
    /// half-cycle estimate is never used to fire blind.
    pub fn check_watchdog(&mut self, now: Instant) -> Result<(), FaultKind> {
        if self.faulted {
            return Err(FaultKind::ZeroCrossLost);
        }
        if now.saturating_sub(self.watchdog_from) > u64::from(self.fault_timeout_us) {
            self.faulted = true;
            self.shutdown();
            return Err(FaultKind::ZeroCrossLost);
        }
        Ok(())
    }

    /// Next pulse deadline, if a pulse is armed or in progress
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.firing {
            Firing::Idle => None,
            Firing::Armed { fire_at } => Some(fire_at),
            Firing::Pulsing { release_at } => Some(release_at),
        }
    }

    /// Disable firing and release the gate immediately
    pub fn shutdown(&mut self) {
        self.state.enabled = false;
        self.firing = Firing::Idle;
        self.gate.set_on(false);
    }

    /// Forget edge history and the fault latch after a restart
    ///
    /// Duty cycle and ceiling are kept; firing stays disabled.
    pub fn reset(&mut self, now: Instant) {
        self.shutdown();
        self.faulted = false;
        self.edge_count = None;
        self.watchdog_from = now;
        self.state.last_edge = None;
        self.state.half_cycle_us = self.default_half_cycle_us;
        self.state.debounce_us = self.default_half_cycle_us / DEBOUNCE_DIVISOR;
    }

    /// Change the safety ceiling, clamping the current duty cycle to it
    pub fn set_max_duty_cycle(&mut self, percent: u8, log: &mut dyn EventLog) -> u8 {
        let ceiling = percent.min(FULL_POWER);
        if ceiling != percent {
            log.record(
                Severity::Degraded,
                LogEvent::DutyClamped {
                    requested: percent as f32,
                    applied: ceiling as f32,
                },
            );
        }
        self.state.max_duty_cycle = ceiling;
        log.record(Severity::Info, LogEvent::MaxDutyChanged(ceiling));

        let limit = ceiling as f32;
        if self.state.duty_cycle > limit {
            log.record(
                Severity::Degraded,
                LogEvent::DutyClamped {
                    requested: self.state.duty_cycle,
                    applied: limit,
                },
            );
            self.state.duty_cycle = limit;
            log.record(Severity::Info, LogEvent::DutyChanged(limit));
        }
        ceiling
    }

    /// Phase delay for the current duty cycle and half-cycle estimate (µs)
    pub fn phase_delay_us(&self) -> u32 {
        phase_delay_us(self.state.duty_cycle, self.state.half_cycle_us)
    }

    /// Driver state
    pub fn state(&self) -> &HeaterState {
        &self.state
    }

    /// Check if the zero-cross watchdog has fired
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Access the gate output
    pub fn gate(&self) -> &G {
        &self.gate
    }
}

impl<G: HeaterOutput> DutyActuator for PhaseControlDriver<G> {
    fn set_duty_cycle(&mut self, percent: f32, log: &mut dyn EventLog) -> f32 {
        let limit = self.state.max_duty_cycle as f32;
        let applied = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, limit)
        };
        if applied != percent {
            log.record(
                Severity::Degraded,
                LogEvent::DutyClamped {
                    requested: percent,
                    applied,
                },
            );
        }
        if applied != self.state.duty_cycle {
            self.state.duty_cycle = applied;
            log.record(Severity::Info, LogEvent::DutyChanged(applied));
        }
        applied
    }

    fn duty_cycle(&self) -> f32 {
        self.state.duty_cycle
    }

    fn max_duty_cycle(&self) -> u8 {
        self.state.max_duty_cycle
    }

    fn turn_on(&mut self, log: &mut dyn EventLog) {
        if self.faulted || self.state.enabled {
            return;
        }
        self.state.enabled = true;
        log.record(Severity::Info, LogEvent::HeaterEnabled);
    }

    // An already armed pulse still fires; the next edge sees `enabled == false`.
    fn turn_off(&mut self, log: &mut dyn EventLog) {
        if !self.state.enabled {
            return;
        }
        self.state.enabled = false;
        log.record(Severity::Info, LogEvent::HeaterDisabled);
    }

    fn is_enabled(&self) -> bool {
        self.state.enabled
    }
}
