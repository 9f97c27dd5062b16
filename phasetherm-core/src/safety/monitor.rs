//! Safety monitor implementation
//!
//! Tracks the temperature probe and any fault reported by the other
//! subsystems. Once a fault is seen it stays latched until `clear`.

use crate::config::SafetyConfig;
use crate::state::FaultKind;

/// Safety condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    /// All conditions normal
    Ok,
    /// Safety condition violated
    Fault(FaultKind),
}

/// Safety monitor for fault detection
#[derive(Debug, Clone)]
pub struct SafetyMonitor {
    /// Fatal temperature limit (°C)
    max_temperature_c: f32,
    /// Last temperature reading (°C)
    last_temp_c: Option<f32>,
    /// Probe reported a valid reading last time
    sensor_valid: bool,
    /// First fault seen since the last clear
    latched: Option<FaultKind>,
}

impl Default for SafetyMonitor {
    fn default() -> Self {
        Self::new(&SafetyConfig::default())
    }
}

impl SafetyMonitor {
    /// Create a new safety monitor
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            max_temperature_c: config.max_temperature_c,
            last_temp_c: None,
            sensor_valid: true,
            latched: None,
        }
    }

    /// Update temperature reading
    ///
    /// `None` means the probe failed past its retry budget.
    pub fn update_temperature(&mut self, temp_c: Option<f32>) {
        self.last_temp_c = temp_c;
        self.sensor_valid = temp_c.is_some();
    }

    /// Report a fault detected elsewhere
    pub fn trip(&mut self, kind: FaultKind) {
        if self.latched.is_none() {
            self.latched = Some(kind);
        }
    }

    /// Check all safety conditions
    ///
    /// A latched fault wins over fresh readings. A NaN reading counts as
    /// over-temperature.
    pub fn check(&mut self) -> SafetyStatus {
        if let Some(kind) = self.latched {
            return SafetyStatus::Fault(kind);
        }

        let fault = if !self.sensor_valid {
            Some(FaultKind::SensorUnavailable)
        } else {
            match self.last_temp_c {
                Some(t) if !(t < self.max_temperature_c) => Some(FaultKind::OverTemperature),
                _ => None,
            }
        };

        match fault {
            Some(kind) => {
                self.latched = Some(kind);
                SafetyStatus::Fault(kind)
            }
            None => SafetyStatus::Ok,
        }
    }

    /// Forget the latched fault and the last reading
    pub fn clear(&mut self) {
        self.latched = None;
        self.last_temp_c = None;
        self.sensor_valid = true;
    }

    /// Latched fault, if any
    pub fn latched(&self) -> Option<FaultKind> {
        self.latched
    }

    /// Last temperature reading
    pub fn temperature(&self) -> Option<f32> {
        self.last_temp_c
    }
}
