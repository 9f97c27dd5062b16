//! Hysteresis gate for on/off supplementary control
//!
//! Sits above the PID output: the heater is switched on below
//! `setpoint - band` and off at or above `setpoint + band`. Inside the band
//! the previous decision holds, which keeps the output from chattering
//! around the setpoint.

/// On/off decision with a deadband
#[derive(Debug, Clone)]
pub struct HysteresisGate {
    band_c: f32,
    heating: bool,
}

impl HysteresisGate {
    /// Create a gate that starts in the off state
    pub fn new(band_c: f32) -> Self {
        Self {
            band_c,
            heating: false,
        }
    }

    /// Feed a reading and return whether heating is allowed
    pub fn update(&mut self, measured_c: f32, setpoint_c: f32) -> bool {
        if measured_c < setpoint_c - self.band_c {
            self.heating = true;
        } else if measured_c >= setpoint_c + self.band_c {
            self.heating = false;
        }
        // Inside the band: keep the previous decision
        self.heating
    }

    /// Current decision
    pub fn is_heating(&self) -> bool {
        self.heating
    }

    /// Forget the previous decision
    pub fn reset(&mut self) {
        self.heating = false;
    }
}
