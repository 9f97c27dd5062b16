//! Heater actuation and temperature sensing traits

use crate::journal::EventLog;

/// Errors that can occur with temperature sensing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Probe disconnected or not responding
    Disconnected,
    /// Probe shorted
    ShortCircuit,
    /// Reading outside the plausible range
    OutOfRange,
    /// ADC or bus conversion failed
    ConversionError,
}

/// Source of the vessel temperature
///
/// Implementations wrap a concrete probe (NTC thermistor, DS18B20, ...).
pub trait TemperatureSource {
    /// Read the current temperature in degrees Celsius
    ///
    /// Takes `&mut self` because bus and ADC reads need mutable access.
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

/// Raw ADC channel behind an analog temperature probe
pub trait AdcReader {
    /// Read one conversion (12-bit, 0-4095)
    ///
    /// A failed conversion is reported as [`SensorError::ConversionError`].
    fn read(&mut self) -> Result<u16, SensorError>;
}

/// Firing output line (triac gate through an optocoupler)
pub trait HeaterOutput {
    /// Assert or release the gate
    fn set_on(&mut self, on: bool);

    /// Check if the gate is currently asserted
    fn is_on(&self) -> bool;
}

/// Duty-cycle setter shared by the regulator and the auto-tuner
///
/// The implementor owns the heater state; callers only ever read the
/// ceiling and write the duty cycle through here, so the clamp invariant
/// `0 <= duty_cycle <= max_duty_cycle` cannot be bypassed.
pub trait DutyActuator {
    /// Request a duty cycle in percent
    ///
    /// Out-of-range requests are clamped and logged, never rejected.
    /// Returns the value actually stored.
    fn set_duty_cycle(&mut self, percent: f32, log: &mut dyn EventLog) -> f32;

    /// Currently stored duty cycle in percent
    fn duty_cycle(&self) -> f32;

    /// Configured safety ceiling in percent
    fn max_duty_cycle(&self) -> u8;

    /// Enable firing
    fn turn_on(&mut self, log: &mut dyn EventLog);

    /// Disable firing from the next half-cycle boundary
    fn turn_off(&mut self, log: &mut dyn EventLog);

    /// Check if firing is enabled
    fn is_enabled(&self) -> bool;
}
