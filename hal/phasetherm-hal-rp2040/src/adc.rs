//! Thermistor ADC channel
//!
//! RP2040 has a single 12-bit ADC with 4 external channels:
//! - ADC0: GPIO26
//! - ADC1: GPIO27
//! - ADC2: GPIO28
//! - ADC3: GPIO29
//!
//! The control loop reads the probe synchronously inside the maintain
//! task, so the blocking driver is used.

use embassy_rp::adc::{Adc, Blocking, Channel};

use phasetherm_core::traits::{AdcReader, SensorError};

/// One ADC channel dedicated to the vessel thermistor
pub struct ThermistorAdc<'d> {
    adc: Adc<'d, Blocking>,
    channel: Channel<'d>,
}

impl<'d> ThermistorAdc<'d> {
    pub fn new(adc: Adc<'d, Blocking>, channel: Channel<'d>) -> Self {
        Self { adc, channel }
    }
}

impl AdcReader for ThermistorAdc<'_> {
    fn read(&mut self) -> Result<u16, SensorError> {
        self.adc
            .blocking_read(&mut self.channel)
            .map_err(|_| SensorError::ConversionError)
    }
}
