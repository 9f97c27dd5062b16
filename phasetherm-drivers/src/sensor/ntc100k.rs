//! NTC 100K thermistor probe
//!
//! Vessel probe read through a voltage divider on an ADC channel.
//! Temperature comes from a lookup table with linear interpolation, so no
//! logarithm is needed on the target.

use phasetherm_core::traits::{AdcReader, SensorError, TemperatureSource};

/// NTC 100K thermistor lookup table
///
/// Table format: (resistance_ohms, temperature_c)
/// Generated using beta equation with:
/// - R0 = 100,000 ohms at T0 = 25°C
/// - Beta = 3950K
///
/// Temperature range: -20°C to 150°C
const TEMP_TABLE: &[(u32, f32)] = &[
    (1_750_000, -20.0),
    (1_000_000, -10.0),
    (600_000, 0.0),
    (350_000, 10.0),
    (200_000, 20.0),
    (100_000, 25.0), // R0
    (80_000, 30.0),
    (55_000, 40.0),
    (40_000, 45.0),
    (30_000, 50.0),
    (25_000, 55.0), // safety limit
    (18_000, 60.0),
    (12_000, 70.0),
    (8_000, 80.0),
    (5_500, 90.0),
    (4_000, 100.0),
    (2_000, 120.0),
    (1_000, 150.0),
];

/// Readings this close to either rail mean a broken divider
const RAIL_MARGIN: u16 = 10;

/// NTC 100K thermistor with B=3950
pub struct Ntc100kSensor<ADC> {
    adc: ADC,
    /// Pull-up resistor value in ohms
    pullup_ohms: u32,
    /// ADC full scale (4096 for 12-bit)
    adc_max: u16,
}

impl<ADC> Ntc100kSensor<ADC> {
    /// Create a new NTC sensor
    ///
    /// # Arguments
    /// - `adc`: ADC channel for reading thermistor
    /// - `pullup_ohms`: Pull-up resistor value (typically 4700 for 3.3V systems)
    pub fn new(adc: ADC, pullup_ohms: u32) -> Self {
        Self {
            adc,
            pullup_ohms,
            adc_max: 4096,
        }
    }

    /// Convert ADC reading to thermistor resistance
    ///
    /// Circuit: VCC -- pullup -- ADC_PIN -- NTC -- GND
    /// R_ntc = R_pullup * adc_value / (adc_max - adc_value)
    pub fn adc_to_resistance(&self, adc_value: u16) -> Result<u32, SensorError> {
        if adc_value >= self.adc_max - RAIL_MARGIN {
            return Err(SensorError::Disconnected);
        }
        if adc_value < RAIL_MARGIN {
            return Err(SensorError::ShortCircuit);
        }

        let numerator = u64::from(self.pullup_ohms) * u64::from(adc_value);
        let denominator = u64::from(self.adc_max - adc_value);
        u32::try_from(numerator / denominator).map_err(|_| SensorError::OutOfRange)
    }

    /// Temperature in °C for a thermistor resistance
    pub fn resistance_to_celsius(resistance: u32) -> Result<f32, SensorError> {
        let (first, last) = match (TEMP_TABLE.first(), TEMP_TABLE.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(SensorError::OutOfRange),
        };
        if resistance > first.0 || resistance < last.0 {
            return Err(SensorError::OutOfRange);
        }

        // Sorted by decreasing resistance (increasing temperature)
        TEMP_TABLE
            .windows(2)
            .find(|pair| resistance <= pair[0].0 && resistance >= pair[1].0)
            .map(|pair| {
                let (r_high, t_low) = pair[0];
                let (r_low, t_high) = pair[1];
                let fraction = (r_high - resistance) as f32 / (r_high - r_low) as f32;
                t_low + (t_high - t_low) * fraction
            })
            .ok_or(SensorError::OutOfRange)
    }
}

impl<ADC: AdcReader> TemperatureSource for Ntc100kSensor<ADC> {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let adc_value = self.adc.read()?;
        let resistance = self.adc_to_resistance(adc_value)?;
        Self::resistance_to_celsius(resistance)
    }
}
