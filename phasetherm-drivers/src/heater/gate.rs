//! Triac gate output
//!
//! Drives the triac gate (usually through an opto-triac) from a GPIO pin.
//! The pin can be active-high or active-low.

use phasetherm_core::traits::HeaterOutput;
use phasetherm_hal::OutputPin;

/// GPIO gate output
pub struct GateOutput<P> {
    pin: P,
    /// If true, gate asserted = pin LOW
    inverted: bool,
    /// Current logical state (true = gate asserted)
    on: bool,
    /// Rising edges driven so far
    pulses: u32,
}

impl<P: OutputPin> GateOutput<P> {
    /// Create a new gate output, released
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin to control
    /// - `inverted`: If true, the gate is asserted when the pin is LOW
    pub fn new(pin: P, inverted: bool) -> Self {
        let mut gate = Self {
            pin,
            inverted,
            on: false,
            pulses: 0,
        };
        gate.set_on(false);
        gate
    }

    /// Create a gate with active-high output
    pub fn new_active_high(pin: P) -> Self {
        Self::new(pin, false)
    }

    /// Create a gate with active-low output
    pub fn new_active_low(pin: P) -> Self {
        Self::new(pin, true)
    }

    /// Number of pulses issued
    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    /// Access the pin
    pub fn pin(&self) -> &P {
        &self.pin
    }
}

impl<P: OutputPin> HeaterOutput for GateOutput<P> {
    fn set_on(&mut self, on: bool) {
        if on && !self.on {
            self.pulses = self.pulses.wrapping_add(1);
        }
        self.on = on;
        // on != inverted: high for active-high, low for active-low
        self.pin.set_state(on != self.inverted);
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// Adapter from an `embedded-hal` output pin
///
/// `embedded-hal` pins report errors and need `&mut self` to read back
/// their state, so the adapter tracks the last written level itself.
/// Write errors are dropped; on-chip GPIO is infallible.
pub struct EmbeddedPin<P> {
    pin: P,
    high: bool,
}

impl<P: embedded_hal::digital::OutputPin> EmbeddedPin<P> {
    /// Wrap a pin, driving it low
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_low();
        Self { pin, high: false }
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: embedded_hal::digital::OutputPin> OutputPin for EmbeddedPin<P> {
    fn set_high(&mut self) {
        let _ = self.pin.set_high();
        self.high = true;
    }

    fn set_low(&mut self) {
        let _ = self.pin.set_low();
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}
