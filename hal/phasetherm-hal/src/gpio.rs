//! GPIO pin abstractions

/// Digital output pin
///
/// Drives the triac gate (through an optocoupler) on the heater board.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific level
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently driven high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently driven low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LatchPin {
        high: bool,
        writes: u32,
    }

    impl OutputPin for LatchPin {
        fn set_high(&mut self) {
            self.high = true;
            self.writes += 1;
        }

        fn set_low(&mut self) {
            self.high = false;
            self.writes += 1;
        }

        fn is_set_high(&self) -> bool {
            self.high
        }
    }

    #[test]
    fn test_set_state_dispatches() {
        let mut pin = LatchPin {
            high: false,
            writes: 0,
        };

        pin.set_state(true);
        assert!(pin.is_set_high());
        pin.set_state(false);
        assert!(pin.is_set_low());
        assert_eq!(pin.writes, 2);
    }
}
