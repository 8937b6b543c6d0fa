//! GPIO pin abstractions
//!
//! The scan engine bit-bangs the panel interface, so the only capability it
//! needs is a push-pull output that can be driven high or low quickly.

/// Digital output pin
///
/// Implementations should write the output register directly; the scan
/// engine calls these methods hundreds of times per interrupt.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Drive a single high-then-low pulse (clock or latch strobe)
    fn pulse(&mut self) {
        self.set_high();
        self.set_low();
    }
}

impl<P: OutputPin + ?Sized> OutputPin for &mut P {
    fn set_high(&mut self) {
        (**self).set_high();
    }

    fn set_low(&mut self) {
        (**self).set_low();
    }
}
