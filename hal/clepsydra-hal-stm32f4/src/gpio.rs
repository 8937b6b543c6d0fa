//! Panel output pins

use clepsydra_hal::OutputPin;
use embassy_stm32::gpio::{Level, Output, Pin, Speed};
use embassy_stm32::Peri;

/// Push-pull output for one HUB12 line
///
/// Starts low at maximum slew rate; the shift clock toggles at several MHz.
pub struct PanelPin<'d> {
    output: Output<'d>,
}

impl<'d> PanelPin<'d> {
    pub fn new(pin: Peri<'d, impl Pin>) -> Self {
        Self {
            output: Output::new(pin, Level::Low, Speed::VeryHigh),
        }
    }

    /// Same as [`PanelPin::new`] but with a chosen initial level
    pub fn with_level(pin: Peri<'d, impl Pin>, high: bool) -> Self {
        let level = if high { Level::High } else { Level::Low };
        Self {
            output: Output::new(pin, level, Speed::VeryHigh),
        }
    }
}

impl OutputPin for PanelPin<'_> {
    #[inline]
    fn set_high(&mut self) {
        self.output.set_high();
    }

    #[inline]
    fn set_low(&mut self) {
        self.output.set_low();
    }
}
