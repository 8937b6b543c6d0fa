//! Independent watchdog

use clepsydra_hal::watchdog::{HardwareWatchdog, WatchdogError};
use embassy_stm32::peripherals::IWDG;
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_stm32::Peri;

/// Longest timeout the IWDG reaches with the /256 prescaler on the 32 kHz LSI
pub const MAX_TIMEOUT_MS: u32 = 32_000;

/// IWDG that is configured on first start
///
/// The peripheral is held until [`HardwareWatchdog::start`] consumes it, so
/// a second start reports `AlreadyStarted` instead of reprogramming it.
pub struct Iwdg<'d> {
    peri: Option<Peri<'d, IWDG>>,
    wdg: Option<IndependentWatchdog<'d, IWDG>>,
}

impl<'d> Iwdg<'d> {
    pub fn new(peri: Peri<'d, IWDG>) -> Self {
        Self {
            peri: Some(peri),
            wdg: None,
        }
    }
}

impl HardwareWatchdog for Iwdg<'_> {
    fn start(&mut self, timeout_ms: u32) -> Result<(), WatchdogError> {
        if timeout_ms == 0 || timeout_ms > MAX_TIMEOUT_MS {
            return Err(WatchdogError::InvalidTimeout);
        }
        let peri = self.peri.take().ok_or(WatchdogError::AlreadyStarted)?;

        let mut wdg = IndependentWatchdog::new(peri, timeout_ms * 1000);
        wdg.unleash();
        self.wdg = Some(wdg);
        Ok(())
    }

    fn feed(&mut self) {
        if let Some(wdg) = self.wdg.as_mut() {
            wdg.pet();
        }
    }
}
