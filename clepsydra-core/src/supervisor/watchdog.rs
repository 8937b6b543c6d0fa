//! Arm-once wrapper around the hardware watchdog

use clepsydra_hal::watchdog::WatchdogError;
use clepsydra_hal::HardwareWatchdog;

/// Hardware watchdog that is armed at most once and ignores feeds before
pub struct Watchdog<H: HardwareWatchdog> {
    hw: H,
    armed: bool,
}

impl<H: HardwareWatchdog> Watchdog<H> {
    pub fn new(hw: H) -> Self {
        Self { hw, armed: false }
    }

    /// Start the hardware countdown
    ///
    /// Later calls are ignored: the hardware cannot be reconfigured once
    /// running.
    pub fn init(&mut self, timeout_ms: u32) -> Result<(), WatchdogError> {
        if self.armed {
            return Ok(());
        }
        self.hw.start(timeout_ms)?;
        self.armed = true;
        Ok(())
    }

    /// Reload the countdown; no-op until armed
    pub fn kick(&mut self) {
        if self.armed {
            self.hw.feed();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn inner(&self) -> &H {
        &self.hw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingWatchdog {
        starts: u32,
        feeds: u32,
        reject: bool,
    }

    impl HardwareWatchdog for CountingWatchdog {
        fn start(&mut self, _timeout_ms: u32) -> Result<(), WatchdogError> {
            if self.reject {
                return Err(WatchdogError::InvalidTimeout);
            }
            self.starts += 1;
            Ok(())
        }

        fn feed(&mut self) {
            self.feeds += 1;
        }
    }

    #[test]
    fn test_kick_before_init_is_ignored() {
        let mut watchdog = Watchdog::new(CountingWatchdog::default());
        watchdog.kick();
        assert_eq!(watchdog.inner().feeds, 0);
        assert!(!watchdog.is_armed());
    }

    #[test]
    fn test_init_once() {
        let mut watchdog = Watchdog::new(CountingWatchdog::default());
        watchdog.init(6000).unwrap();
        watchdog.init(1000).unwrap();
        assert_eq!(watchdog.inner().starts, 1);

        watchdog.kick();
        watchdog.kick();
        assert_eq!(watchdog.inner().feeds, 2);
    }

    #[test]
    fn test_failed_start_stays_unarmed() {
        let mut watchdog = Watchdog::new(CountingWatchdog {
            reject: true,
            ..Default::default()
        });
        assert_eq!(watchdog.init(0), Err(WatchdogError::InvalidTimeout));
        watchdog.kick();
        assert!(!watchdog.is_armed());
        assert_eq!(watchdog.inner().feeds, 0);
    }
}
