//! Hardware watchdog abstraction
//!
//! The watchdog is the only recovery path for a wedged task: once started
//! it must be fed before its window elapses or the chip resets.

/// Errors from watchdog operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogError {
    /// The peripheral was already consumed by an earlier start
    AlreadyStarted,
    /// Requested timeout cannot be represented by the hardware
    InvalidTimeout,
}

/// Independent hardware watchdog
///
/// Once started, a hardware watchdog cannot be stopped.
pub trait HardwareWatchdog {
    /// Configure the countdown window and start the watchdog
    fn start(&mut self, timeout_ms: u32) -> Result<(), WatchdogError>;

    /// Reload the countdown
    fn feed(&mut self);
}
