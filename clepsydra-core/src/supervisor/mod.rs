//! Liveness supervision
//!
//! Every task stamps its slot in the [`LivenessTable`] each loop. The
//! [`Supervisor`] is the only code that feeds the hardware watchdog, and it
//! does so only while every slot is fresh. A wedged task therefore ends in
//! a watchdog reset rather than a silently frozen display.

pub mod liveness;
pub mod watchdog;

use clepsydra_hal::HardwareWatchdog;

pub use liveness::{liveness_threshold, LivenessTable, Subsystem};
pub use watchdog::Watchdog;

/// Default supervisor period
pub const SUPERVISOR_PERIOD_MS: u32 = 250;

/// Longest any task loop waits before stamping its slot again
pub const TASK_KEEPALIVE_MS: u32 = 250;

/// Result of one supervisor step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupervisorStatus {
    /// All subsystems fresh, watchdog fed
    Healthy,
    /// Watchdog starved because this subsystem went quiet
    Stale {
        subsystem: Subsystem,
        age_ms: u32,
    },
}

/// Watchdog gate driven by the liveness table
pub struct Supervisor<'a, H: HardwareWatchdog> {
    table: &'a LivenessTable,
    watchdog: Watchdog<H>,
    threshold_ms: u32,
}

impl<'a, H: HardwareWatchdog> Supervisor<'a, H> {
    /// Create a supervisor for a watchdog armed with `timeout_ms`
    pub fn new(table: &'a LivenessTable, watchdog: Watchdog<H>, timeout_ms: u32) -> Self {
        Self {
            table,
            watchdog,
            threshold_ms: liveness_threshold(timeout_ms),
        }
    }

    /// Age above which a subsystem counts as stale
    pub fn threshold_ms(&self) -> u32 {
        self.threshold_ms
    }

    /// Run one supervision cycle at `now_ms`
    pub fn step(&mut self, now_ms: u32) -> SupervisorStatus {
        self.table.kick(Subsystem::Supervisor, now_ms);

        match self.table.first_stale(now_ms, self.threshold_ms) {
            None => {
                self.watchdog.kick();
                SupervisorStatus::Healthy
            }
            Some(subsystem) => SupervisorStatus::Stale {
                subsystem,
                age_ms: self.table.age(subsystem, now_ms),
            },
        }
    }

    /// Access the wrapped watchdog
    pub fn watchdog(&self) -> &Watchdog<H> {
        &self.watchdog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clepsydra_hal::watchdog::WatchdogError;

    #[derive(Default)]
    struct MockWatchdog {
        started: Option<u32>,
        feeds: u32,
    }

    impl HardwareWatchdog for MockWatchdog {
        fn start(&mut self, timeout_ms: u32) -> Result<(), WatchdogError> {
            self.started = Some(timeout_ms);
            Ok(())
        }

        fn feed(&mut self) {
            self.feeds += 1;
        }
    }

    fn armed(timeout_ms: u32) -> Watchdog<MockWatchdog> {
        let mut watchdog = Watchdog::new(MockWatchdog::default());
        watchdog.init(timeout_ms).unwrap();
        watchdog
    }

    fn kick_workers(table: &LivenessTable, now_ms: u32) {
        table.kick(Subsystem::Modbus, now_ms);
        table.kick(Subsystem::Logger, now_ms);
        table.kick(Subsystem::Display, now_ms);
    }

    #[test]
    fn test_fresh_subsystems_feed_every_cycle() {
        let table = LivenessTable::new();
        let mut supervisor = Supervisor::new(&table, armed(6000), 6000);

        for cycle in 0..20u32 {
            let now = cycle * SUPERVISOR_PERIOD_MS;
            kick_workers(&table, now);
            assert_eq!(supervisor.step(now), SupervisorStatus::Healthy);
        }
        assert_eq!(supervisor.watchdog().inner().feeds, 20);
    }

    #[test]
    fn test_silent_subsystem_starves_watchdog() {
        let table = LivenessTable::new();
        let mut supervisor = Supervisor::new(&table, armed(6000), 6000);
        assert_eq!(supervisor.threshold_ms(), 5000);

        kick_workers(&table, 0);
        assert_eq!(supervisor.step(0), SupervisorStatus::Healthy);

        // Display stops reporting, the others keep going
        for now in (250..=5000).step_by(250) {
            table.kick(Subsystem::Modbus, now);
            table.kick(Subsystem::Logger, now);
            let status = supervisor.step(now);
            if now < 5000 {
                assert_eq!(status, SupervisorStatus::Healthy);
            } else {
                assert_eq!(
                    status,
                    SupervisorStatus::Stale {
                        subsystem: Subsystem::Display,
                        age_ms: 5000
                    }
                );
            }
        }

        let fed = supervisor.watchdog().inner().feeds;
        assert_eq!(supervisor.step(5250), SupervisorStatus::Stale {
            subsystem: Subsystem::Display,
            age_ms: 5250
        });
        assert_eq!(supervisor.watchdog().inner().feeds, fed);
    }

    #[test]
    fn test_keepalive_paced_tasks_survive_tightest_timeout() {
        // Shortest timeout whose threshold still clears the task keepalive
        let timeout = (TASK_KEEPALIVE_MS + 1) * 2;
        let mut config = crate::config::DeviceConfig::default();
        config.watchdog.timeout_ms = timeout;
        config.watchdog.supervisor_period_ms = 100;
        config.log.sample_period_ms = TASK_KEEPALIVE_MS;
        assert!(config.validate().is_ok());

        config.watchdog.timeout_ms = timeout - 2;
        assert!(config.validate().is_err());

        // Workers stamp only when a bounded wait runs out
        let table = LivenessTable::new();
        let mut supervisor = Supervisor::new(&table, armed(timeout), timeout);
        for now in (0..10 * TASK_KEEPALIVE_MS).step_by(10) {
            if now % TASK_KEEPALIVE_MS == 0 {
                kick_workers(&table, now);
            }
            assert_eq!(supervisor.step(now), SupervisorStatus::Healthy);
        }
    }

    #[test]
    fn test_unarmed_watchdog_not_fed() {
        let table = LivenessTable::new();
        let mut supervisor = Supervisor::new(&table, Watchdog::new(MockWatchdog::default()), 6000);
        kick_workers(&table, 0);
        assert_eq!(supervisor.step(0), SupervisorStatus::Healthy);
        assert_eq!(supervisor.watchdog().inner().feeds, 0);
    }

    #[test]
    fn test_tick_wraparound() {
        let table = LivenessTable::new();
        let mut supervisor = Supervisor::new(&table, armed(6000), 6000);

        let before_wrap = u32::MAX - 100;
        kick_workers(&table, before_wrap);
        assert_eq!(supervisor.step(before_wrap), SupervisorStatus::Healthy);

        let after_wrap = 400;
        assert_eq!(supervisor.step(after_wrap), SupervisorStatus::Healthy);
        assert_eq!(table.age(Subsystem::Modbus, after_wrap), 501);
    }
}
