//! Per-subsystem "last alive" timestamps

use portable_atomic::{AtomicU32, Ordering};

/// Monitored subsystems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Subsystem {
    Modbus,
    Logger,
    Display,
    Supervisor,
}

impl Subsystem {
    /// Number of monitored subsystems
    pub const COUNT: usize = 4;

    /// All subsystems in check order
    pub const ALL: [Subsystem; Self::COUNT] = [
        Subsystem::Modbus,
        Subsystem::Logger,
        Subsystem::Display,
        Subsystem::Supervisor,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Short name for logs
    pub fn name(self) -> &'static str {
        match self {
            Subsystem::Modbus => "modbus",
            Subsystem::Logger => "logger",
            Subsystem::Display => "display",
            Subsystem::Supervisor => "supervisor",
        }
    }
}

/// Age at which a subsystem is considered stale for a given watchdog timeout
///
/// Leaves a full second of slack before the hardware fires for long
/// timeouts; short timeouts get half their window.
pub const fn liveness_threshold(timeout_ms: u32) -> u32 {
    if timeout_ms > 2000 {
        timeout_ms - 1000
    } else {
        timeout_ms / 2
    }
}

/// Millisecond timestamps, one word-sized atomic per subsystem
#[derive(Debug, Default)]
pub struct LivenessTable {
    slots: [AtomicU32; Subsystem::COUNT],
}

impl LivenessTable {
    /// Create a table with every slot stamped at zero
    pub const fn new() -> Self {
        Self {
            slots: [
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
                AtomicU32::new(0),
            ],
        }
    }

    /// Record that `subsystem` was alive at `now_ms`
    pub fn kick(&self, subsystem: Subsystem, now_ms: u32) {
        self.slots[subsystem.index()].store(now_ms, Ordering::Relaxed);
    }

    /// Timestamp of the last kick
    pub fn last_kick(&self, subsystem: Subsystem) -> u32 {
        self.slots[subsystem.index()].load(Ordering::Relaxed)
    }

    /// Milliseconds since the last kick, tolerant of tick wraparound
    pub fn age(&self, subsystem: Subsystem, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_kick(subsystem))
    }

    /// First subsystem whose age reached `threshold_ms`
    pub fn first_stale(&self, now_ms: u32, threshold_ms: u32) -> Option<Subsystem> {
        Subsystem::ALL
            .into_iter()
            .find(|&s| self.age(s, now_ms) >= threshold_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold() {
        assert_eq!(liveness_threshold(6000), 5000);
        assert_eq!(liveness_threshold(2001), 1001);
        assert_eq!(liveness_threshold(2000), 1000);
        assert_eq!(liveness_threshold(1000), 500);
    }

    #[test]
    fn test_kick_and_age() {
        let table = LivenessTable::new();
        table.kick(Subsystem::Logger, 1234);
        assert_eq!(table.last_kick(Subsystem::Logger), 1234);
        assert_eq!(table.age(Subsystem::Logger, 1500), 266);
        assert_eq!(table.age(Subsystem::Modbus, 1500), 1500);
    }

    #[test]
    fn test_first_stale_is_strict() {
        let table = LivenessTable::new();
        for s in Subsystem::ALL {
            table.kick(s, 100);
        }
        assert_eq!(table.first_stale(599, 500), None);
        assert_eq!(table.first_stale(600, 500), Some(Subsystem::Modbus));

        table.kick(Subsystem::Modbus, 600);
        assert_eq!(table.first_stale(600, 500), Some(Subsystem::Logger));
    }
}
