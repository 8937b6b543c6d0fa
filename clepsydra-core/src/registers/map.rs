//! Register addresses and the typed views built from them

/// Number of holding registers
pub const REGISTER_COUNT: usize = 32;

/// Minutes of the running clock (0..=999)
pub const REG_MINUTES: u16 = 0;
/// Seconds of the running clock (0..=59)
pub const REG_SECONDS: u16 = 1;
/// Calendar year
pub const REG_YEAR: u16 = 2;
/// Calendar month
pub const REG_MONTH: u16 = 3;
/// Calendar day
pub const REG_DAY: u16 = 4;
/// Non-zero enables CSV sampling
pub const REG_LOG_ENABLE: u16 = 5;
/// First free-form payload register
pub const REG_PAYLOAD: u16 = 6;
/// Number of payload registers
pub const PAYLOAD_LEN: usize = 10;

/// Minutes displayed at most (three digits)
pub const MAX_MINUTES: u16 = 999;
/// Seconds displayed at most
pub const MAX_SECONDS: u16 = 59;

/// Clock value held in registers 0 and 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockTime {
    pub minutes: u16,
    pub seconds: u16,
}

impl ClockTime {
    pub const fn new(minutes: u16, seconds: u16) -> Self {
        Self { minutes, seconds }
    }

    /// Copy with both fields clamped to what the panel can show
    pub fn clamped(self) -> Self {
        Self {
            minutes: self.minutes.min(MAX_MINUTES),
            seconds: self.seconds.min(MAX_SECONDS),
        }
    }
}

/// Calendar date held in registers 2..=4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Date {
    pub year: u16,
    pub month: u16,
    pub day: u16,
}

impl Date {
    /// 1970-01-01, used whenever the registers hold nonsense
    pub const EPOCH: Date = Date {
        year: 1970,
        month: 1,
        day: 1,
    };

    /// Check the range accepted for log file names
    ///
    /// Day-of-month is not checked against the month length.
    pub fn is_valid(&self) -> bool {
        (2000..=2099).contains(&self.year)
            && (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
    }

    /// This date if valid, otherwise [`Date::EPOCH`]
    pub fn or_epoch(self) -> Self {
        if self.is_valid() {
            self
        } else {
            Self::EPOCH
        }
    }
}

impl Default for Date {
    fn default() -> Self {
        Self::EPOCH
    }
}

/// Register values at power-up
pub const fn default_registers() -> [u16; REGISTER_COUNT] {
    let mut regs = [0u16; REGISTER_COUNT];
    regs[REG_YEAR as usize] = Date::EPOCH.year;
    regs[REG_MONTH as usize] = Date::EPOCH.month;
    regs[REG_DAY as usize] = Date::EPOCH.day;
    regs[REG_LOG_ENABLE as usize] = 1;
    regs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_validation() {
        assert!(Date { year: 2024, month: 2, day: 29 }.is_valid());
        assert!(Date { year: 2099, month: 12, day: 31 }.is_valid());
        assert!(!Date { year: 1999, month: 1, day: 1 }.is_valid());
        assert!(!Date { year: 2100, month: 1, day: 1 }.is_valid());
        assert!(!Date { year: 2024, month: 0, day: 1 }.is_valid());
        assert!(!Date { year: 2024, month: 13, day: 1 }.is_valid());
        assert!(!Date { year: 2024, month: 1, day: 32 }.is_valid());
        // Only coarse range checks
        assert!(Date { year: 2024, month: 2, day: 31 }.is_valid());

        assert_eq!(Date { year: 0, month: 0, day: 0 }.or_epoch(), Date::EPOCH);
    }

    #[test]
    fn test_clock_clamp() {
        assert_eq!(ClockTime::new(1200, 75).clamped(), ClockTime::new(999, 59));
        assert_eq!(ClockTime::new(12, 5).clamped(), ClockTime::new(12, 5));
    }

    #[test]
    fn test_defaults() {
        let regs = default_registers();
        assert_eq!(&regs[..6], &[0, 0, 1970, 1, 1, 1]);
        assert!(regs[6..].iter().all(|&r| r == 0));
    }
}
