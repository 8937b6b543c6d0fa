//! Register store with the time-change latch
//!
//! All state lives in one `RefCell` behind a blocking mutex, so every
//! operation is a short critical section with no I/O inside. The raw mutex
//! is a type parameter: firmware uses `CriticalSectionRawMutex`, host tests
//! build as many independent stores as they like.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::map::*;

/// Register access errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegisterError {
    /// Empty range or range past the end of the table
    OutOfRange,
}

/// Sentinel that never matches a real time, so the first consume fires
const NEVER_OBSERVED: ClockTime = ClockTime::new(0xFFFF, 0xFFFF);

struct Inner {
    regs: [u16; REGISTER_COUNT],
    time_dirty: bool,
    last_observed: ClockTime,
}

impl Inner {
    fn time(&self) -> ClockTime {
        ClockTime::new(
            self.regs[REG_MINUTES as usize],
            self.regs[REG_SECONDS as usize],
        )
    }
}

/// Validate `[addr, addr + qty)` against the table
fn range(addr: u16, qty: usize) -> Result<core::ops::Range<usize>, RegisterError> {
    let start = addr as usize;
    let end = start + qty;
    if qty == 0 || end > REGISTER_COUNT {
        return Err(RegisterError::OutOfRange);
    }
    Ok(start..end)
}

/// Guarded register table
pub struct RegisterStore<M: RawMutex> {
    inner: Mutex<M, RefCell<Inner>>,
}

impl<M: RawMutex> Default for RegisterStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> RegisterStore<M> {
    /// Create a store holding the power-up defaults
    ///
    /// The time latch starts dirty so the first consume reports the boot time.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                regs: default_registers(),
                time_dirty: true,
                last_observed: NEVER_OBSERVED,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Read one register
    pub fn read(&self, addr: u16) -> Result<u16, RegisterError> {
        let mut value = [0u16; 1];
        self.read_block(addr, &mut value)?;
        Ok(value[0])
    }

    /// Read `out.len()` consecutive registers as one snapshot
    pub fn read_block(&self, addr: u16, out: &mut [u16]) -> Result<(), RegisterError> {
        let range = range(addr, out.len())?;
        self.with(|inner| out.copy_from_slice(&inner.regs[range]));
        Ok(())
    }

    /// Write one register
    pub fn write(&self, addr: u16, value: u16) -> Result<(), RegisterError> {
        self.write_block(addr, &[value])
    }

    /// Write consecutive registers as one update
    ///
    /// Fails without touching any register when the range is invalid. A
    /// write covering minutes or seconds marks the time dirty if it now
    /// differs from the last consumed value.
    pub fn write_block(&self, addr: u16, values: &[u16]) -> Result<(), RegisterError> {
        let range = range(addr, values.len())?;
        let touches_time = range.start <= REG_SECONDS as usize;

        self.with(|inner| {
            inner.regs[range].copy_from_slice(values);
            if touches_time && inner.time() != inner.last_observed {
                inner.time_dirty = true;
            }
        });
        Ok(())
    }

    /// Take the current time if it changed since the last call
    ///
    /// Yields at most once per change; consecutive calls without an
    /// intervening time write return `None`.
    pub fn consume_changed_time(&self) -> Option<ClockTime> {
        self.with(|inner| {
            let now = inner.time();
            if inner.time_dirty || now != inner.last_observed {
                inner.time_dirty = false;
                inner.last_observed = now;
                Some(now)
            } else {
                None
            }
        })
    }

    /// Current clock registers
    pub fn time(&self) -> ClockTime {
        self.with(|inner| inner.time())
    }

    /// Current date registers, unvalidated
    pub fn date(&self) -> Date {
        self.with(|inner| Date {
            year: inner.regs[REG_YEAR as usize],
            month: inner.regs[REG_MONTH as usize],
            day: inner.regs[REG_DAY as usize],
        })
    }

    /// Whether CSV sampling is enabled
    pub fn log_enabled(&self) -> bool {
        self.with(|inner| inner.regs[REG_LOG_ENABLE as usize] != 0)
    }

    /// Snapshot of the payload registers
    pub fn payload(&self) -> [u16; PAYLOAD_LEN] {
        let mut out = [0u16; PAYLOAD_LEN];
        let start = REG_PAYLOAD as usize;
        self.with(|inner| out.copy_from_slice(&inner.regs[start..start + PAYLOAD_LEN]));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use proptest::prelude::*;

    type Store = RegisterStore<CriticalSectionRawMutex>;

    #[test]
    fn test_defaults() {
        let store = Store::new();
        assert_eq!(store.time(), ClockTime::new(0, 0));
        assert_eq!(store.date(), Date::EPOCH);
        assert!(store.log_enabled());
        assert_eq!(store.payload(), [0; PAYLOAD_LEN]);
    }

    #[test]
    fn test_single_read_write() {
        let store = Store::new();
        store.write(7, 0xABCD).unwrap();
        assert_eq!(store.read(7), Ok(0xABCD));
        assert_eq!(store.read(31), Ok(0));
        assert_eq!(store.read(32), Err(RegisterError::OutOfRange));
        assert_eq!(store.write(32, 1), Err(RegisterError::OutOfRange));
    }

    #[test]
    fn test_empty_range_rejected() {
        let store = Store::new();
        assert_eq!(store.read_block(0, &mut []), Err(RegisterError::OutOfRange));
        assert_eq!(store.write_block(0, &[]), Err(RegisterError::OutOfRange));
    }

    #[test]
    fn test_out_of_range_write_is_atomic() {
        let store = Store::new();
        store.write_block(28, &[1, 2, 3, 4]).unwrap();
        assert_eq!(
            store.write_block(30, &[9, 9, 9]),
            Err(RegisterError::OutOfRange)
        );

        let mut out = [0u16; 4];
        store.read_block(28, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn test_first_consume_yields_boot_time() {
        let store = Store::new();
        assert_eq!(store.consume_changed_time(), Some(ClockTime::new(0, 0)));
        assert_eq!(store.consume_changed_time(), None);
    }

    #[test]
    fn test_time_write_sets_latch_once() {
        let store = Store::new();
        store.consume_changed_time();

        store.write_block(0, &[5, 30]).unwrap();
        assert_eq!(store.consume_changed_time(), Some(ClockTime::new(5, 30)));
        assert_eq!(store.consume_changed_time(), None);

        // Same value again: nothing new to report
        store.write(1, 30).unwrap();
        assert_eq!(store.consume_changed_time(), None);

        store.write(1, 31).unwrap();
        assert_eq!(store.consume_changed_time(), Some(ClockTime::new(5, 31)));
    }

    #[test]
    fn test_dirty_latch_survives_unchanged_write() {
        let store = Store::new();
        store.consume_changed_time();

        store.write(0, 9).unwrap();
        // Writing the same value again keeps the latch set
        store.write(0, 9).unwrap();
        assert_eq!(store.consume_changed_time(), Some(ClockTime::new(9, 0)));
    }

    #[test]
    fn test_write_outside_time_keeps_latch_clear() {
        let store = Store::new();
        store.consume_changed_time();

        store.write_block(2, &[2024, 6, 1]).unwrap();
        assert_eq!(store.consume_changed_time(), None);
        assert_eq!(
            store.date(),
            Date {
                year: 2024,
                month: 6,
                day: 1
            }
        );
    }

    #[test]
    fn test_log_enable_and_payload() {
        let store = Store::new();
        store.write(REG_LOG_ENABLE, 0).unwrap();
        assert!(!store.log_enabled());

        store
            .write_block(REG_PAYLOAD, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10])
            .unwrap();
        assert_eq!(store.payload(), [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_concurrent_blocks_are_consistent() {
        use std::sync::Arc;

        let store = Arc::new(Store::new());
        let writers: std::vec::Vec<_> = (1..=4u16)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        store.write_block(16, &[n; 16]).unwrap();
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let mut out = [0u16; 16];
            store.read_block(16, &mut out).unwrap();
            assert!(out.iter().all(|&v| v == out[0]));
        }

        for writer in writers {
            writer.join().unwrap();
        }
    }

    proptest! {
        #[test]
        fn block_write_read_back(
            addr in 0u16..32,
            values in proptest::collection::vec(any::<u16>(), 1..=32),
        ) {
            let store = Store::new();
            let fits = addr as usize + values.len() <= REGISTER_COUNT;
            let result = store.write_block(addr, &values);
            prop_assert_eq!(result.is_ok(), fits);

            if fits {
                let mut out = std::vec![0u16; values.len()];
                store.read_block(addr, &mut out).unwrap();
                prop_assert_eq!(out, values);
            } else {
                let mut all = [0u16; REGISTER_COUNT];
                store.read_block(0, &mut all).unwrap();
                prop_assert_eq!(all, default_registers());
            }
        }
    }
}
