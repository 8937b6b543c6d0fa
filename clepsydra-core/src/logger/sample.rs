//! Sample logger state machine

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::String;

use super::record::{file_path, format_record, CSV_HEADER};
use super::storage::{LogStorage, StorageError};
use super::LogEvent;
use crate::config::{LogConfig, MAX_DIR_LEN};
use crate::registers::{Date, RegisterStore};

/// What one logger step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepOutcome {
    /// Storage unavailable, nothing attempted
    Unavailable,
    /// No event this round
    Idle,
    /// Event appended to the daily file
    Recorded,
    /// Event dropped because logging is disabled in the registers
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Mount not attempted yet
    Unmounted,
    /// Mount failed; the logger is a no-op from now on
    Disabled,
    /// Mounted, no file open
    Closed,
    /// Daily file for this date is open
    Open(Date),
}

/// Writes clock samples to daily CSV files
pub struct SampleLogger<S: LogStorage> {
    storage: S,
    dir: String<MAX_DIR_LEN>,
    sync_period_ms: u32,
    state: State,
    last_sync_ms: u32,
}

impl<S: LogStorage> SampleLogger<S> {
    pub fn new(storage: S, config: &LogConfig) -> Self {
        Self {
            storage,
            dir: config.dir.clone(),
            sync_period_ms: config.sync_period_ms,
            state: State::Unmounted,
            last_sync_ms: 0,
        }
    }

    /// False once mounting has failed
    pub fn is_available(&self) -> bool {
        self.state != State::Disabled
    }

    /// Date of the open file, if any
    pub fn open_date(&self) -> Option<Date> {
        match self.state {
            State::Open(date) => Some(date),
            _ => None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Run one logger iteration
    ///
    /// Mounts on first use, rolls the daily file when the date registers
    /// change, records `event` when logging is enabled and syncs
    /// periodically. An error closes the file; the next step reopens it.
    pub fn step<M: RawMutex>(
        &mut self,
        store: &RegisterStore<M>,
        event: Option<LogEvent>,
        now_ms: u32,
    ) -> Result<StepOutcome, StorageError> {
        if self.state == State::Unmounted {
            if let Err(e) = self.storage.mount() {
                self.state = State::Disabled;
                return Err(e);
            }
            self.state = State::Closed;
        }
        if self.state == State::Disabled {
            return Ok(StepOutcome::Unavailable);
        }

        let date = store.date().or_epoch();
        if self.state != State::Open(date) {
            self.open(date, now_ms).map_err(|e| self.fail(e))?;
        }

        let outcome = match event {
            Some(event) if store.log_enabled() => {
                let line = format_record(&event, &store.payload()).ok_or(StorageError::Io)?;
                self.storage
                    .write(line.as_bytes())
                    .map_err(|e| self.fail(e))?;
                StepOutcome::Recorded
            }
            Some(_) => StepOutcome::Skipped,
            None => StepOutcome::Idle,
        };

        if now_ms.wrapping_sub(self.last_sync_ms) >= self.sync_period_ms {
            self.storage.sync().map_err(|e| self.fail(e))?;
            self.last_sync_ms = now_ms;
        }

        Ok(outcome)
    }

    fn open(&mut self, date: Date, now_ms: u32) -> Result<(), StorageError> {
        let path = file_path(&self.dir, date).ok_or(StorageError::Io)?;
        let existed = self.storage.open_append(&path)?;
        if !existed {
            self.storage.write(CSV_HEADER.as_bytes())?;
        }
        self.state = State::Open(date);
        self.last_sync_ms = now_ms;
        Ok(())
    }

    fn fail(&mut self, e: StorageError) -> StorageError {
        self.storage.close();
        self.state = State::Closed;
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{REG_DAY, REG_LOG_ENABLE, REG_PAYLOAD, REG_YEAR};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use std::collections::BTreeMap;
    use std::string::String as StdString;
    use std::vec::Vec as StdVec;

    type Store = RegisterStore<CriticalSectionRawMutex>;

    #[derive(Default)]
    struct MemoryStorage {
        files: BTreeMap<StdString, StdVec<u8>>,
        current: Option<StdString>,
        fail_mount: bool,
        fail_writes: bool,
        mounts: u32,
        syncs: u32,
    }

    impl MemoryStorage {
        fn text(&self, path: &str) -> StdString {
            StdString::from_utf8(self.files[path].clone()).unwrap()
        }
    }

    impl LogStorage for MemoryStorage {
        fn mount(&mut self) -> Result<(), StorageError> {
            self.mounts += 1;
            if self.fail_mount {
                Err(StorageError::NotMounted)
            } else {
                Ok(())
            }
        }

        fn open_append(&mut self, path: &str) -> Result<bool, StorageError> {
            let existed = self.files.contains_key(path);
            self.files.entry(path.into()).or_default();
            self.current = Some(path.into());
            Ok(existed)
        }

        fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Io);
            }
            let path = self.current.as_ref().ok_or(StorageError::NotOpen)?;
            self.files
                .get_mut(path)
                .ok_or(StorageError::NotOpen)?
                .extend_from_slice(data);
            Ok(())
        }

        fn sync(&mut self) -> Result<(), StorageError> {
            self.syncs += 1;
            Ok(())
        }

        fn close(&mut self) {
            self.current = None;
        }
    }

    fn event(tick_ms: u32, minutes: u16, seconds: u16) -> Option<LogEvent> {
        Some(LogEvent {
            tick_ms,
            minutes,
            seconds,
        })
    }

    fn logger(storage: MemoryStorage) -> SampleLogger<MemoryStorage> {
        SampleLogger::new(storage, &LogConfig::default())
    }

    #[test]
    fn test_invalid_date_logs_to_epoch_file() {
        let store = Store::new();
        let mut logger = logger(MemoryStorage::default());

        assert_eq!(logger.step(&store, event(10, 1, 2), 10), Ok(StepOutcome::Recorded));
        assert_eq!(logger.open_date(), Some(Date::EPOCH));
        assert_eq!(
            logger.storage().text("logs/1970-01-01.csv"),
            format!("{}10,1,2,0,0,0,0,0,0,0,0,0,0\r\n", CSV_HEADER)
        );
    }

    #[test]
    fn test_records_payload() {
        let store = Store::new();
        store.write_block(REG_YEAR, &[2024, 5, 17]).unwrap();
        store
            .write_block(REG_PAYLOAD, &[10, 20, 30, 40, 50, 60, 70, 80, 90, 100])
            .unwrap();
        let mut logger = logger(MemoryStorage::default());

        logger.step(&store, event(500, 3, 4), 500).unwrap();
        let text = logger.storage().text("logs/2024-05-17.csv");
        assert!(text.ends_with("500,3,4,10,20,30,40,50,60,70,80,90,100\r\n"));
    }

    #[test]
    fn test_date_change_rolls_file() {
        let store = Store::new();
        store.write_block(REG_YEAR, &[2024, 5, 17]).unwrap();
        let mut logger = logger(MemoryStorage::default());

        logger.step(&store, event(1, 0, 1), 1).unwrap();
        store.write(REG_DAY, 18).unwrap();
        logger.step(&store, event(2, 0, 2), 2).unwrap();

        let storage = logger.storage();
        assert_eq!(storage.files.len(), 2);
        assert!(storage.text("logs/2024-05-18.csv").starts_with(CSV_HEADER));
        assert!(storage.text("logs/2024-05-18.csv").ends_with("2,0,2,0,0,0,0,0,0,0,0,0,0\r\n"));
    }

    #[test]
    fn test_existing_file_gets_no_second_header() {
        let store = Store::new();
        let mut storage = MemoryStorage::default();
        storage
            .files
            .insert("logs/1970-01-01.csv".into(), CSV_HEADER.as_bytes().to_vec());
        let mut logger = logger(storage);

        logger.step(&store, event(7, 0, 7), 7).unwrap();
        let text = logger.storage().text("logs/1970-01-01.csv");
        assert_eq!(text.matches("tick_ms").count(), 1);
    }

    #[test]
    fn test_log_disabled_skips_event() {
        let store = Store::new();
        store.write(REG_LOG_ENABLE, 0).unwrap();
        let mut logger = logger(MemoryStorage::default());

        assert_eq!(logger.step(&store, event(1, 0, 1), 1), Ok(StepOutcome::Skipped));
        assert_eq!(logger.step(&store, None, 2), Ok(StepOutcome::Idle));
        assert_eq!(logger.storage().text("logs/1970-01-01.csv"), CSV_HEADER);
    }

    #[test]
    fn test_mount_failure_disables_logger() {
        let store = Store::new();
        let mut logger = logger(MemoryStorage {
            fail_mount: true,
            ..Default::default()
        });

        assert_eq!(
            logger.step(&store, event(1, 0, 1), 1),
            Err(StorageError::NotMounted)
        );
        assert!(!logger.is_available());
        assert_eq!(logger.step(&store, event(2, 0, 2), 2), Ok(StepOutcome::Unavailable));
        assert_eq!(logger.storage().mounts, 1);
        assert!(logger.storage().files.is_empty());
    }

    #[test]
    fn test_write_error_reopens_next_step() {
        let store = Store::new();
        let mut logger = logger(MemoryStorage::default());
        logger.step(&store, None, 0).unwrap();

        logger.storage.fail_writes = true;
        assert_eq!(logger.step(&store, event(1, 0, 1), 1), Err(StorageError::Io));
        assert_eq!(logger.open_date(), None);

        logger.storage.fail_writes = false;
        assert_eq!(logger.step(&store, event(2, 0, 2), 2), Ok(StepOutcome::Recorded));
        assert_eq!(logger.open_date(), Some(Date::EPOCH));
    }

    #[test]
    fn test_periodic_sync() {
        let store = Store::new();
        let mut logger = logger(MemoryStorage::default());

        logger.step(&store, None, 0).unwrap();
        logger.step(&store, None, 1000).unwrap();
        assert_eq!(logger.storage().syncs, 0);

        logger.step(&store, None, 2000).unwrap();
        assert_eq!(logger.storage().syncs, 1);

        logger.step(&store, None, 3999).unwrap();
        assert_eq!(logger.storage().syncs, 1);
        logger.step(&store, None, 4000).unwrap();
        assert_eq!(logger.storage().syncs, 2);
    }
}
