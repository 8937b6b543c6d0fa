//! RTT log storage
//!
//! The board has no card slot, so "files" are mirrored to the RTT log: each
//! record appears as one `info` line tagged with its file name. A host-side
//! defmt decoder can split them back into daily CSV files.

use defmt::*;
use heapless::String;

use clepsydra_core::logger::record::MAX_PATH_LEN;
use clepsydra_core::logger::{LogStorage, StorageError};

pub struct RttStorage {
    /// File currently open
    current: Option<String<MAX_PATH_LEN>>,
    /// Last file opened, to avoid repeating its header after a reopen
    last: Option<String<MAX_PATH_LEN>>,
}

impl RttStorage {
    pub const fn new() -> Self {
        Self {
            current: None,
            last: None,
        }
    }
}

impl LogStorage for RttStorage {
    fn mount(&mut self) -> Result<(), StorageError> {
        info!("Sample log mirrored to RTT");
        Ok(())
    }

    fn open_append(&mut self, path: &str) -> Result<bool, StorageError> {
        let mut name = String::new();
        name.push_str(path).map_err(|_| StorageError::Io)?;

        let existed = self.last.as_ref() == Some(&name);
        if !existed {
            info!("Opening log file {=str}", path);
        }
        self.last = Some(name.clone());
        self.current = Some(name);
        Ok(existed)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        let path = self.current.as_ref().ok_or(StorageError::NotOpen)?;
        let text = core::str::from_utf8(data).map_err(|_| StorageError::Io)?;
        for line in text.lines() {
            info!("{=str}: {=str}", path.as_str(), line);
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), StorageError> {
        if self.current.is_none() {
            return Err(StorageError::NotOpen);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.current = None;
    }
}
