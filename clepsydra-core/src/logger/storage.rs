//! Storage backend for the sample logger

/// Storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// No medium, or it could not be mounted
    NotMounted,
    /// Write or sync attempted with no open file
    NotOpen,
    /// Medium is full
    NoSpace,
    /// Any other I/O failure
    Io,
}

/// Append-only file storage
///
/// One file is open at a time. `open_append` creates the parent directory
/// and the file as needed.
pub trait LogStorage {
    /// Mount the medium
    fn mount(&mut self) -> Result<(), StorageError>;

    /// Close any open file and open `path` for appending
    ///
    /// Returns `true` when the file already existed.
    fn open_append(&mut self, path: &str) -> Result<bool, StorageError>;

    /// Append bytes to the open file
    fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;

    /// Flush the open file to the medium
    fn sync(&mut self) -> Result<(), StorageError>;

    /// Sync and close the open file, if any
    fn close(&mut self);
}
