//! Daily CSV sample logger
//!
//! The Modbus observer queues a [`LogEvent`] whenever the clock changes.
//! The logger task drains the queue and appends one CSV record per event
//! to `<dir>/YYYY-MM-DD.csv`, using the date registers to pick the file.
//! Storage trouble never propagates: the logger just stops writing.

pub mod record;
pub mod sample;
pub mod storage;

pub use sample::{SampleLogger, StepOutcome};
pub use storage::{LogStorage, StorageError};

/// Capacity of the event queue between the Modbus task and the logger
pub const LOG_QUEUE_LEN: usize = 16;

/// One clock change, stamped with the uptime at which it was seen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogEvent {
    pub tick_ms: u32,
    pub minutes: u16,
    pub seconds: u16,
}
