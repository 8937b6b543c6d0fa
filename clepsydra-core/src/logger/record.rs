//! CSV file names and records

use core::fmt::Write;

use heapless::String;

use super::LogEvent;
use crate::config::MAX_DIR_LEN;
use crate::registers::{Date, PAYLOAD_LEN};

/// Longest file path: `<dir>/YYYY-MM-DD.csv`
pub const MAX_PATH_LEN: usize = MAX_DIR_LEN + 16;

/// Longest record line
pub const MAX_RECORD_LEN: usize = 96;

/// Header written at the top of each new file
pub const CSV_HEADER: &str = "tick_ms,minutes,seconds,p0,p1,p2,p3,p4,p5,p6,p7,p8,p9\r\n";

/// Build the daily file path for `date`
pub fn file_path(dir: &str, date: Date) -> Option<String<MAX_PATH_LEN>> {
    let mut path = String::new();
    write!(
        path,
        "{}/{:04}-{:02}-{:02}.csv",
        dir, date.year, date.month, date.day
    )
    .ok()?;
    Some(path)
}

/// Format one record: tick, clock, then every payload register
pub fn format_record(event: &LogEvent, payload: &[u16; PAYLOAD_LEN]) -> Option<String<MAX_RECORD_LEN>> {
    let mut line = String::new();
    write!(line, "{},{},{}", event.tick_ms, event.minutes, event.seconds).ok()?;
    for value in payload {
        write!(line, ",{}", value).ok()?;
    }
    line.push_str("\r\n").ok()?;
    Some(line)
}
