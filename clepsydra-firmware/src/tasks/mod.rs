//! Embassy async tasks
//!
//! Each task runs independently, talks to the others through the register
//! store and the channels, and stamps its liveness slot every loop.

pub mod display;
pub mod logger;
pub mod modbus;
pub mod net;
pub mod scan;
pub mod supervisor;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Instant};

use clepsydra_core::registers::RegisterStore;
use clepsydra_core::supervisor::TASK_KEEPALIVE_MS;

pub use display::display_task;
pub use logger::logger_task;
pub use modbus::modbus_task;
pub use net::net_task;
pub use scan::scan_task;
pub use supervisor::supervisor_task;

/// Register table type shared by every task
pub type Registers = RegisterStore<CriticalSectionRawMutex>;

/// Longest a task waits before stamping its liveness slot again
pub const KEEPALIVE: Duration = Duration::from_millis(TASK_KEEPALIVE_MS as u64);

/// Uptime in milliseconds, wrapping after ~49 days
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}
