//! Shared register table
//!
//! The table is the single source of truth for cross-task state: the
//! Modbus session writes it, the display and logger read it.

pub mod map;
pub mod store;

pub use map::*;
pub use store::{RegisterError, RegisterStore};
