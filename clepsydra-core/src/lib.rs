//! Board-agnostic core logic for the clock panel controller
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Register table shared by every task, with the time-change latch
//! - Modbus session: frames in, register reads/writes, replies out
//! - Supervisor liveness table and watchdog gate
//! - Daily CSV sample logger over an abstract storage backend
//! - Device configuration types and the boot-time TOML parser
//!
//! Every component exposes a step function so the firmware tasks and the
//! host tests drive exactly the same code.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod logger;
pub mod modbus;
pub mod registers;
pub mod supervisor;
