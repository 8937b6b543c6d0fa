//! Clepsydra Hardware Abstraction Layer
//!
//! This crate defines the hardware traits the clock panel logic is written
//! against. Chip-specific crates implement them; host tests implement them
//! with recording mocks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  clepsydra-display / clepsydra-core     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  clepsydra-hal (this crate - traits)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!         ┌───────────────────────┐
//!         │ clepsydra-hal-stm32f4 │
//!         └───────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital outputs driving the HUB12 panel lines
//! - [`watchdog::HardwareWatchdog`] - Independent hardware watchdog

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod watchdog;

// Re-export key traits at crate root for convenience
pub use gpio::OutputPin;
pub use watchdog::HardwareWatchdog;
