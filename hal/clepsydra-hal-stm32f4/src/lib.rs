//! STM32F4 implementations of the Clepsydra HAL traits
//!
//! Thin adapters over embassy-stm32:
//! - [`gpio::PanelPin`] drives one HUB12 line as a fast push-pull output
//! - [`iwdg::Iwdg`] wraps the independent watchdog

#![no_std]

pub mod gpio;
pub mod iwdg;

pub use gpio::PanelPin;
pub use iwdg::Iwdg;
