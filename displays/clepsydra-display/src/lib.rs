//! Clock display for chained HUB12 ("P10") LED panels
//!
//! This crate provides:
//! - A 5×7 digit font and a 1-bit-per-pixel [`Bitmap`] of up to 64×16
//! - [`ClockRenderer`]: draws `MMM` and `SS` into a private bitmap
//! - [`SharedBitmap`]: the frame shared between the renderer and the scan
//! - [`ScanEngine`]: one multiplexed row per call, driving [`HubPins`]
//!
//! # Architecture
//!
//! ```text
//!  time change ──► ClockRenderer ──publish──► SharedBitmap
//!                  (thread mode)                  │ 2-4 row words
//!                                                 ▼
//!                         ticker ──► ScanEngine::step ──► HUB12 pins
//!                                    (interrupt executor)
//! ```
//!
//! Panel geometry comes from a runtime [`PanelConfig`], so one binary (and
//! one test run) covers several chain layouts.
//!
//! [`PanelConfig`]: clepsydra_core::config::PanelConfig

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bitmap;
pub mod font;
pub mod render;
pub mod scan;
pub mod shared;

pub use bitmap::{Bitmap, HEIGHT};
pub use render::ClockRenderer;
pub use scan::{HubPins, ScanEngine, ScanError};
pub use shared::SharedBitmap;
