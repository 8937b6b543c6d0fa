//! HUB12 row scan
//!
//! One [`ScanEngine::step`] drives one scan row:
//!
//! 1. Blank the panel (output enable off)
//! 2. Drive the address lines to the row number
//! 3. Fetch the upper and lower data words from the shared frame
//! 4. Shift `W` bits out on R1/R2, one clock pulse per column
//! 5. Pulse latch, then enable output
//! 6. Advance to the next row
//!
//! The panel is never lit while the address lines or the shift registers
//! are changing.

use clepsydra_core::config::{BitOrder, PanelConfig, ScanLines};
use clepsydra_hal::OutputPin;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::bitmap::reverse_bits;
use crate::shared::SharedBitmap;

/// Scan engine configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanError {
    /// Eight scan rows need address line C
    MissingAddressLine,
    /// Shared frame width differs from the configured chain
    WidthMismatch,
}

/// Pins of the HUB12 connector
pub struct HubPins<P: OutputPin> {
    /// Row address bit 0
    pub a: P,
    /// Row address bit 1
    pub b: P,
    /// Row address bit 2, only on 1/8 scan panels
    pub c: Option<P>,
    /// Data for the upper half
    pub r1: P,
    /// Data for the lower half
    pub r2: P,
    /// Shift clock
    pub clk: P,
    /// Latch strobe
    pub lat: P,
    /// Output enable
    pub oe: P,
}

/// Multiplexed row driver for one panel chain
pub struct ScanEngine<'a, M: RawMutex, P: OutputPin> {
    pins: HubPins<P>,
    frame: &'a SharedBitmap<M>,
    scan_lines: ScanLines,
    bit_order: BitOrder,
    oe_active_low: bool,
    width: usize,
    row: usize,
}

impl<'a, M: RawMutex, P: OutputPin> ScanEngine<'a, M, P> {
    /// Create an engine and put the panel in its safe state
    pub fn new(
        pins: HubPins<P>,
        frame: &'a SharedBitmap<M>,
        panel: &PanelConfig,
    ) -> Result<Self, ScanError> {
        let wired = 2 + usize::from(pins.c.is_some());
        if wired < panel.scan_lines.address_lines() {
            return Err(ScanError::MissingAddressLine);
        }
        if frame.width() != panel.total_width() {
            return Err(ScanError::WidthMismatch);
        }

        let mut engine = Self {
            pins,
            frame,
            scan_lines: panel.scan_lines,
            bit_order: panel.bit_order,
            oe_active_low: panel.oe_active_low,
            width: panel.total_width(),
            row: 0,
        };
        engine.blank();
        Ok(engine)
    }

    /// Output disabled, every other line low
    pub fn blank(&mut self) {
        self.set_output(false);
        let pins = &mut self.pins;
        pins.a.set_low();
        pins.b.set_low();
        if let Some(c) = pins.c.as_mut() {
            c.set_low();
        }
        pins.r1.set_low();
        pins.r2.set_low();
        pins.clk.set_low();
        pins.lat.set_low();
    }

    /// Row that the next step will drive
    pub fn row(&self) -> usize {
        self.row
    }

    fn set_output(&mut self, enabled: bool) {
        self.pins.oe.set_state(enabled != self.oe_active_low);
    }

    fn select_row(&mut self, row: usize) {
        self.pins.a.set_state(row & 0b001 != 0);
        self.pins.b.set_state(row & 0b010 != 0);
        if self.scan_lines.address_lines() > 2 {
            if let Some(c) = self.pins.c.as_mut() {
                c.set_state(row & 0b100 != 0);
            }
        }
    }

    /// Drive one scan row
    pub fn step(&mut self) {
        let row = self.row;

        self.set_output(false);
        self.select_row(row);

        let (mut upper, mut lower) = self.frame.scan_words(row, self.scan_lines);
        if self.bit_order == BitOrder::LsbFirst {
            upper = reverse_bits(upper, self.width);
            lower = reverse_bits(lower, self.width);
        }

        for i in (0..self.width).rev() {
            self.pins.r1.set_state((upper >> i) & 1 != 0);
            self.pins.r2.set_state((lower >> i) & 1 != 0);
            self.pins.clk.pulse();
        }

        self.pins.lat.pulse();
        self.set_output(true);

        self.row = (row + 1) % self.scan_lines.rows();
    }
}
