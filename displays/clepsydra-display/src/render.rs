//! Clock layout
//!
//! ```text
//!  col 1      7     13                     W-12   W-6
//!  ┌─────┐ ┌─────┐ ┌─────┐      ...       ┌─────┐ ┌─────┐
//!  │  M  │ │  M  │ │  M  │                │  S  │ │  S  │
//!  └─────┘ └─────┘ └─────┘                └─────┘ └─────┘
//! ```
//!
//! Digits are 5×7 on a 6-column pitch, vertically centred (top row 4).
//! Minutes start one column in from the left, seconds end one column in
//! from the right.

use embassy_sync::blocking_mutex::raw::RawMutex;

use clepsydra_core::config::PanelConfig;
use clepsydra_core::registers::ClockTime;

use crate::bitmap::{Bitmap, HEIGHT};
use crate::font::{self, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::shared::SharedBitmap;

/// Column distance between digit origins
pub const DIGIT_PITCH: usize = GLYPH_WIDTH + 1;

/// Blank columns left of the minutes and right of the seconds
pub const EDGE_MARGIN: usize = 1;

/// Top row of every digit
pub const TOP_ROW: usize = (HEIGHT - GLYPH_HEIGHT) / 2;

/// Width of the two seconds digits including the gap between them
const SECONDS_SPAN: usize = 2 * GLYPH_WIDTH + 1;

fn draw_digit(bitmap: &mut Bitmap, x0: usize, y0: usize, d: u8) {
    let Some(glyph) = font::digit(d) else {
        return;
    };
    for y in 0..GLYPH_HEIGHT {
        for x in 0..GLYPH_WIDTH {
            bitmap.set(x0 + x, y0 + y, font::pixel(glyph, x, y));
        }
    }
}

/// Draw `time` into `bitmap` using a layout `layout_width` columns wide
///
/// The bitmap is cleared first. Out-of-range values are clamped to 999 and
/// 59.
pub fn draw_clock(bitmap: &mut Bitmap, time: ClockTime, layout_width: usize) {
    let time = time.clamped();
    bitmap.clear();

    let minutes = [
        (time.minutes / 100 % 10) as u8,
        (time.minutes / 10 % 10) as u8,
        (time.minutes % 10) as u8,
    ];
    for (i, &d) in minutes.iter().enumerate() {
        draw_digit(bitmap, EDGE_MARGIN + i * DIGIT_PITCH, TOP_ROW, d);
    }

    let Some(seconds_x) = layout_width.checked_sub(EDGE_MARGIN + SECONDS_SPAN) else {
        return;
    };
    let seconds = [(time.seconds / 10) as u8, (time.seconds % 10) as u8];
    for (i, &d) in seconds.iter().enumerate() {
        draw_digit(bitmap, seconds_x + i * DIGIT_PITCH, TOP_ROW, d);
    }
}

/// Renders clock values for one panel chain
pub struct ClockRenderer {
    panel: PanelConfig,
    scratch: Bitmap,
}

impl ClockRenderer {
    pub fn new(panel: PanelConfig) -> Self {
        Self {
            scratch: Bitmap::new(panel.total_width()),
            panel,
        }
    }

    /// Render `time` into the private buffer and return it
    pub fn render(&mut self, time: ClockTime) -> &Bitmap {
        let panel_width = self.panel.width as usize;
        let chain = self.panel.chain as usize;

        draw_clock(&mut self.scratch, time, self.panel.render_width());
        if self.panel.mirror {
            self.scratch.mirror(panel_width, chain);
        }
        if self.panel.swap {
            self.scratch.swap_panels(panel_width, chain);
        }
        &self.scratch
    }

    /// Render `time` and publish it for the scan
    pub fn update<M: RawMutex>(&mut self, time: ClockTime, shared: &SharedBitmap<M>) {
        self.render(time);
        shared.publish(&self.scratch);
    }
}
