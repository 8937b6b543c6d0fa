//! One-bit-per-pixel panel bitmap
//!
//! Each row is a `u64` word. For a chain `W` columns wide, column `x` lives
//! at bit `W - 1 - x`, so the word shifted out MSB-first from bit `W - 1`
//! puts column 0 into the first shift register of the chain.

use clepsydra_core::config::{ScanLines, MAX_DISPLAY_WIDTH, PANEL_HEIGHT};

/// Bitmap height in rows
pub const HEIGHT: usize = PANEL_HEIGHT;

/// Rows in one panel half; row `r` and row `r + HALF` are shifted together
const HALF: usize = HEIGHT / 2;

/// Offset between rows folded onto the same scan line in 1/4 scan
const FOLD: usize = 4;

/// Off-screen or shared frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitmap {
    rows: [u64; HEIGHT],
    width: usize,
}

/// Mask of the low `bits` bits
fn low_mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

impl Bitmap {
    /// Create a blank bitmap `width` columns wide (clamped to 1..=64)
    pub const fn new(width: usize) -> Self {
        let width = if width == 0 {
            1
        } else if width > MAX_DISPLAY_WIDTH {
            MAX_DISPLAY_WIDTH
        } else {
            width
        };
        Self {
            rows: [0; HEIGHT],
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn clear(&mut self) {
        self.rows = [0; HEIGHT];
    }

    /// Set or clear a pixel; coordinates outside the bitmap are ignored
    pub fn set(&mut self, x: usize, y: usize, on: bool) {
        if x >= self.width || y >= HEIGHT {
            return;
        }
        let bit = 1u64 << (self.width - 1 - x);
        if on {
            self.rows[y] |= bit;
        } else {
            self.rows[y] &= !bit;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < HEIGHT && self.rows[y] & (1u64 << (self.width - 1 - x)) != 0
    }

    /// Row word for `y`, zero outside the bitmap
    pub fn row(&self, y: usize) -> u64 {
        self.rows.get(y).copied().unwrap_or(0)
    }

    pub fn rows(&self) -> &[u64; HEIGHT] {
        &self.rows
    }

    /// Copy pixels and width from `other`
    pub fn copy_from(&mut self, other: &Bitmap) {
        self.rows = other.rows;
        self.width = other.width;
    }

    /// Upper and lower data words for scan row `row`
    ///
    /// With eight scan rows each half shows one bitmap row. With four, rows
    /// four apart share a scan line and are OR-folded together.
    pub fn scan_words(&self, row: usize, scan_lines: ScanLines) -> (u64, u64) {
        match scan_lines {
            ScanLines::Eight => (self.row(row), self.row(row + HALF)),
            ScanLines::Four => (
                self.row(row) | self.row(row + FOLD),
                self.row(row + HALF) | self.row(row + HALF + FOLD),
            ),
        }
    }

    /// Rebuild each row from its per-panel segments; `f` picks the segment
    /// shown on output panel `p`
    fn remap_panels(&mut self, panel_width: usize, chain: usize, f: impl Fn(&[u64], usize) -> u64) {
        if chain < 2 || panel_width == 0 || panel_width * chain != self.width {
            return;
        }
        let mask = low_mask(panel_width);
        let mut segments = [0u64; MAX_DISPLAY_WIDTH];
        for row in self.rows.iter_mut() {
            for (p, seg) in segments[..chain].iter_mut().enumerate() {
                *seg = (*row >> (self.width - (p + 1) * panel_width)) & mask;
            }
            let mut out = 0u64;
            for p in 0..chain {
                out |= f(&segments[..chain], p) << (self.width - (p + 1) * panel_width);
            }
            *row = out;
        }
    }

    /// Replicate the first panel onto every panel of the chain
    pub fn mirror(&mut self, panel_width: usize, chain: usize) {
        self.remap_panels(panel_width, chain, |segments, _| segments[0]);
    }

    /// Reverse the order of the panels in the chain
    pub fn swap_panels(&mut self, panel_width: usize, chain: usize) {
        self.remap_panels(panel_width, chain, |segments, p| {
            segments[segments.len() - 1 - p]
        });
    }
}

/// Reverse the low `width` bits of `word`, for LSB-first panels
pub fn reverse_bits(word: u64, width: usize) -> u64 {
    if width == 0 {
        return 0;
    }
    word.reverse_bits() >> (64 - width.min(64))
}
