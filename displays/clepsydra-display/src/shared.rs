//! Frame shared between the renderer and the row scan
//!
//! The renderer publishes a finished bitmap in one short critical section.
//! The scan takes only the two or four row words it needs for the current
//! scan line, so it never observes a half-drawn frame and never holds the
//! lock while shifting bits out.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use clepsydra_core::config::ScanLines;

use crate::bitmap::Bitmap;

pub struct SharedBitmap<M: RawMutex> {
    inner: Mutex<M, RefCell<Bitmap>>,
}

impl<M: RawMutex> SharedBitmap<M> {
    /// Create a dark frame `width` columns wide
    pub const fn new(width: usize) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Bitmap::new(width))),
        }
    }

    /// Replace the shared frame with `bitmap`
    pub fn publish(&self, bitmap: &Bitmap) {
        self.inner.lock(|cell| cell.borrow_mut().copy_from(bitmap));
    }

    /// Data words for scan row `row`
    pub fn scan_words(&self, row: usize, scan_lines: ScanLines) -> (u64, u64) {
        self.inner
            .lock(|cell| cell.borrow().scan_words(row, scan_lines))
    }

    /// Copy of the whole frame
    pub fn snapshot(&self) -> Bitmap {
        self.inner.lock(|cell| *cell.borrow())
    }

    pub fn width(&self) -> usize {
        self.inner.lock(|cell| cell.borrow().width())
    }
}
