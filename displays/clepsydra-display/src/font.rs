//! 5×7 digit glyphs

/// Glyph width in columns
pub const GLYPH_WIDTH: usize = 5;

/// Glyph height in rows
pub const GLYPH_HEIGHT: usize = 7;

/// Digits 0-9, one byte per row, bit 4 is the leftmost column
const DIGITS: [[u8; GLYPH_HEIGHT]; 10] = [
    [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E], // 0
    [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E], // 1
    [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F], // 2
    [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E], // 3
    [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02], // 4
    [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E], // 5
    [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E], // 6
    [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08], // 7
    [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E], // 8
    [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C], // 9
];

/// Row bitmaps for a decimal digit
pub fn digit(d: u8) -> Option<&'static [u8; GLYPH_HEIGHT]> {
    DIGITS.get(d as usize)
}

/// Whether pixel (`x`, `y`) of a glyph is lit
pub fn pixel(glyph: &[u8; GLYPH_HEIGHT], x: usize, y: usize) -> bool {
    x < GLYPH_WIDTH && y < GLYPH_HEIGHT && glyph[y] & (1 << (GLYPH_WIDTH - 1 - x)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyphs_fit_five_columns() {
        for d in 0..10 {
            let glyph = digit(d).unwrap();
            assert!(glyph.iter().all(|&row| row < (1 << GLYPH_WIDTH)));
            assert!(glyph.iter().any(|&row| row != 0));
        }
        assert!(digit(10).is_none());
    }

    #[test]
    fn test_pixel_orientation() {
        let one = digit(1).unwrap();
        // Stem of the 1 sits in the middle column
        assert!(pixel(one, 2, 3));
        assert!(!pixel(one, 0, 3));
        assert!(!pixel(one, 5, 0));
    }
}
