//! Bit-packed 1-bpp framebuffer mirroring the Targa VFD graphics RAM.
//!
//! The device packs pixels into *vertical* bytes: eight stacked rows share
//! one byte, and byte `x + (y / 8) * width` holds pixel `(x, y)` at bit
//! `0x80 >> (y % 8)`. This is not a generic row-major bitmap layout - it is
//! the layout the display's set-pixel-data command expects, so it must be
//! preserved bit for bit. Drawing primitives are deliberately simple
//! (repeated `set_pixel`), matching how little pixel traffic a 96x16 panel
//! actually sees.

/// In-memory pixel grid shaped like the device's displayable area.
///
/// A raster with zero area owns no buffer; all drawing on it fails silently.
/// Equality compares dimensions and buffer bytes, nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: i32,
    height: i32,
    bytes_per_line: usize,
    bits: Vec<u8>,
}

fn sort(a: &mut i32, b: &mut i32) {
    if a > b {
        core::mem::swap(a, b);
    }
}

impl Raster {
    /// Create a zero-filled raster of `width` x `height` pixels.
    ///
    /// Lines are byte aligned: `bytes_per_line == ceil(width / 8)`. Either
    /// dimension being zero (or negative) yields an empty, bufferless raster.
    pub fn new(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let bytes_per_line = (width as usize + 7) / 8;
        let bits = if height > 0 && bytes_per_line > 0 {
            vec![0u8; bytes_per_line * height as usize]
        } else {
            Vec::new()
        };
        Raster {
            width,
            height,
            bytes_per_line,
            bits,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Raw buffer in device byte order.
    pub fn data(&self) -> &[u8] {
        &self.bits
    }

    /// Clear every pixel. A zero-area raster is a no-op, not an error.
    pub fn clear(&mut self) {
        self.bits.fill(0);
    }

    /// Set the pixel at `(x, y)`.
    ///
    /// Returns `false` without mutating anything when the coordinate is out
    /// of bounds or the raster owns no buffer.
    pub fn set_pixel(&mut self, x: i32, y: i32) -> bool {
        if self.bits.is_empty() {
            return false;
        }
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return false;
        }
        // Vertical byte packing; fixed device protocol, see module docs.
        let n = x as usize + (y as usize / 8) * self.width as usize;
        let bit = 0x80u8 >> (y as usize % 8);
        match self.bits.get_mut(n) {
            Some(byte) => {
                *byte |= bit;
                true
            }
            None => false,
        }
    }

    /// Read back the pixel at `(x, y)`; out of bounds reads as unset.
    pub fn pixel(&self, x: i32, y: i32) -> bool {
        if x < 0 || x >= self.width || y < 0 || y >= self.height {
            return false;
        }
        let n = x as usize + (y as usize / 8) * self.width as usize;
        let bit = 0x80u8 >> (y as usize % 8);
        self.bits.get(n).is_some_and(|byte| byte & bit != 0)
    }

    /// Horizontal line from `x1` to `x2` (either order) on row `y`.
    pub fn hline(&mut self, mut x1: i32, y: i32, mut x2: i32) -> bool {
        sort(&mut x1, &mut x2);
        for x in x1..=x2 {
            if !self.set_pixel(x, y) {
                return false;
            }
        }
        true
    }

    /// Vertical line from `y1` to `y2` (either order) in column `x`.
    pub fn vline(&mut self, x: i32, mut y1: i32, mut y2: i32) -> bool {
        sort(&mut y1, &mut y2);
        for y in y1..=y2 {
            if !self.set_pixel(x, y) {
                return false;
            }
        }
        true
    }

    /// Rectangle between two corners, outlined or filled.
    pub fn rectangle(&mut self, x1: i32, mut y1: i32, x2: i32, mut y2: i32, filled: bool) -> bool {
        if !filled {
            return self.hline(x1, y1, x2)
                && self.vline(x1, y1, y2)
                && self.hline(x1, y2, x2)
                && self.vline(x2, y1, y2);
        }
        sort(&mut y1, &mut y2);
        for y in y1..=y2 {
            if !self.hline(x1, y, x2) {
                return false;
            }
        }
        true
    }

    /// Make `self` a byte-for-byte copy of `other`, reallocating when the
    /// dimensions differ.
    pub fn copy_from(&mut self, other: &Raster) {
        if self.width != other.width || self.height != other.height {
            *self = Raster::new(other.width, other.height);
        }
        self.bits.copy_from_slice(&other.bits);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::indexing_slicing)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_raster_creation() {
        let r = Raster::new(96, 16);
        assert_eq!(r.width(), 96);
        assert_eq!(r.height(), 16);
        // 12 byte-aligned line bytes * 16 rows.
        assert_eq!(r.data().len(), 12 * 16);
        assert!(r.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zero_area_owns_no_buffer() {
        assert!(Raster::new(0, 0).data().is_empty());
        assert!(Raster::new(96, 0).data().is_empty());
        assert!(Raster::new(0, 16).data().is_empty());
    }

    #[test]
    fn test_set_pixel_round_trip() {
        let mut r = Raster::new(96, 16);
        for y in 0..16 {
            for x in 0..96 {
                assert!(r.set_pixel(x, y), "set_pixel({x},{y})");
                assert!(r.pixel(x, y), "pixel({x},{y})");
            }
        }
    }

    #[test]
    fn test_set_pixel_out_of_bounds() {
        let mut r = Raster::new(96, 16);
        assert!(!r.set_pixel(-1, 0));
        assert!(!r.set_pixel(0, -1));
        assert!(!r.set_pixel(96, 0));
        assert!(!r.set_pixel(0, 16));
        assert!(r.data().iter().all(|&b| b == 0), "oob write mutated buffer");
    }

    #[test]
    fn test_set_pixel_on_empty_raster_fails() {
        let mut r = Raster::new(0, 0);
        assert!(!r.set_pixel(0, 0));
    }

    #[test]
    fn test_vertical_byte_packing() {
        // Device layout: byte x + (y/8)*width, bit 0x80 >> (y%8).
        let mut r = Raster::new(96, 16);
        assert!(r.set_pixel(3, 10));
        assert_eq!(r.data()[3 + 96], 0x80 >> 2);
        assert!(r.set_pixel(95, 7));
        assert_eq!(r.data()[95], 0x01);
        assert!(r.set_pixel(0, 8));
        assert_eq!(r.data()[96], 0x80);
    }

    #[test]
    fn test_clear() {
        let mut r = Raster::new(96, 16);
        r.rectangle(0, 0, 95, 15, true);
        r.clear();
        assert!(r.data().iter().all(|&b| b == 0));

        // 0x0: no-op, not an error.
        Raster::new(0, 0).clear();
    }

    #[test]
    fn test_lines_sort_coordinates() {
        let mut a = Raster::new(32, 16);
        let mut b = Raster::new(32, 16);
        assert!(a.hline(10, 3, 2));
        assert!(b.hline(2, 3, 10));
        assert_eq!(a, b);
        assert!(a.vline(5, 12, 1));
        assert!(b.vline(5, 1, 12));
        assert_eq!(a, b);
    }

    #[test]
    fn test_rectangle_outline_vs_filled() {
        let mut r = Raster::new(32, 16);
        assert!(r.rectangle(2, 2, 6, 6, false));
        assert!(r.pixel(2, 2) && r.pixel(6, 6) && r.pixel(2, 6) && r.pixel(6, 2));
        assert!(!r.pixel(4, 4));

        let mut f = Raster::new(32, 16);
        assert!(f.rectangle(6, 6, 2, 2, true));
        assert!(f.pixel(4, 4));
    }

    #[test]
    fn test_rectangle_out_of_bounds_fails() {
        let mut r = Raster::new(32, 16);
        assert!(!r.rectangle(30, 0, 40, 4, true));
    }

    #[test]
    fn test_equality_tracks_draw_calls() {
        let mut a = Raster::new(96, 16);
        let mut b = Raster::new(96, 16);
        assert_eq!(a, a.clone(), "equality is reflexive");
        assert_eq!(a, b);

        a.set_pixel(1, 1);
        assert_ne!(a, b);
        b.set_pixel(1, 1);
        assert_eq!(a, b);

        assert_ne!(Raster::new(96, 16), Raster::new(48, 16));
    }

    #[test]
    fn test_copy_from_reallocates() {
        let mut small = Raster::new(8, 8);
        let mut big = Raster::new(96, 16);
        big.set_pixel(50, 12);
        small.copy_from(&big);
        assert_eq!(small, big);
    }

    proptest! {
        #[test]
        fn prop_pixel_round_trip(x in -8i32..104, y in -8i32..24) {
            let mut r = Raster::new(96, 16);
            let inside = (0..96).contains(&x) && (0..16).contains(&y);
            prop_assert_eq!(r.set_pixel(x, y), inside);
            prop_assert_eq!(r.pixel(x, y), inside);
        }

        #[test]
        fn prop_single_pixel_sets_single_bit(x in 0i32..96, y in 0i32..16) {
            let mut r = Raster::new(96, 16);
            prop_assert!(r.set_pixel(x, y));
            let ones: u32 = r.data().iter().map(|b| b.count_ones()).sum();
            prop_assert_eq!(ones, 1);
            let n = x as usize + (y as usize / 8) * 96;
            prop_assert_eq!(r.data()[n], 0x80 >> (y % 8));
        }
    }
}
