//! Cached monochrome glyph with metrics and a per-glyph kerning cache.

use crate::source::RawGlyph;

/// Coverage at or above this threshold becomes a lit pixel.
const MONO_THRESHOLD: u8 = 0x80;

/// A rasterized, thresholded glyph owned by a font's glyph cache.
///
/// The bitmap is 1 bpp, rows padded to whole bytes (`pitch` bytes per row,
/// most significant bit leftmost). Kerning against preceding codepoints is
/// computed once and memoized in an insertion-ordered list; the list stays
/// tiny in practice (status text reuses few pairs), so a linear scan beats
/// a map here.
#[derive(Debug, Clone)]
pub struct Glyph {
    code: char,
    bitmap: Vec<u8>,
    advance_x: i32,
    advance_y: i32,
    left: i32,
    top: i32,
    width: i32,
    rows: i32,
    pitch: usize,
    kerning_cache: Vec<(char, i32)>,
}

impl Glyph {
    /// Threshold an 8-bit coverage bitmap down to the device's 1-bpp format.
    pub fn new(code: char, raw: &RawGlyph) -> Self {
        let pitch = (raw.width + 7) / 8;
        let mut bitmap = vec![0u8; pitch * raw.height];
        for row in 0..raw.height {
            for col in 0..raw.width {
                if raw.coverage[row * raw.width + col] >= MONO_THRESHOLD {
                    bitmap[row * pitch + col / 8] |= 0x80 >> (col % 8);
                }
            }
        }
        Glyph {
            code,
            bitmap,
            advance_x: raw.advance_x.round() as i32,
            advance_y: raw.advance_y.round() as i32,
            left: raw.xmin,
            top: raw.top_bearing(),
            width: raw.width as i32,
            rows: raw.height as i32,
            pitch,
            kerning_cache: Vec::new(),
        }
    }

    pub fn code(&self) -> char {
        self.code
    }

    pub fn bitmap(&self) -> &[u8] {
        &self.bitmap
    }

    pub fn advance_x(&self) -> i32 {
        self.advance_x
    }

    pub fn advance_y(&self) -> i32 {
        self.advance_y
    }

    /// Left bearing in pixels.
    pub fn left(&self) -> i32 {
        self.left
    }

    /// Top bearing: baseline to top bitmap row.
    pub fn top(&self) -> i32 {
        self.top
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    /// Bytes per bitmap row, including padding.
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Cached kerning against `prev`, if this pair was seen before.
    pub fn cached_kerning(&self, prev: char) -> Option<i32> {
        self.kerning_cache
            .iter()
            .find(|&&(p, _)| p == prev)
            .map(|&(_, k)| k)
    }

    pub fn cache_kerning(&mut self, prev: char, kerning: i32) {
        self.kerning_cache.push((prev, kerning));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn raw(width: usize, height: usize, fill: u8) -> RawGlyph {
        RawGlyph {
            coverage: vec![fill; width * height],
            width,
            height,
            xmin: 1,
            ymin: -2,
            advance_x: 6.4,
            advance_y: 0.0,
        }
    }

    #[test]
    fn test_threshold_to_mono() {
        let g = Glyph::new('a', &raw(10, 2, 0xff));
        assert_eq!(g.pitch(), 2);
        assert_eq!(g.bitmap(), &[0xff, 0xc0, 0xff, 0xc0]);

        let faint = Glyph::new('a', &raw(10, 2, 0x10));
        assert!(faint.bitmap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_metrics() {
        let g = Glyph::new('g', &raw(10, 8, 0xff));
        assert_eq!(g.advance_x(), 6);
        assert_eq!(g.left(), 1);
        // height + ymin: 8 - 2.
        assert_eq!(g.top(), 6);
        assert_eq!(g.rows(), 8);
    }

    #[test]
    fn test_kerning_cache() {
        let mut g = Glyph::new('v', &raw(4, 4, 0xff));
        assert_eq!(g.cached_kerning('a'), None);
        g.cache_kerning('a', -1);
        g.cache_kerning('w', 0);
        assert_eq!(g.cached_kerning('a'), Some(-1));
        assert_eq!(g.cached_kerning('w'), Some(0));
        assert_eq!(g.cached_kerning('x'), None);
    }
}
