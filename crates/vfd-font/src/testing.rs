//! Deterministic glyph source for layout tests and headless emulation.

use crate::source::{GlyphSource, RawGlyph};

/// Renders every codepoint as a solid 5x8 box with a 6 px advance.
///
/// Good enough to exercise caching, kerning, clipping and scroll math
/// without a font file on disk.
pub struct BoxGlyphs {
    glyph_width: usize,
    glyph_height: usize,
    advance: i32,
    line_metrics: Option<(i32, i32)>,
    kerning: Vec<(char, char, i32)>,
    missing: Vec<char>,
}

impl Default for BoxGlyphs {
    fn default() -> Self {
        BoxGlyphs {
            glyph_width: 5,
            glyph_height: 8,
            advance: 6,
            // 12 px line, 2 px descender - a plausible "big" VFD font.
            line_metrics: Some((12, 2)),
            kerning: Vec::new(),
            missing: Vec::new(),
        }
    }
}

impl BoxGlyphs {
    /// A fixed face: no line metrics, forcing the descender scan.
    pub fn fixed() -> Self {
        BoxGlyphs {
            line_metrics: None,
            ..BoxGlyphs::default()
        }
    }

    /// Declare a kerning pair `(prev, c) -> px`.
    pub fn with_kerning(mut self, prev: char, c: char, px: i32) -> Self {
        self.kerning.push((prev, c, px));
        self
    }

    /// Declare `c` unrasterizable.
    pub fn without(mut self, c: char) -> Self {
        self.missing.push(c);
        self
    }
}

impl GlyphSource for BoxGlyphs {
    fn rasterize(&self, c: char) -> Option<RawGlyph> {
        if self.missing.contains(&c) {
            return None;
        }
        Some(RawGlyph {
            coverage: vec![0xff; self.glyph_width * self.glyph_height],
            width: self.glyph_width,
            height: self.glyph_height,
            xmin: 0,
            // Boxes sit on the baseline.
            ymin: 0,
            advance_x: self.advance as f32,
            advance_y: 0.0,
        })
    }

    fn kern(&self, prev: char, c: char) -> i32 {
        self.kerning
            .iter()
            .find(|&&(p, n, _)| p == prev && n == c)
            .map_or(0, |&(_, _, k)| k)
    }

    fn line_metrics(&self) -> Option<(i32, i32)> {
        self.line_metrics
    }
}
