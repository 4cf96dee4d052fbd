//! Text layout: glyph cache, kerning, and drawing into the raster.

use std::path::Path;

use tracing::warn;
use vfd_raster::Raster;

use crate::glyph::Glyph;
use crate::source::{FontdueSource, GlyphSource};
use crate::FontError;

/// Substituted for codepoints whose glyph cannot be rasterized.
const UNKNOWN_GLYPH_INDICATOR: char = '?';

/// One loaded face bound to a pixel size, with its lazily grown glyph cache.
///
/// The cache is insertion-ordered, unique by codepoint and linearly scanned;
/// it grows on first use of a codepoint and never shrinks for the font's
/// lifetime.
pub struct VfdFont {
    height: i32,
    bottom: i32,
    source: Box<dyn GlyphSource>,
    glyph_cache: Vec<Glyph>,
}

impl VfdFont {
    /// Load the face at `path` sized to `px` pixels.
    pub fn load(path: &Path, px: i32) -> Result<Self, FontError> {
        let source = FontdueSource::load(path, px)?;
        Ok(Self::with_source(Box::new(source), px))
    }

    /// Build a font over an arbitrary glyph source.
    ///
    /// Scalable faces report line metrics directly. Fixed faces do not
    /// report a reliable descender, so it is recovered by scanning a
    /// representative character range and keeping the deepest underhang.
    pub fn with_source(source: Box<dyn GlyphSource>, px: i32) -> Self {
        let (height, bottom) = match source.line_metrics() {
            Some((height, bottom)) => (height, bottom),
            None => {
                let mut bottom = 0;
                for c in 'A'..='z' {
                    if let Some(raw) = source.rasterize(c) {
                        bottom = bottom.max(raw.height as i32 - raw.top_bearing());
                    }
                }
                (px, bottom)
            }
        };
        VfdFont {
            height,
            bottom,
            source,
            glyph_cache: Vec::new(),
        }
    }

    /// Line height in pixels.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Descender depth below the baseline in pixels.
    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    /// Advance width of a single codepoint (0 when it has no glyph at all).
    pub fn width_of_char(&mut self, c: char) -> i32 {
        self.glyph(c)
            .map_or(0, |i| self.glyph_cache[i].advance_x())
    }

    /// Pixel width of `s`: advance widths plus signed kerning between
    /// consecutive codepoints.
    pub fn width_of(&mut self, s: &str) -> i32 {
        let mut w = 0;
        let mut prev = None;
        for sym in s.chars() {
            if let Some(i) = self.glyph(sym) {
                let kerning = prev.map_or(0, |p| self.kerning(i, p));
                w += self.glyph_cache[i].advance_x() + kerning;
            }
            prev = Some(sym);
        }
        w
    }

    /// Draw `s` left to right with its baseline box anchored at `(x, y)`.
    ///
    /// Stops before a glyph that would exceed `max_width` (no partial
    /// glyphs) and before one that would run past the raster's right edge;
    /// both cases return the x position reached so far. Returns 0 when the
    /// font never loaded usable metrics.
    pub fn draw_text(&mut self, raster: &mut Raster, x: i32, y: i32, s: &str, max_width: i32) -> i32 {
        if self.height == 0 {
            return 0;
        }
        let mut x = x;
        let mut prev = None;
        for sym in s.chars() {
            let Some(i) = self.glyph(sym) else {
                continue;
            };
            let kerning = prev.map_or(0, |p| self.kerning(i, p));
            prev = Some(sym);

            let g = &self.glyph_cache[i];
            if max_width != 0 && x + g.width() + g.left() + kerning - 1 > max_width {
                return x;
            }
            if x + g.width() + g.left() + kerning > 0 {
                let row_base = y + self.height - self.bottom - g.top();
                for row in 0..g.rows() {
                    for pb in 0..g.pitch() {
                        let mut bits = g.bitmap()[row as usize * g.pitch() + pb];
                        for col in 0..8 {
                            let gx = col + (pb as i32) * 8;
                            if gx >= g.width() {
                                break;
                            }
                            if bits & 0x80 != 0 {
                                raster.set_pixel(x + gx + g.left() + kerning, row_base + row);
                            }
                            bits <<= 1;
                        }
                    }
                }
            }
            let advance = g.advance_x() + kerning;
            x += advance;
            if x > raster.width() - 1 {
                return x - advance;
            }
        }
        x
    }

    /// Cache index of the glyph for `c`, populating lazily.
    ///
    /// Non-breaking space maps to regular space before lookup. Codepoints
    /// the source cannot rasterize fall back to `'?'`; if even the fallback
    /// fails, `None` (the caller skips the character).
    fn glyph(&mut self, c: char) -> Option<usize> {
        let c = if c == '\u{a0}' { ' ' } else { c };

        if let Some(i) = self.glyph_cache.iter().position(|g| g.code() == c) {
            return Some(i);
        }
        match self.source.rasterize(c) {
            Some(raw) => {
                self.glyph_cache.push(Glyph::new(c, &raw));
                Some(self.glyph_cache.len() - 1)
            }
            None => {
                warn!(codepoint = %c.escape_unicode(), "no glyph, substituting fallback");
                if c != UNKNOWN_GLYPH_INDICATOR {
                    self.glyph(UNKNOWN_GLYPH_INDICATOR)
                } else {
                    None
                }
            }
        }
    }

    /// Kerning between the cached glyph at `i` and the preceding codepoint,
    /// computed once per (glyph, prev) pair.
    fn kerning(&mut self, i: usize, prev: char) -> i32 {
        if let Some(k) = self.glyph_cache[i].cached_kerning(prev) {
            return k;
        }
        let k = self.source.kern(prev, self.glyph_cache[i].code());
        self.glyph_cache[i].cache_kerning(prev, k);
        k
    }
}


#[cfg(test)]
impl VfdFont {
    fn cached_glyphs(&self) -> usize {
        self.glyph_cache.len()
    }
}
