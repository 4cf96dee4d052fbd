//! Rasterization seam between the layout engine and the font library.

use std::path::Path;

use crate::FontError;

/// One freshly rasterized glyph: 8-bit coverage rows plus pixel metrics.
///
/// `ymin` is the offset of the bitmap's bottom edge from the baseline
/// (negative for descenders); the top bearing is `height as i32 + ymin`.
#[derive(Debug, Clone)]
pub struct RawGlyph {
    /// Row-major coverage, one byte per pixel, `width * height` long.
    pub coverage: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// Left bearing in pixels.
    pub xmin: i32,
    /// Bottom edge offset from the baseline in pixels.
    pub ymin: i32,
    pub advance_x: f32,
    pub advance_y: f32,
}

impl RawGlyph {
    /// Distance from the baseline up to the bitmap's top row.
    pub fn top_bearing(&self) -> i32 {
        self.height as i32 + self.ymin
    }
}

/// Per-codepoint rasterization and metrics provider.
///
/// Implemented by [`FontdueSource`] for real faces and by
/// [`crate::testing::BoxGlyphs`] for deterministic layout tests.
pub trait GlyphSource: Send {
    /// Rasterize `c`, or `None` when the face has no usable glyph for it.
    fn rasterize(&self, c: char) -> Option<RawGlyph>;

    /// Signed kerning in whole pixels between `prev` and `c` (0 when the
    /// face defines none).
    fn kern(&self, prev: char, c: char) -> i32;

    /// `(line_height_px, descender_px)` when the face reports scalable line
    /// metrics; `None` for fixed faces, which make the engine fall back to a
    /// synthetic descender scan.
    fn line_metrics(&self) -> Option<(i32, i32)>;
}

/// [`GlyphSource`] backed by a `fontdue` face at a fixed pixel size.
pub struct FontdueSource {
    font: fontdue::Font,
    px: f32,
}

impl FontdueSource {
    /// Load a face from `path` and bind it to `px` pixels.
    pub fn load(path: &Path, px: i32) -> Result<Self, FontError> {
        let bytes = std::fs::read(path)?;
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(FontError::Parse)?;
        Ok(FontdueSource {
            font,
            px: px as f32,
        })
    }
}

impl GlyphSource for FontdueSource {
    fn rasterize(&self, c: char) -> Option<RawGlyph> {
        // Index 0 is the missing-glyph placeholder; treat it as a
        // rasterization failure so the engine substitutes its fallback.
        if self.font.lookup_glyph_index(c) == 0 {
            return None;
        }
        let (metrics, coverage) = self.font.rasterize(c, self.px);
        Some(RawGlyph {
            coverage,
            width: metrics.width,
            height: metrics.height,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            advance_x: metrics.advance_width,
            advance_y: metrics.advance_height,
        })
    }

    fn kern(&self, prev: char, c: char) -> i32 {
        self.font
            .horizontal_kern(prev, c, self.px)
            .map_or(0, |k| k.round() as i32)
    }

    fn line_metrics(&self) -> Option<(i32, i32)> {
        let m = self.font.horizontal_line_metrics(self.px)?;
        // Whole-pixel line height and descender, rounded up like the
        // 26.6-fixed-point arithmetic the device driver historically used.
        let height = (m.ascent - m.descent).ceil() as i32;
        let bottom = m.descent.floor().abs() as i32;
        Some((height, bottom))
    }
}
