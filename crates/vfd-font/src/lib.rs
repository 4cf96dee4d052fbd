//! Font engine for the Targa VFD: rasterizes codepoints to 1-bpp glyph
//! bitmaps, caches them per font, and lays UTF-8 text out into a
//! [`vfd_raster::Raster`] with kerning.
//!
//! Rasterization is hidden behind the [`GlyphSource`] trait so the layout
//! and caching logic can be exercised without a font file on disk; the
//! production source wraps `fontdue`.

mod engine;
mod glyph;
mod source;
pub mod testing;

pub use engine::VfdFont;
pub use glyph::Glyph;
pub use source::{FontdueSource, GlyphSource, RawGlyph};

/// Errors raised while loading a font face.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    /// The font file could not be read.
    #[error("unable to read font file: {0}")]
    Io(#[from] std::io::Error),
    /// The font file could not be parsed as a usable face.
    #[error("unable to parse font face: {0}")]
    Parse(&'static str),
}
