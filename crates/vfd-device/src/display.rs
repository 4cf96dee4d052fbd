//! Display façade: framebuffer plus backing store, transmitting only the
//! columns that changed since the previous flush.

use std::path::{Path, PathBuf};

use chrono::Timelike;
use tracing::{debug, info};
use vfd_font::{FontError, VfdFont};
use vfd_raster::Raster;

use crate::link::{LinkError, VfdLink};
use crate::proto;
use crate::transport::Transport;

/// How a string relates to the horizontal space it was drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFit {
    /// Nothing was drawn (no font loaded).
    None,
    /// The visible part ends on screen at the given offset.
    Fits,
    /// Text continues past the right edge at the given offset.
    Wider,
}

/// Everything needed to bring the display up.
#[derive(Debug, Clone)]
pub struct DisplayOptions {
    pub width: i32,
    pub height: i32,
    /// Path to a TrueType face.
    pub font: PathBuf,
    /// Two text lines instead of one; selects the small pixel size.
    pub dual_line: bool,
    pub big_px: i32,
    pub small_px: i32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            width: 96,
            height: 16,
            font: PathBuf::new(),
            dual_line: false,
            big_px: 14,
            small_px: 7,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error(transparent)]
    Font(#[from] FontError),
    #[error(transparent)]
    Link(#[from] LinkError),
    /// The initial reset could not be written to the device.
    #[error("device write failed during open")]
    Reset,
}

/// One Targa VFD.
///
/// Drawing operations touch only the in-memory framebuffer; [`flush`]
/// compares it column by column against the backing store (the last state
/// known to be on the device) and transmits the minimal contiguous window.
///
/// [`flush`]: Display::flush
pub struct Display<L: VfdLink> {
    transport: Transport<L>,
    framebuf: Raster,
    backingstore: Raster,
    font: Option<VfdFont>,
    last_icon_state: u32,
    row_bytes: i32,
}

impl<L: VfdLink> Default for Display<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: VfdLink> Display<L> {
    pub fn new() -> Self {
        Display {
            transport: Transport::new(),
            framebuf: Raster::new(0, 0),
            backingstore: Raster::new(0, 0),
            font: None,
            last_icon_state: 0,
            row_bytes: 0,
        }
    }

    /// Load the font, bind the link, reset the device.
    pub fn open(&mut self, link: L, opts: &DisplayOptions) -> Result<(), DisplayError> {
        self.set_font(&opts.font, opts.dual_line, opts.big_px, opts.small_px)?;
        self.open_with_font(link, opts.width, opts.height)
    }

    /// Bind the link without touching the current font (set one with
    /// [`use_font`] when no face file is involved).
    ///
    /// [`use_font`]: Display::use_font
    pub fn open_with_font(&mut self, link: L, width: i32, height: i32) -> Result<(), DisplayError> {
        self.transport.open(link);
        self.framebuf = Raster::new(width, height);
        self.backingstore = Raster::new(width, height);
        // Desynchronize the backing store so the first flush after open
        // always transmits, even for a blank frame.
        self.backingstore.set_pixel(0, 0);
        self.row_bytes = (height + 7) / 8;
        self.last_icon_state = 0;
        self.transport.queue_cmd(proto::CMD_RESET);
        if !self.transport.flush() {
            return Err(DisplayError::Reset);
        }
        info!(width, height, "display opened");
        Ok(())
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Build the replacement font first; the current one stays in place if
    /// loading fails.
    pub fn set_font(
        &mut self,
        path: &Path,
        dual_line: bool,
        big_px: i32,
        small_px: i32,
    ) -> Result<(), DisplayError> {
        let px = if dual_line { small_px } else { big_px };
        let font = VfdFont::load(path, px)?;
        debug!(?path, px, "font loaded");
        self.font = Some(font);
        Ok(())
    }

    /// Install an already built font.
    pub fn use_font(&mut self, font: VfdFont) {
        self.font = Some(font);
    }

    pub fn width(&self) -> i32 {
        self.framebuf.width()
    }

    pub fn height(&self) -> i32 {
        self.framebuf.height()
    }

    /// Line height of the loaded font, 0 without one.
    pub fn font_height(&self) -> i32 {
        self.font.as_ref().map_or(0, |f| f.height())
    }

    /// Pixel width `s` would occupy, 0 without a font.
    pub fn text_width(&mut self, s: &str) -> i32 {
        self.font.as_mut().map_or(0, |f| f.width_of(s))
    }

    /// Probe one framebuffer pixel (drawn, not necessarily transmitted).
    pub fn pixel(&self, x: i32, y: i32) -> bool {
        self.framebuf.pixel(x, y)
    }

    pub fn clear(&mut self) {
        self.framebuf.clear();
    }

    pub fn rectangle(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, filled: bool) {
        self.framebuf.rectangle(x1, y1, x2, y2, filled);
    }

    /// Draw `s` at `(x, y)`; returns the x position reached, -1 without a
    /// font.
    pub fn draw_text(&mut self, x: i32, y: i32, s: &str) -> i32 {
        let Some(font) = self.font.as_mut() else {
            return -1;
        };
        font.draw_text(&mut self.framebuf, x, y, s, 0)
    }

    /// Draw `s`, replacing the tail with "..." when it would not fit into
    /// `max_width` pixels.
    pub fn draw_text_ellipsized(&mut self, x: i32, y: i32, s: &str, max_width: i32) -> i32 {
        let Some(font) = self.font.as_mut() else {
            return -1;
        };
        if font.width_of(s) <= max_width {
            return font.draw_text(&mut self.framebuf, x, y, s, 0);
        }
        let bound = x + max_width - font.width_of("...");
        let reached = if bound > 0 {
            font.draw_text(&mut self.framebuf, x, y, s, bound)
        } else {
            x
        };
        font.draw_text(&mut self.framebuf, reached, y, "...", 0)
    }

    /// Draw `s` shifted left by `offset` pixels when it is wider than the
    /// remaining screen, centered (optionally) when it is not.
    ///
    /// The returned fit tells the caller's scroll machine whether more text
    /// hides past the right edge at this offset.
    pub fn draw_text_scrolled(
        &mut self,
        x: i32,
        y: i32,
        s: &str,
        centered: bool,
        offset: i32,
    ) -> TextFit {
        let width = self.framebuf.width();
        let Some(font) = self.font.as_mut() else {
            return TextFit::None;
        };
        let text_width = font.width_of(s);
        if text_width <= width - x {
            let x0 = if centered {
                x + (width - x - text_width) / 2
            } else {
                x
            };
            font.draw_text(&mut self.framebuf, x0, y, s, 0);
            TextFit::Fits
        } else {
            font.draw_text(&mut self.framebuf, x - offset, y, s, 0);
            if text_width - offset > width - x {
                TextFit::Wider
            } else {
                TextFit::Fits
            }
        }
    }

    /// Queue symbol commands for every icon bit that differs from the last
    /// transmitted state. Takes effect at the next flush.
    pub fn icons(&mut self, mask: u32) {
        for i in 0..proto::icon::COUNT {
            let bit = 1u32 << i;
            if (mask ^ self.last_icon_state) & bit != 0 {
                self.transport.queue_cmd(proto::CMD_SET_SYMBOL);
                self.transport.queue_data(i as u8);
                self.transport.queue_data(if mask & bit != 0 {
                    proto::STATE_ON
                } else {
                    proto::STATE_OFF
                });
            }
        }
        self.last_icon_state = mask;
    }

    /// Queue a dimming command, clamped to the device's three levels.
    /// Takes effect at the next flush.
    pub fn brightness(&mut self, level: i32) {
        self.transport.queue_cmd(proto::CMD_SET_DIMM);
        self.transport.queue_data(level.clamp(0, 2) as u8);
    }

    /// Transmit framebuffer changes (every column with `force_all`) and
    /// drain the queue. Returns `false` when the device is gone.
    pub fn flush(&mut self, force_all: bool) -> bool {
        if !self.transport.is_open() {
            return false;
        }
        let width = self.framebuf.width();
        let rb = self.row_bytes as usize;

        let (min_x, max_x) = {
            let fb = self.framebuf.data();
            let bs = self.backingstore.data();
            let mut min_x = width;
            let mut max_x = 0;
            for x in 0..width {
                let xs = x as usize;
                let changed = force_all
                    || (0..rb).any(|r| fb[xs + r * width as usize] != bs[xs + r * width as usize]);
                if changed {
                    min_x = min_x.min(x);
                    max_x = x + 1;
                }
            }
            (min_x, max_x)
        };

        if min_x < max_x {
            self.transport.queue_cmd(proto::CMD_SET_RAM);
            self.transport.queue_data((min_x * self.row_bytes) as u8);
            self.transport.queue_cmd(proto::CMD_SET_PIXEL);
            self.transport
                .queue_data(((max_x - min_x) * self.row_bytes) as u8);
            for x in min_x..max_x {
                for r in 0..rb {
                    let byte = self.framebuf.data()[x as usize + r * width as usize];
                    self.transport.queue_data(byte);
                }
            }
            self.backingstore.copy_from(&self.framebuf);
            debug!(min_x, max_x, "transmitting changed columns");
        }
        self.transport.flush()
    }

    /// Synchronize the device clock and show the big clock face.
    pub fn send_cmd_clock(&mut self) -> bool {
        let now = chrono::Local::now();
        self.transport.queue_cmd(proto::CMD_SET_CLOCK);
        self.transport.queue_data(proto::to_bcd(now.minute()));
        self.transport.queue_data(proto::to_bcd(now.hour()));
        self.transport.queue_cmd(proto::CMD_BIG_CLOCK);
        self.transport.queue_data(proto::TIME_24);
        self.transport.flush()
    }

    /// Reset the device to its idle state (clears screen and symbols).
    pub fn send_cmd_shutdown(&mut self) -> bool {
        self.transport.queue_cmd(proto::CMD_RESET);
        self.transport.flush()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::proto::icon;
    use crate::testing::{decode_commands, CaptureLink};
    use vfd_font::testing::BoxGlyphs;

    fn open_display(link: &CaptureLink) -> Display<CaptureLink> {
        let mut d = Display::new();
        d.use_font(VfdFont::with_source(Box::new(BoxGlyphs::default()), 12));
        d.open_with_font(link.clone(), 96, 16).unwrap();
        d
    }

    /// Open and run the first full flush so the backing store is in sync,
    /// then drop the captured traffic.
    fn synced_display(link: &CaptureLink) -> Display<CaptureLink> {
        let mut d = open_display(link);
        assert!(d.flush(false));
        link.reset();
        d
    }

    #[test]
    fn test_open_resets_device() {
        let link = CaptureLink::new();
        let _d = open_display(&link);
        assert_eq!(link.frames(), vec![vec![2, 0x1b, 0x50]]);
    }

    #[test]
    fn test_first_flush_transmits_even_blank_frame() {
        let link = CaptureLink::new();
        let mut d = open_display(&link);
        link.reset();
        assert!(d.flush(false));
        let cmds = decode_commands(&link.payload());
        assert_eq!(cmds[0], (proto::CMD_SET_RAM, vec![0]));
        assert_eq!(cmds[1].0, proto::CMD_SET_PIXEL);
    }

    #[test]
    fn test_flush_without_changes_is_silent() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        assert!(d.flush(false));
        assert!(link.frames().is_empty());
    }

    #[test]
    fn test_flush_minimal_column_window() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        d.framebuf.set_pixel(10, 3);
        d.framebuf.set_pixel(20, 12);
        assert!(d.flush(false));

        let cmds = decode_commands(&link.payload());
        // Window covers columns 10..21 at two bytes per column.
        assert_eq!(cmds[0], (proto::CMD_SET_RAM, vec![20]));
        assert_eq!(cmds[1].0, proto::CMD_SET_PIXEL);
        let data = &cmds[1].1;
        assert_eq!(data[0], 22);
        assert_eq!(data.len(), 23);
        assert_eq!(data[1], 0x80 >> 3, "column 10, rows 0..8");
        assert_eq!(data[2], 0x00, "column 10, rows 8..16");
        assert_eq!(data[2 * 10 + 2], 0x80 >> 4, "column 20, rows 8..16");

        // Committed: the same content causes no further traffic.
        link.reset();
        assert!(d.flush(false));
        assert!(link.frames().is_empty());
    }

    #[test]
    fn test_flush_force_all_sends_full_width() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        assert!(d.flush(true));
        let cmds = decode_commands(&link.payload());
        assert_eq!(cmds[0], (proto::CMD_SET_RAM, vec![0]));
        assert_eq!(cmds[1].1[0], 192, "96 columns, 2 bytes each");
    }

    #[test]
    fn test_flush_when_closed_fails() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        d.close();
        assert!(!d.is_open());
        assert!(!d.flush(true));
    }

    #[test]
    fn test_icons_transmit_only_changed_bits() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        d.icons(icon::PLAY | icon::MUTE);
        assert!(d.flush(false));
        let cmds = decode_commands(&link.payload());
        assert_eq!(
            cmds,
            vec![
                (proto::CMD_SET_SYMBOL, vec![0x00, proto::STATE_ON]),
                (proto::CMD_SET_SYMBOL, vec![0x05, proto::STATE_ON]),
            ]
        );

        link.reset();
        d.icons(icon::PLAY);
        assert!(d.flush(false));
        let cmds = decode_commands(&link.payload());
        assert_eq!(cmds, vec![(proto::CMD_SET_SYMBOL, vec![0x05, proto::STATE_OFF])]);

        // Same mask again: nothing to say.
        link.reset();
        d.icons(icon::PLAY);
        assert!(d.flush(false));
        assert!(link.frames().is_empty());
    }

    #[test]
    fn test_brightness_clamped_to_device_levels() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        d.brightness(9);
        d.brightness(-1);
        assert!(d.flush(false));
        let cmds = decode_commands(&link.payload());
        assert_eq!(
            cmds,
            vec![
                (proto::CMD_SET_DIMM, vec![proto::BRIGHT_FULL]),
                (proto::CMD_SET_DIMM, vec![proto::BRIGHT_OFF]),
            ]
        );
    }

    #[test]
    fn test_draw_text_without_font() {
        let mut d: Display<CaptureLink> = Display::new();
        assert_eq!(d.draw_text(0, 0, "x"), -1);
        assert_eq!(d.draw_text_scrolled(0, 0, "x", false, 0), TextFit::None);
        assert_eq!(d.text_width("x"), 0);
        assert_eq!(d.font_height(), 0);
    }

    #[test]
    fn test_draw_text_ellipsized_truncates() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        // 20 box glyphs at 6 px do not fit into 60 px.
        let long = "abcdefghijklmnopqrst";
        let reached = d.draw_text_ellipsized(0, 2, long, 60);
        assert!(reached <= 60, "ellipsized text stays inside the limit");
        let dots = d.text_width("...");
        assert!(reached > 60 - 2 * dots, "the ellipsis itself was drawn");

        d.clear();
        let short = d.draw_text_ellipsized(0, 2, "ab", 60);
        assert_eq!(short, d.text_width("ab"));
    }

    #[test]
    fn test_draw_text_scrolled_fit_states() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        assert_eq!(d.draw_text_scrolled(0, 2, "abc", false, 0), TextFit::Fits);

        // 30 glyphs * 6 px = 180 px against a 96 px screen.
        let long = "a".repeat(30);
        assert_eq!(d.draw_text_scrolled(0, 2, &long, false, 0), TextFit::Wider);
        assert_eq!(d.draw_text_scrolled(0, 2, &long, false, 82), TextFit::Wider);
        assert_eq!(d.draw_text_scrolled(0, 2, &long, false, 84), TextFit::Fits);
    }

    #[test]
    fn test_draw_text_scrolled_centers_fitting_text() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        d.draw_text_scrolled(0, 2, "ab", true, 0);
        // 12 px of text on 96 px: first glyph starts at x = 42.
        assert!(d.framebuf.pixel(42, 4));
        assert!(!d.framebuf.pixel(0, 4));
    }

    #[test]
    fn test_send_cmd_clock_stream() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        assert!(d.send_cmd_clock());
        let cmds = decode_commands(&link.payload());
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].0, proto::CMD_SET_CLOCK);
        for &b in &cmds[0].1 {
            assert!(b & 0x0f < 10 && b >> 4 < 10, "BCD digits");
        }
        assert_eq!(cmds[1], (proto::CMD_BIG_CLOCK, vec![proto::TIME_24]));
    }

    #[test]
    fn test_send_cmd_shutdown_resets() {
        let link = CaptureLink::new();
        let mut d = synced_display(&link);
        assert!(d.send_cmd_shutdown());
        let cmds = decode_commands(&link.payload());
        assert_eq!(cmds, vec![(proto::CMD_RESET, vec![])]);
    }

    #[test]
    fn test_open_fails_on_dead_link() {
        let mut d: Display<CaptureLink> = Display::new();
        d.use_font(VfdFont::with_source(Box::new(BoxGlyphs::default()), 12));
        let err = d.open_with_font(CaptureLink::failing_after(0), 96, 16);
        assert!(matches!(err, Err(DisplayError::Reset)));
    }
}
