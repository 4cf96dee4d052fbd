//! Horizontal scroll state machine for text wider than the panel.

use vfd_device::TextFit;

/// Pixels the offset moves per tick.
const STEP: i32 = 2;

/// Tracks the scroll offset of the current body text.
///
/// Armed by [`restart`], the offset advances while the text hangs past the
/// right edge, reverses once the tail becomes visible, and stops for good
/// when it is back at 0. Only a restart (new content, font change, forced
/// redraw) arms it again.
///
/// [`restart`]: Scroller::restart
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Scroller {
    offset: i32,
    backward: bool,
    needed: bool,
}

impl Scroller {
    /// Reset to the left edge and arm scrolling for new content.
    pub fn restart(&mut self) {
        self.offset = 0;
        self.backward = false;
        self.needed = true;
    }

    /// Current pixel offset; the body is drawn at `x - offset()`.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// True while an animation is in flight, forcing ticks to redraw even
    /// when nothing else changed.
    pub fn moving(&self) -> bool {
        self.offset > 0 || self.backward
    }

    /// Advance one tick based on how the text fit at the current offset.
    pub fn step(&mut self, fit: TextFit) {
        if !self.needed {
            return;
        }
        match fit {
            TextFit::None => self.stop(),
            TextFit::Fits => {
                // Tail reached: either we never moved (text simply fits)
                // or it is time to scroll back.
                if self.offset <= 0 {
                    self.stop();
                } else {
                    self.backward = true;
                    self.advance();
                }
            }
            TextFit::Wider => self.advance(),
        }
    }

    fn advance(&mut self) {
        self.offset += if self.backward { -STEP } else { STEP };
        if self.offset < 0 {
            self.stop();
        }
    }

    fn stop(&mut self) {
        self.offset = 0;
        self.backward = false;
        self.needed = false;
    }
}
