//! Byte protocol of the Targa VFD.
//!
//! Every drawing/control operation on the wire is `0x1B, <opcode>,
//! [<data>]`. These values are fixed by the device firmware.

/// Escape byte preceding every opcode.
pub const CMD_PREFIX: u8 = 0x1b;
/// Actualize the time of the display.
pub const CMD_SET_CLOCK: u8 = 0x00;
/// Display the small clock.
pub const CMD_SMALL_CLOCK: u8 = 0x01;
/// Display the big clock.
pub const CMD_BIG_CLOCK: u8 = 0x02;
/// Enable or disable a symbol (icon index, state byte).
pub const CMD_SET_SYMBOL: u8 = 0x30;
/// Set the dimming level (0/1/2).
pub const CMD_SET_DIMM: u8 = 0x40;
/// Reset all configuration data to default and clear.
pub const CMD_RESET: u8 = 0x50;
/// Set the graphics RAM offset for the next data write.
pub const CMD_SET_RAM: u8 = 0x60;
/// Write pixel data to the display RAM (byte count, then payload).
pub const CMD_SET_PIXEL: u8 = 0x70;
/// Show the vertical test pattern.
pub const CMD_TEST1: u8 = 0xf0;
/// Show the horizontal test pattern.
pub const CMD_TEST2: u8 = 0xf1;

/// Symbol off.
pub const STATE_OFF: u8 = 0x00;
/// Symbol on.
pub const STATE_ON: u8 = 0x01;
/// Symbol on at high intensity; volume symbols only.
pub const STATE_ON_HIGH: u8 = 0x02;

/// 12-hour clock format.
pub const TIME_12: u8 = 0x00;
/// 24-hour clock format.
pub const TIME_24: u8 = 0x01;

/// Display off.
pub const BRIGHT_OFF: u8 = 0x00;
/// Display dimmed.
pub const BRIGHT_DIMM: u8 = 0x01;
/// Display at full brightness.
pub const BRIGHT_FULL: u8 = 0x02;

/// Pack `0..=99` as BCD for the clock commands.
pub fn to_bcd(x: u32) -> u8 {
    ((x / 10 * 16) + (x % 10)) as u8
}

/// Icon bitmask positions, one bit per symbol around the display edge.
///
/// The bit position doubles as the device's symbol index for
/// [`CMD_SET_SYMBOL`].
pub mod icon {
    pub const NONE: u32 = 0;
    pub const PLAY: u32 = 1 << 0x00;
    pub const PAUSE: u32 = 1 << 0x01;
    pub const RECORD: u32 = 1 << 0x02;
    /// Message symbol (without the inner @).
    pub const MESSAGE: u32 = 1 << 0x03;
    /// Message @.
    pub const MSG_AT: u32 = 1 << 0x04;
    pub const MUTE: u32 = 1 << 0x05;
    /// WLAN tower base.
    pub const WLAN1: u32 = 1 << 0x06;
    /// WLAN strength 1..3 of 3.
    pub const WLAN2: u32 = 1 << 0x07;
    pub const WLAN3: u32 = 1 << 0x08;
    pub const WLAN4: u32 = 1 << 0x09;
    /// The word "Volume".
    pub const VOLUME: u32 = 1 << 0x0a;
    /// Volume level 1 of 14; levels 2..14 follow at the next bits.
    pub const VOL1: u32 = 1 << 0x0b;

    /// Total number of addressable symbols.
    pub const COUNT: u32 = 25;
    /// Bit position of the first volume-bar icon.
    pub const VOLUME_BAR_SHIFT: u32 = 0x0b;
    /// Number of discrete volume bars.
    pub const VOLUME_BARS: u32 = 14;

    /// Bitmask showing `n` of the 14 volume bars.
    pub fn volume_bars(n: u32) -> u32 {
        let n = n.min(VOLUME_BARS);
        ((1u32 << n) - 1) << VOLUME_BAR_SHIFT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bcd() {
        assert_eq!(to_bcd(0), 0x00);
        assert_eq!(to_bcd(9), 0x09);
        assert_eq!(to_bcd(10), 0x10);
        assert_eq!(to_bcd(59), 0x59);
        assert_eq!(to_bcd(23), 0x23);
    }

    #[test]
    fn test_icon_bits_are_symbol_indices() {
        assert_eq!(icon::PLAY, 1);
        assert_eq!(icon::MUTE.trailing_zeros(), 0x05);
        assert_eq!(icon::VOL1.trailing_zeros(), icon::VOLUME_BAR_SHIFT);
        // Highest symbol index is 0x18.
        assert_eq!(icon::VOLUME_BAR_SHIFT + icon::VOLUME_BARS - 1, 0x18);
        assert_eq!(icon::COUNT, 25);
    }

    #[test]
    fn test_volume_bars_mask() {
        assert_eq!(icon::volume_bars(0), 0);
        assert_eq!(icon::volume_bars(1), icon::VOL1);
        assert_eq!(icon::volume_bars(14).count_ones(), 14);
        // Clamped, never spills past the last symbol.
        assert_eq!(icon::volume_bars(99), icon::volume_bars(14));
    }
}
