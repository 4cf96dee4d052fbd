//! Runtime configuration for the watch loop.
//!
//! The host persists settings as untyped name/value pairs; [`Settings::set`]
//! accepts them one at a time, falling back to the default (with a warning)
//! whenever a value is out of range, so a stale or hand-edited settings file
//! never leaves the display unusable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;
use vfd_device::DisplayOptions;

/// What the display shows after the watch loop shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnExitMode {
    /// Leave the last rendered message on screen.
    ShowMessage,
    /// Show the device's big clock.
    ShowClock,
    /// Blank the device completely.
    BlankScreen,
    /// Show the next active timer, or a "none" notice.
    NextTimer,
    /// Show the next active timer, or blank if none is scheduled.
    NextTimerBlank,
}

/// When the volume bar graph is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMode {
    Never,
    /// For 15 seconds after a volume change.
    Timed,
    Always,
    /// Repurpose the bars as a replay progress gauge.
    Progress,
}

/// Screen layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    SingleLine,
    DualLine,
    /// Single line showing only topic names, never event details.
    SingleTopic,
    /// Rotate through sub-pages of the current content.
    MultiPage,
}

/// When the display is suspended (dark) during the configured window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspendMode {
    Never,
    /// Only while the user has been inactive.
    Timed,
    Always,
}

const DEFAULT_BRIGHTNESS: i32 = 1;
const DEFAULT_ON_EXIT: OnExitMode = OnExitMode::BlankScreen;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Panel dimensions, fixed per hardware.
    pub width: i32,
    pub height: i32,

    /// TrueType face used for all text.
    pub font: PathBuf,
    pub big_font_height: i32,
    pub small_font_height: i32,

    pub render_mode: RenderMode,
    pub volume_mode: VolumeMode,

    pub suspend_mode: SuspendMode,
    /// Window bounds as HHMM (0..=2359); equal bounds disable the window.
    pub suspend_time_on: u32,
    pub suspend_time_off: u32,

    /// 0 = off, 1 = dimmed, 2 = full.
    pub brightness: i32,
    pub on_exit: OnExitMode,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            width: 96,
            height: 16,
            font: PathBuf::new(),
            big_font_height: 14,
            small_font_height: 7,
            render_mode: RenderMode::SingleLine,
            volume_mode: VolumeMode::Timed,
            suspend_mode: SuspendMode::Never,
            suspend_time_on: 0,
            suspend_time_off: 0,
            brightness: DEFAULT_BRIGHTNESS,
            on_exit: DEFAULT_ON_EXIT,
        }
    }
}

impl Settings {
    /// Apply one persisted name/value pair. Returns `false` for names this
    /// component does not own, so the host can try its other components.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        match name {
            "OnExit" => {
                self.on_exit = match value.parse::<i64>().ok().and_then(exit_mode) {
                    Some(m) => m,
                    None => {
                        warn!(value, "OnExit out of range, using default");
                        DEFAULT_ON_EXIT
                    }
                };
            }
            "Brightness" => {
                self.brightness = match value.parse::<i32>() {
                    Ok(n) if (0..=2).contains(&n) => n,
                    _ => {
                        warn!(value, "Brightness must be between 0 and 2, using default");
                        DEFAULT_BRIGHTNESS
                    }
                };
            }
            "Font" => {
                self.font = PathBuf::from(value);
            }
            "BigFont" => {
                self.big_font_height = px_height(value, 14, "BigFont");
            }
            "SmallFont" => {
                self.small_font_height = px_height(value, 7, "SmallFont");
            }
            "RenderMode" => {
                self.render_mode = match value.parse::<i64>().ok().and_then(render_mode) {
                    Some(m) => m,
                    None => {
                        warn!(value, "RenderMode out of range, using default");
                        RenderMode::SingleLine
                    }
                };
            }
            "VolumeMode" => {
                self.volume_mode = match value.parse::<i64>().ok().and_then(volume_mode) {
                    Some(m) => m,
                    None => {
                        warn!(value, "VolumeMode out of range, using default");
                        VolumeMode::Timed
                    }
                };
            }
            "SuspendMode" => {
                self.suspend_mode = match value.parse::<i64>().ok().and_then(suspend_mode) {
                    Some(m) => m,
                    None => {
                        warn!(value, "SuspendMode out of range, using default");
                        SuspendMode::Never
                    }
                };
            }
            "SuspendTimeOn" => {
                self.suspend_time_on = clock_value(value, "SuspendTimeOn");
            }
            "SuspendTimeOff" => {
                self.suspend_time_off = clock_value(value, "SuspendTimeOff");
            }
            _ => return false,
        }
        true
    }

    /// The display-facing slice of these settings.
    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            width: self.width,
            height: self.height,
            font: self.font.clone(),
            dual_line: self.render_mode == RenderMode::DualLine,
            big_px: self.big_font_height,
            small_px: self.small_font_height,
        }
    }
}

fn exit_mode(n: i64) -> Option<OnExitMode> {
    Some(match n {
        0 => OnExitMode::ShowMessage,
        1 => OnExitMode::ShowClock,
        2 => OnExitMode::BlankScreen,
        3 => OnExitMode::NextTimer,
        4 => OnExitMode::NextTimerBlank,
        _ => return None,
    })
}

fn render_mode(n: i64) -> Option<RenderMode> {
    Some(match n {
        0 => RenderMode::SingleLine,
        1 => RenderMode::DualLine,
        2 => RenderMode::SingleTopic,
        3 => RenderMode::MultiPage,
        _ => return None,
    })
}

fn volume_mode(n: i64) -> Option<VolumeMode> {
    Some(match n {
        0 => VolumeMode::Never,
        1 => VolumeMode::Timed,
        2 => VolumeMode::Always,
        3 => VolumeMode::Progress,
        _ => return None,
    })
}

fn suspend_mode(n: i64) -> Option<SuspendMode> {
    Some(match n {
        0 => SuspendMode::Never,
        1 => SuspendMode::Timed,
        2 => SuspendMode::Always,
        _ => return None,
    })
}

fn px_height(value: &str, default: i32, name: &str) -> i32 {
    match value.parse::<i32>() {
        Ok(n) if (4..=32).contains(&n) => n,
        _ => {
            warn!(value, name, "font height out of range, using default");
            default
        }
    }
}

/// HHMM, hours 0..=23, minutes 0..=59.
fn clock_value(value: &str, name: &str) -> u32 {
    match value.parse::<u32>() {
        Ok(n) if n <= 2359 && (n % 100) <= 59 => n,
        _ => {
            warn!(value, name, "time of day must be HHMM, using 0000");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.width, 96);
        assert_eq!(s.height, 16);
        assert_eq!(s.brightness, 1);
        assert_eq!(s.on_exit, OnExitMode::BlankScreen);
        assert_eq!(s.render_mode, RenderMode::SingleLine);
        assert_eq!(s.suspend_mode, SuspendMode::Never);
    }

    #[test]
    fn test_set_known_names() {
        let mut s = Settings::default();
        assert!(s.set("Brightness", "2"));
        assert!(s.set("RenderMode", "1"));
        assert!(s.set("VolumeMode", "3"));
        assert!(s.set("SuspendMode", "2"));
        assert!(s.set("SuspendTimeOn", "2200"));
        assert!(s.set("SuspendTimeOff", "800"));
        assert!(s.set("Font", "/usr/share/fonts/DejaVuSans.ttf"));
        assert_eq!(s.brightness, 2);
        assert_eq!(s.render_mode, RenderMode::DualLine);
        assert_eq!(s.volume_mode, VolumeMode::Progress);
        assert_eq!(s.suspend_mode, SuspendMode::Always);
        assert_eq!(s.suspend_time_on, 2200);
        assert_eq!(s.suspend_time_off, 800);
    }

    #[test]
    fn test_set_unknown_name_is_refused() {
        let mut s = Settings::default();
        assert!(!s.set("SomeOtherPlugin", "1"));
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let mut s = Settings::default();
        s.set("Brightness", "7");
        assert_eq!(s.brightness, DEFAULT_BRIGHTNESS);
        s.set("OnExit", "99");
        assert_eq!(s.on_exit, DEFAULT_ON_EXIT);
        s.set("SuspendTimeOn", "2460");
        assert_eq!(s.suspend_time_on, 0);
        s.set("BigFont", "200");
        assert_eq!(s.big_font_height, 14);
        s.set("RenderMode", "banana");
        assert_eq!(s.render_mode, RenderMode::SingleLine);
    }

    #[test]
    fn test_dual_line_selects_small_font() {
        let mut s = Settings::default();
        assert!(!s.display_options().dual_line);
        s.set("RenderMode", "1");
        assert!(s.display_options().dual_line);
    }

    #[test]
    fn test_serde_round_trip() {
        let mut s = Settings::default();
        s.set("Brightness", "0");
        s.set("SuspendMode", "1");
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: Settings = serde_json::from_str(r#"{"brightness":2}"#).unwrap();
        assert_eq!(s.brightness, 2);
        assert_eq!(s.width, 96);
        assert_eq!(s.render_mode, RenderMode::SingleLine);
    }
}
