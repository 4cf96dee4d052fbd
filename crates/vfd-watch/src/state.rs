//! Shared state mutated by host events and consumed by the render tick.

use chrono::{DateTime, Duration, Local, Timelike};

use crate::replay::parse_replay_name;
use crate::scroll::Scroller;

/// Host volume range.
pub const MAX_VOLUME: i32 = 255;
/// Independent recording sources tracked (tuner cards, stream inputs).
pub const RECORDING_SOURCES: usize = 16;
/// Bands in a spectrum analyzer frame.
pub const SPECTRUM_BANDS: usize = 19;
/// Band heights and peaks are normalized to `0..=SPECTRUM_RANGE`.
pub const SPECTRUM_RANGE: u32 = 100;

/// Volume bar graph lingers this long after a change in timed mode.
pub(crate) const VOLUME_LINGER_SECS: i64 = 15;
/// The user counts as inactive after this much time without input.
pub(crate) const USER_INACTIVE_SECS: i64 = 300;

/// What the screen is currently about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchMode {
    #[default]
    LiveTv,
    ReplayNormal,
    ReplayMusic,
    ReplayDvd,
    ReplayFile,
    ReplayImage,
    ReplayAudioCd,
}

impl WatchMode {
    pub fn is_replay(self) -> bool {
        self != WatchMode::LiveTv
    }
}

/// Playback direction/speed as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayState {
    #[default]
    None,
    Play,
    Paused,
    Forward1,
    Forward2,
    Forward3,
    Backward1,
    Backward2,
    Backward3,
}

/// Requested override for an icon bit (remote-control interface).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconState {
    /// Read back the current override without changing it.
    Query,
    On,
    Off,
    /// Drop the override, the render tick decides again.
    Auto,
}

/// One spectrum analyzer frame pushed by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpectrumFrame {
    pub heights: Vec<u32>,
    pub peaks: Vec<u32>,
}

pub(crate) struct WatchState {
    pub mode: WatchMode,
    pub update_screen: bool,

    pub recording: [u32; RECORDING_SOURCES],

    pub icons_force_on: u32,
    pub icons_force_off: u32,
    pub icons_force_mask: u32,

    pub channel_name: Option<String>,
    pub present_title: Option<String>,
    pub present_short_title: Option<String>,
    program_changed: bool,

    pub volume: i32,
    pub volume_mute: bool,
    pub volume_changed_at: Option<DateTime<Local>>,

    pub osd_title: Option<String>,
    pub osd_item: Option<String>,
    pub osd_message: Option<String>,

    pub replay_title: Option<String>,
    replay_title_last: Option<String>,
    pub replay_folder: Option<String>,
    pub replay_time: Option<String>,
    pub replay_state: ReplayState,
    pub replay_current: i32,
    pub replay_total: i32,

    pub clock: Option<String>,
    clock_key_last: Option<u32>,

    pub spectrum: Option<SpectrumFrame>,
    last_activity: DateTime<Local>,

    pub scroll: Scroller,
    pub page_index: usize,
    pub page_ticks: u32,
}

impl WatchState {
    pub fn new(now: DateTime<Local>) -> Self {
        WatchState {
            mode: WatchMode::LiveTv,
            update_screen: true,
            recording: [0; RECORDING_SOURCES],
            icons_force_on: 0,
            icons_force_off: 0,
            icons_force_mask: 0,
            channel_name: None,
            present_title: None,
            present_short_title: None,
            program_changed: false,
            volume: 0,
            volume_mute: false,
            volume_changed_at: None,
            osd_title: None,
            osd_item: None,
            osd_message: None,
            replay_title: None,
            replay_title_last: None,
            replay_folder: None,
            replay_time: None,
            replay_state: ReplayState::None,
            replay_current: 0,
            replay_total: 0,
            clock: None,
            clock_key_last: None,
            spectrum: None,
            last_activity: now,
            scroll: Scroller::default(),
            page_index: 0,
            page_ticks: 0,
        }
    }

    /// Channel switch: previous program info is stale and dropped.
    pub fn channel(&mut self, name: Option<&str>) {
        self.present_title = None;
        self.present_short_title = None;
        self.channel_name = name.filter(|s| !s.is_empty()).map(str::to_string);
        self.mode = WatchMode::LiveTv;
        self.update_screen = true;
        self.scroll.restart();
    }

    /// New program info for the current channel.
    pub fn program(&mut self, title: Option<&str>, short_title: Option<&str>) {
        let title = title.filter(|s| !s.is_empty());
        let short_title = short_title.filter(|s| !s.is_empty());
        if self.present_title.as_deref() != title
            || self.present_short_title.as_deref() != short_title
        {
            self.present_title = title.map(str::to_string);
            self.present_short_title = short_title.map(str::to_string);
            self.program_changed = true;
        }
    }

    /// True once per program change; the render tick consumes it as a
    /// forced redraw.
    pub fn take_program_changed(&mut self) -> bool {
        std::mem::take(&mut self.program_changed)
    }

    pub fn volume(&mut self, value: i32, absolute: bool, now: DateTime<Local>) {
        let abs = if absolute { value } else { self.volume + value };
        let abs = abs.clamp(0, MAX_VOLUME);
        if self.volume > 0 && abs == 0 {
            self.volume_mute = true;
        } else if self.volume == 0 && abs > 0 {
            self.volume_mute = false;
        }
        self.volume = abs;
        self.volume_changed_at = Some(now);
    }

    pub fn recording(&mut self, source: usize, on: bool) {
        let n = source.min(RECORDING_SOURCES - 1);
        if on {
            self.recording[n] += 1;
        } else if self.recording[n] > 0 {
            self.recording[n] -= 1;
        }
    }

    pub fn recording_active(&self) -> bool {
        self.recording.iter().any(|&n| n != 0)
    }

    pub fn replaying(&mut self, name: Option<&str>, on: bool) {
        self.update_screen = true;
        if on {
            self.replay_state = ReplayState::Play;
            self.replay_current = 0;
            self.replay_total = 0;
            self.replay_time = None;
            match name.filter(|s| !s.trim().is_empty()) {
                Some(name) => {
                    let info = parse_replay_name(name);
                    self.mode = info.mode;
                    self.replay_title = info.title;
                    self.replay_folder = info.folder;
                }
                None => {
                    self.mode = WatchMode::ReplayNormal;
                    self.replay_title = None;
                    self.replay_folder = None;
                }
            }
            if self.replay_title.is_none() {
                self.replay_title = Some("Unknown title".to_string());
            }
        } else {
            self.mode = WatchMode::LiveTv;
            self.replay_state = ReplayState::None;
        }
    }

    pub fn replay_mode(&mut self, state: ReplayState) {
        self.replay_state = state;
    }

    pub fn replay_position(&mut self, current: i32, total: i32) {
        self.replay_current = current.max(0);
        self.replay_total = total.max(1);
    }

    /// Forced redraw once after the replay title changed.
    pub fn replay_title_changed(&mut self) -> bool {
        if self.replay_title_last != self.replay_title {
            self.replay_title_last = self.replay_title.clone();
            true
        } else {
            false
        }
    }

    /// Reformat the replay position string; true when it changed on screen.
    pub fn refresh_replay_time(&mut self) -> bool {
        if self.replay_total == 0 {
            return false;
        }
        let s = crate::replay::format_replay_time(self.replay_current, self.replay_total);
        if self.replay_time.as_deref() != Some(s.as_str()) {
            self.replay_time = Some(s);
            true
        } else {
            false
        }
    }

    /// Reformat the wall clock string at minute (or second) granularity;
    /// true when it changed on screen.
    pub fn refresh_clock(&mut self, now: DateTime<Local>, with_seconds: bool) -> bool {
        let key = if with_seconds {
            now.num_seconds_from_midnight()
        } else {
            now.hour() * 60 + now.minute()
        };
        if self.clock_key_last == Some(key) {
            return false;
        }
        self.clock_key_last = Some(key);
        let fmt = if with_seconds { "%H:%M:%S" } else { "%H:%M" };
        self.clock = Some(now.format(fmt).to_string());
        true
    }

    pub fn osd_clear(&mut self) {
        if self.osd_message.take().is_some() {
            self.update_screen = true;
        }
        if self.osd_title.take().is_some() {
            self.update_screen = true;
        }
        if self.osd_item.take().is_some() {
            self.update_screen = true;
        }
    }

    pub fn osd_title(&mut self, s: &str) {
        update_slot(&mut self.osd_title, &mut self.update_screen, s);
    }

    pub fn osd_current_item(&mut self, s: &str) {
        update_slot(&mut self.osd_item, &mut self.update_screen, s);
    }

    pub fn osd_status_message(&mut self, s: &str) {
        update_slot(&mut self.osd_message, &mut self.update_screen, s);
    }

    pub fn spectrum(&mut self, heights: &[u32], peaks: &[u32]) {
        self.spectrum = Some(SpectrumFrame {
            heights: heights.to_vec(),
            peaks: peaks.to_vec(),
        });
        self.update_screen = true;
    }

    pub fn touch_user(&mut self, now: DateTime<Local>) {
        self.last_activity = now;
    }

    pub fn user_inactive(&self, now: DateTime<Local>) -> bool {
        now.signed_duration_since(self.last_activity) >= Duration::seconds(USER_INACTIVE_SECS)
    }

    /// Pin icon bits on or off regardless of what the tick computes, or
    /// hand them back to automatic control. Returns the effective override
    /// for the queried bits.
    pub fn force_icon(&mut self, mask: u32, state: IconState) -> IconState {
        match state {
            IconState::Auto => {
                self.icons_force_on &= !mask;
                self.icons_force_off &= !mask;
                self.icons_force_mask &= !mask;
            }
            IconState::On => {
                self.icons_force_on |= mask;
                self.icons_force_off &= !mask;
                self.icons_force_mask |= mask;
            }
            IconState::Off => {
                self.icons_force_off |= mask;
                self.icons_force_on &= !mask;
                self.icons_force_mask |= mask;
            }
            IconState::Query => {}
        }
        if self.icons_force_on & mask != 0 {
            IconState::On
        } else if self.icons_force_off & mask != 0 {
            IconState::Off
        } else {
            IconState::Auto
        }
    }
}

/// Tabs become spaces and whitespace runs collapse; empty input clears the
/// slot. Setting the same text again is not a change.
fn update_slot(slot: &mut Option<String>, update_screen: &mut bool, s: &str) {
    let compacted = compact_text(s);
    if compacted.is_some() && compacted == *slot {
        return;
    }
    if slot.take().is_some() {
        *update_screen = true;
    }
    if let Some(text) = compacted {
        *slot = Some(text);
        *update_screen = true;
    }
}

fn compact_text(s: &str) -> Option<String> {
    let c = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if c.is_empty() {
        None
    } else {
        Some(c)
    }
}
