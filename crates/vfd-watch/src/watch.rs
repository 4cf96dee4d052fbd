//! The render loop: one background thread turning shared state into
//! screen updates at a fixed cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Local, Timelike};
use tracing::{debug, error, info};
use vfd_device::proto::icon;
use vfd_device::{Display, DisplayError, DisplayOptions, VfdLink};

use crate::config::{OnExitMode, RenderMode, Settings, SuspendMode, VolumeMode};
use crate::state::{
    IconState, ReplayState, SpectrumFrame, WatchState, MAX_VOLUME, SPECTRUM_BANDS, SPECTRUM_RANGE,
    VOLUME_LINGER_SECS,
};

/// Tick period while the display is live.
const ACTIVE_TICK_MS: u64 = 100;
/// Tick period while suspended (only the window end needs checking).
const SUSPENDED_TICK_MS: u64 = 1000;
/// Lower bound on the sleep between ticks, whatever the tick cost.
const MIN_TICK_MS: u64 = 10;

/// Sub-pages per content source in multi-page mode.
const PAGE_COUNT: usize = 4;
/// Ticks a sub-page stays up before rotating on.
const PAGE_HOLD_TICKS: u32 = 40;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything the tick and the event entry points contend over.
struct Shared<L: VfdLink> {
    display: Display<L>,
    state: WatchState,
    settings: Settings,
}

/// Per-loop values that only the render thread touches.
#[derive(Default)]
struct TickState {
    counter: u32,
    last_icons: Option<u32>,
    brightness: Option<i32>,
    suspended: bool,
}

enum PageContent {
    Text(String),
    Spectrum,
    Empty,
}

impl<L: VfdLink> Shared<L> {
    /// One scheduler step. Decides suspend state, refreshes derived
    /// strings, renders, computes the icon mask, and flushes once if
    /// anything changed.
    fn tick(&mut self, ts: &mut TickState, now: DateTime<Local>) {
        let mut icons = 0u32;
        let mut flush = false;
        let suspend = self.suspend_now(now);
        let mut redraw = suspend != ts.suspended;

        if !suspend {
            match self.settings.render_mode {
                RenderMode::DualLine => {
                    // The header clock only needs second-level latency.
                    if ts.counter % 2 == 0 {
                        redraw |= self.state.refresh_clock(now, false);
                        if self.state.mode.is_replay() {
                            redraw |= self.state.refresh_replay_time();
                        }
                    }
                }
                RenderMode::MultiPage => {
                    redraw |= self.state.refresh_clock(now, true);
                    if self.state.mode.is_replay() {
                        redraw |= self.state.refresh_replay_time();
                    }
                    redraw |= self.rotate_page();
                }
                _ => {}
            }

            flush = self.render_screen(redraw);

            if self.state.mode.is_replay() {
                match self.state.replay_state {
                    ReplayState::None | ReplayState::Paused => icons |= icon::PAUSE,
                    ReplayState::Play => icons |= icon::PLAY,
                    // The panel has no symbols for the wind tiers.
                    _ => {}
                }
            }
            if self.state.recording_active() {
                icons |= icon::RECORD;
            }
            icons |= self.volume_icons(now);
        }

        if ts.brightness != Some(self.settings.brightness) || suspend != ts.suspended {
            ts.brightness = Some(self.settings.brightness);
            self.display
                .brightness(if suspend { 0 } else { self.settings.brightness });
            ts.suspended = suspend;
            flush = true;
        }

        icons &= !self.state.icons_force_mask;
        icons |= self.state.icons_force_on;
        icons &= !self.state.icons_force_off;

        if ts.last_icons != Some(icons) {
            self.display.icons(icons);
            ts.last_icons = Some(icons);
            flush = true;
        }

        if flush {
            self.display.flush(false);
        }
        ts.counter = ts.counter.wrapping_add(1);
    }

    /// Wrapping HHMM window check; in timed mode only an inactive user
    /// lets the display go dark.
    fn suspend_now(&self, now: DateTime<Local>) -> bool {
        let s = &self.settings;
        if s.suspend_mode == SuspendMode::Never || s.suspend_time_on == s.suspend_time_off {
            return false;
        }
        if s.suspend_mode == SuspendMode::Timed && !self.state.user_inactive(now) {
            return false;
        }
        let clock = now.hour() * 100 + now.minute();
        if s.suspend_time_off > s.suspend_time_on {
            clock >= s.suspend_time_on && clock <= s.suspend_time_off
        } else {
            clock >= s.suspend_time_on || clock <= s.suspend_time_off
        }
    }

    fn volume_icons(&self, now: DateTime<Local>) -> u32 {
        match self.settings.volume_mode {
            VolumeMode::Never => 0,
            VolumeMode::Progress => {
                if self.state.volume_mute {
                    icon::MUTE
                } else if self.state.mode.is_replay() && self.state.replay_total > 1 {
                    let bars = (self.state.replay_current as i64 * i64::from(icon::VOLUME_BARS))
                        / i64::from(self.state.replay_total);
                    icon::volume_bars(bars.clamp(0, i64::from(icon::VOLUME_BARS)) as u32)
                } else {
                    0
                }
            }
            mode => {
                if self.state.volume_mute {
                    return icon::MUTE;
                }
                let lingering = mode == VolumeMode::Timed
                    && self.state.volume_changed_at.is_some_and(|t| {
                        now.signed_duration_since(t).num_seconds() < VOLUME_LINGER_SECS
                    });
                if mode == VolumeMode::Always || lingering {
                    let steps = MAX_VOLUME / icon::VOLUME_BARS as i32;
                    icon::VOLUME | icon::volume_bars((self.state.volume / steps) as u32)
                } else {
                    0
                }
            }
        }
    }

    fn rotate_page(&mut self) -> bool {
        self.state.page_ticks += 1;
        if self.state.page_ticks < PAGE_HOLD_TICKS {
            return false;
        }
        self.state.page_ticks = 0;
        self.state.page_index = (self.state.page_index + 1) % PAGE_COUNT;
        self.state.scroll.restart();
        true
    }

    /// First present sub-page at or after the rotation cursor.
    fn multipage_content(&self) -> PageContent {
        let st = &self.state;
        for k in 0..PAGE_COUNT {
            let slot = match (st.page_index + k) % PAGE_COUNT {
                0 if st.mode.is_replay() => st.replay_folder.as_ref(),
                0 => st.present_title.as_ref(),
                1 if st.mode.is_replay() => st.replay_title.as_ref(),
                1 => st.present_short_title.as_ref(),
                2 if st.mode.is_replay() => st.replay_time.as_ref(),
                2 => st.clock.as_ref(),
                _ if st.mode.is_replay() => {
                    if st.spectrum.is_some() {
                        return PageContent::Spectrum;
                    }
                    None
                }
                _ => st.channel_name.as_ref(),
            };
            if let Some(s) = slot {
                return PageContent::Text(s.clone());
            }
        }
        PageContent::Empty
    }

    /// Redraw the framebuffer if content changed or a scroll/page
    /// animation is in flight. Returns whether anything was drawn.
    fn render_screen(&mut self, redraw: bool) -> bool {
        let mut force = self.state.update_screen;
        let mut header: Option<String> = None;
        let mut body: Option<String> = None;
        let mut allow_time = false;
        let mut spectrum_page = false;
        let multipage = self.settings.render_mode == RenderMode::MultiPage;

        if self.state.osd_message.is_some() {
            body = self.state.osd_message.clone();
        } else if self.state.osd_item.is_some() {
            header = self.state.osd_title.clone();
            body = self.state.osd_item.clone();
        } else if !self.state.mode.is_replay() {
            header = self.state.channel_name.clone();
            if self.state.take_program_changed() {
                force = true;
            }
            if multipage {
                match self.multipage_content() {
                    PageContent::Text(s) => body = Some(s),
                    PageContent::Spectrum => spectrum_page = true,
                    PageContent::Empty => body = self.state.channel_name.clone(),
                }
            } else if self.state.present_title.is_some()
                && self.settings.render_mode != RenderMode::SingleTopic
            {
                body = self.state.present_title.clone();
                allow_time = true;
            } else {
                header = self.state.clock.clone();
                body = self.state.channel_name.clone();
            }
        } else {
            if self.state.replay_title_changed() {
                force = true;
            }
            header = self.state.replay_time.clone();
            if multipage {
                match self.multipage_content() {
                    PageContent::Text(s) => body = Some(s),
                    PageContent::Spectrum => spectrum_page = true,
                    PageContent::Empty => body = self.state.replay_title.clone(),
                }
            } else {
                body = self.state.replay_title.clone();
                allow_time = true;
            }
        }

        if force {
            self.state.scroll.restart();
        }
        if !(force || redraw || self.state.scroll.moving()) {
            return false;
        }

        self.display.clear();
        if spectrum_page {
            if let Some(frame) = self.state.spectrum.clone() {
                draw_spectrum(&mut self.display, &frame);
            }
        } else if let Some(text) = &body {
            let font_height = self.display.font_height();
            let y = if self.settings.render_mode == RenderMode::DualLine {
                font_height
            } else {
                ((self.settings.height - font_height) / 2).max(0)
            };
            let fit = self
                .display
                .draw_text_scrolled(0, y, text, multipage, self.state.scroll.offset());
            self.state.scroll.step(fit);
        }

        if self.settings.render_mode == RenderMode::DualLine {
            if let Some(h) = header {
                if allow_time {
                    if let Some(t) = self.state.clock.clone() {
                        let tw = self.display.text_width(&t);
                        let hw = self.display.text_width(&h);
                        if hw + tw + 3 < self.settings.width && tw < self.settings.width {
                            self.display.draw_text(self.settings.width - tw, 0, &t);
                        }
                    }
                }
                self.display.draw_text(0, 0, &h);
            }
        }
        self.state.update_screen = false;
        true
    }

    /// Final screen after the loop stopped, per the configured exit mode.
    fn goodbye(&mut self, timer: Option<&NextTimer>, now: DateTime<Local>) {
        if !self.display.is_open() {
            return;
        }
        match self.settings.on_exit {
            OnExitMode::ShowMessage => {
                info!("closing, leaving the last message on screen");
            }
            OnExitMode::ShowClock => {
                info!("closing, showing the clock");
                self.display.icons(0);
                self.display.send_cmd_clock();
            }
            OnExitMode::BlankScreen => {
                info!("closing, blanking the display");
                self.display.send_cmd_shutdown();
            }
            OnExitMode::NextTimer | OnExitMode::NextTimerBlank => {
                info!("closing, showing the next timer");
                let dual = self.settings.render_mode == RenderMode::DualLine;
                let font_height = self.display.font_height();
                let top = ((self.settings.height - font_height) / 2).max(0);
                self.display.clear();
                if let Some(t) = timer {
                    let topic = if t.start.signed_duration_since(now)
                        > chrono::Duration::hours(24)
                    {
                        format!(
                            "{}. {:02}:{:02}",
                            t.start.day(),
                            t.start.hour(),
                            t.start.minute()
                        )
                    } else {
                        format!("{:02}:{:02}", t.start.hour(), t.start.minute())
                    };
                    let w = self.display.text_width(&topic);
                    if dual {
                        self.display.draw_text(0, 0, &topic);
                        if w + 3 < self.settings.width {
                            self.display.draw_text(w + 3, 0, &t.channel);
                        }
                        self.display.draw_text(0, font_height, &t.file);
                    } else {
                        self.display.draw_text(0, top, &topic);
                        if w + 3 < self.settings.width {
                            self.display.draw_text(w + 3, top, &t.file);
                        }
                    }
                    self.display.icons(icon::RECORD);
                } else {
                    if self.settings.on_exit == OnExitMode::NextTimer {
                        self.display.draw_text(0, top, "None active timer");
                    }
                    self.display.icons(0);
                }
                self.display.flush(true);
            }
        }
        self.display.close();
    }
}

fn draw_spectrum<L: VfdLink>(display: &mut Display<L>, frame: &SpectrumFrame) {
    let bands = SPECTRUM_BANDS as i32;
    let bar_width = (display.width() - bands) / bands;
    let bottom = display.height();
    let scale = |v: u32| (v.min(SPECTRUM_RANGE) as i32 * bottom) / SPECTRUM_RANGE as i32;

    for (i, (&h, &p)) in frame
        .heights
        .iter()
        .zip(frame.peaks.iter())
        .enumerate()
        .take(SPECTRUM_BANDS)
    {
        let x = (bar_width + 1) * i as i32;
        let y = scale(h);
        display.rectangle(x, bottom, x + bar_width - 1, bottom - y, true);
        let peak = scale(p);
        if peak > 0 {
            display.rectangle(x, bottom - peak, x + bar_width - 1, bottom - peak, true);
        }
    }
}

/// The timer line shown by the next-timer exit modes.
#[derive(Debug, Clone)]
pub struct NextTimer {
    pub start: DateTime<Local>,
    pub channel: String,
    pub file: String,
}

struct Inner<L: VfdLink> {
    shared: Mutex<Shared<L>>,
    park: Condvar,
    park_lock: Mutex<()>,
    stop: AtomicBool,
}

/// Owns the render thread and hands host events into the shared state.
///
/// All entry points may be called from any thread; each takes the state
/// lock briefly and returns, the next tick picks the change up.
pub struct Watch<L: VfdLink> {
    inner: Arc<Inner<L>>,
    thread: Option<JoinHandle<()>>,
}

impl<L: VfdLink + 'static> Watch<L> {
    /// Open the display on `link` and start rendering.
    pub fn open(link: L, settings: Settings) -> Result<Self, DisplayError> {
        let mut display = Display::new();
        display.open(link, &settings.display_options())?;
        Ok(Self::start(display, settings))
    }

    /// Start rendering onto an already opened display.
    pub fn start(display: Display<L>, settings: Settings) -> Self {
        let inner = Arc::new(Inner {
            shared: Mutex::new(Shared {
                display,
                state: WatchState::new(Local::now()),
                settings,
            }),
            park: Condvar::new(),
            park_lock: Mutex::new(()),
            stop: AtomicBool::new(false),
        });
        let thread = {
            let inner = Arc::clone(&inner);
            match thread::Builder::new()
                .name("vfd-watch".into())
                .spawn(move || run(inner))
            {
                Ok(handle) => Some(handle),
                Err(err) => {
                    error!(%err, "unable to spawn the watch thread");
                    None
                }
            }
        };
        info!("watch loop started");
        Watch { inner, thread }
    }

    /// Stop the loop, render the configured goodbye screen, release the
    /// device.
    pub fn shutdown(mut self, next_timer: Option<&NextTimer>) {
        self.stop_thread();
        let mut shared = lock(&self.inner.shared);
        shared.goodbye(next_timer, Local::now());
    }

    fn stop_thread(&mut self) {
        self.inner.stop.store(true, Ordering::Release);
        self.inner.park.notify_all();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared<L>> {
        lock(&self.inner.shared)
    }

    pub fn channel(&self, name: Option<&str>) {
        self.shared().state.channel(name);
    }

    pub fn program(&self, title: Option<&str>, short_title: Option<&str>) {
        self.shared().state.program(title, short_title);
    }

    pub fn volume(&self, value: i32, absolute: bool) {
        self.shared().state.volume(value, absolute, Local::now());
    }

    pub fn recording(&self, source: usize, on: bool) {
        self.shared().state.recording(source, on);
    }

    pub fn replaying(&self, name: Option<&str>, on: bool) {
        self.shared().state.replaying(name, on);
    }

    pub fn replay_mode(&self, state: ReplayState) {
        self.shared().state.replay_mode(state);
    }

    pub fn replay_position(&self, current: i32, total: i32) {
        self.shared().state.replay_position(current, total);
    }

    pub fn osd_clear(&self) {
        self.shared().state.osd_clear();
    }

    pub fn osd_title(&self, s: &str) {
        self.shared().state.osd_title(s);
    }

    pub fn osd_current_item(&self, s: &str) {
        self.shared().state.osd_current_item(s);
    }

    pub fn osd_status_message(&self, s: &str) {
        self.shared().state.osd_status_message(s);
    }

    pub fn spectrum(&self, heights: &[u32], peaks: &[u32]) {
        self.shared().state.spectrum(heights, peaks);
    }

    /// Any user input; feeds the timed suspend mode.
    pub fn user_activity(&self) {
        self.shared().state.touch_user(Local::now());
    }

    pub fn force_icon(&self, mask: u32, state: IconState) -> IconState {
        self.shared().state.force_icon(mask, state)
    }

    /// Swap the font; the screen keeps its previous font when loading
    /// fails.
    pub fn set_font(&self, options: &DisplayOptions) -> Result<(), DisplayError> {
        let mut shared = self.shared();
        shared.display.set_font(
            &options.font,
            options.dual_line,
            options.big_px,
            options.small_px,
        )?;
        shared.state.update_screen = true;
        Ok(())
    }

    /// Replace the settings wholesale (menu store).
    pub fn reconfigure(&self, settings: Settings) {
        let mut shared = self.shared();
        shared.settings = settings;
        shared.state.update_screen = true;
    }
}

impl<L: VfdLink> Drop for Watch<L> {
    fn drop(&mut self) {
        self.inner.stop.store(true, Ordering::Release);
        self.inner.park.notify_all();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn run<L: VfdLink>(inner: Arc<Inner<L>>) {
    let mut ticks = TickState::default();
    while !inner.stop.load(Ordering::Acquire) {
        let started = Instant::now();
        {
            let mut shared = lock(&inner.shared);
            shared.tick(&mut ticks, Local::now());
        }
        let period = if ticks.suspended {
            SUSPENDED_TICK_MS
        } else {
            ACTIVE_TICK_MS
        };
        let delay = period
            .saturating_sub(started.elapsed().as_millis() as u64)
            .max(MIN_TICK_MS);
        let guard = lock(&inner.park_lock);
        let _ = inner.park.wait_timeout(guard, Duration::from_millis(delay));
    }
    debug!("watch thread closed");
}
