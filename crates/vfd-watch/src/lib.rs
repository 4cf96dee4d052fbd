//! Render scheduler for the Targa VFD.
//!
//! The playback host pushes events (channel switches, volume, replay
//! progress, on-screen-display text) into a [`Watch`]; a background thread
//! turns the accumulated state into screen content at a fixed cadence:
//! page selection, text scrolling, the icon bitmask around the display
//! edge, and a time-of-day suspend policy. Drawing and device traffic go
//! through [`vfd_device::Display`], which transmits only what changed.

mod config;
mod replay;
mod scroll;
mod state;
mod watch;

pub use config::{OnExitMode, RenderMode, Settings, SuspendMode, VolumeMode};
pub use replay::{format_replay_time, parse_replay_name, ReplayInfo, FRAMES_PER_SECOND};
pub use state::{
    IconState, ReplayState, SpectrumFrame, WatchMode, MAX_VOLUME, RECORDING_SOURCES,
    SPECTRUM_BANDS, SPECTRUM_RANGE,
};
pub use watch::{NextTimer, Watch};
