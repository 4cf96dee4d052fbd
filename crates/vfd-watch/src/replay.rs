//! Replay title extraction and position formatting.
//!
//! Playback hosts hand over one opaque display name whose shape depends on
//! which player produced it; the interesting part (the actual title) has to
//! be dug out per player convention.

use crate::state::WatchMode;

/// Position values arrive as frame indices.
pub const FRAMES_PER_SECOND: i32 = 25;

/// What could be learned from a replay display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayInfo {
    pub mode: WatchMode,
    pub title: Option<String>,
    /// Subdirectory part stripped off a recording path, when there was one.
    pub folder: Option<String>,
}

/// Classify a replay name and extract its title.
///
/// Recognized shapes, tried in order:
/// - music players: `"[LS] (444/666) title"`
/// - DVD header lines: four `", "`-separated fields before the volume name
/// - recording paths: the last `'~'`-separated component, or the basename
///   of a plain file path when the name carries a 3/4-letter extension
/// - `"[image] "` / `"[audiocd] "` prefixed viewer names
///
/// Anything else is used verbatim.
pub fn parse_replay_name(name: &str) -> ReplayInfo {
    let b = name.as_bytes();
    let slen = b.len();
    let mut mode = WatchMode::ReplayNormal;
    let mut title: Option<String> = None;
    let mut folder: Option<String> = None;
    let mut found = false;

    if slen > 6 && b[0] == b'[' && b[3] == b']' && b[5] == b'(' {
        for i in 6..slen {
            if b[i] == b' ' && b[i - 1] == b')' {
                let t = name[i..].trim_start();
                if !t.is_empty() {
                    title = Some(t.to_string());
                }
                mode = WatchMode::ReplayMusic;
                found = true;
                break;
            }
        }
    }

    if !found && slen > 7 {
        let mut fields = 0;
        for i in 1..slen {
            if b[i] == b' ' && b[i - 1] == b',' {
                fields += 1;
                if fields == 4 {
                    let t = name[i..].trim_start();
                    if !t.is_empty() {
                        title = Some(t.to_string());
                    }
                    mode = WatchMode::ReplayDvd;
                    found = true;
                    break;
                }
            }
        }
    }

    if !found {
        for i in (1..slen).rev() {
            match b[i] {
                b'/' if slen > 5 && (b[slen - 4] == b'.' || b[slen - 5] == b'.') => {
                    mode = WatchMode::ReplayFile;
                    title = Some(name[i + 1..].to_string());
                    folder = Some(name[..i].to_string());
                    found = true;
                    break;
                }
                b'~' => {
                    title = Some(name[i + 1..].to_string());
                    folder = Some(name[..i].to_string());
                    found = true;
                    break;
                }
                _ => {}
            }
        }
    }

    if let Some(rest) = name.strip_prefix("[image] ") {
        if mode != WatchMode::ReplayFile {
            title = Some(rest.to_string());
        }
        mode = WatchMode::ReplayImage;
        found = true;
    } else if let Some(rest) = name.strip_prefix("[audiocd] ") {
        title = Some(rest.to_string());
        mode = WatchMode::ReplayAudioCd;
        found = true;
    }

    if !found && !name.is_empty() {
        title = Some(name.to_string());
    }
    ReplayInfo { mode, title, folder }
}

/// "MM:SS (MM:SS)" for the usual case, switching to "H:MM:SS" once either
/// side reaches an hour; a total of 1 frame means the length is unknown and
/// only the position is shown.
pub fn format_replay_time(current: i32, total: i32) -> String {
    let cs = current / FRAMES_PER_SECOND;
    let ts = total / FRAMES_PER_SECOND;
    let long = cs >= 3600 || ts >= 3600;
    if total > 1 {
        if long {
            format!("{} ({})", hms(cs), hms(ts))
        } else {
            format!("{:02}:{:02} ({:02}:{:02})", cs / 60, cs % 60, ts / 60, ts % 60)
        }
    } else if long {
        hms(cs)
    } else {
        format!("{:02}:{:02}", cs / 60, cs % 60)
    }
}

fn hms(seconds: i32) -> String {
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_music_player_name() {
        let info = parse_replay_name("[LS] (3/12) Daydream");
        assert_eq!(info.mode, WatchMode::ReplayMusic);
        assert_eq!(info.title.as_deref(), Some("Daydream"));
        assert_eq!(info.folder, None);
    }

    #[test]
    fn test_dvd_header_line() {
        let info = parse_replay_name("1/8 4/28, de 2/5 ac3, no 0/7, 16:9, HOLIDAY_DISC");
        assert_eq!(info.mode, WatchMode::ReplayDvd);
        assert_eq!(info.title.as_deref(), Some("HOLIDAY_DISC"));
    }

    #[test]
    fn test_recording_subdirectory() {
        let info = parse_replay_name("%Series~Season 1~Pilot");
        assert_eq!(info.mode, WatchMode::ReplayNormal);
        assert_eq!(info.title.as_deref(), Some("Pilot"));
        assert_eq!(info.folder.as_deref(), Some("%Series~Season 1"));
    }

    #[test]
    fn test_file_path_with_extension() {
        let info = parse_replay_name("/video/clips/trailer.mkv");
        assert_eq!(info.mode, WatchMode::ReplayFile);
        assert_eq!(info.title.as_deref(), Some("trailer.mkv"));
        assert_eq!(info.folder.as_deref(), Some("/video/clips"));
    }

    #[test]
    fn test_path_without_extension_is_left_alone() {
        let info = parse_replay_name("/video/somedir");
        assert_eq!(info.mode, WatchMode::ReplayNormal);
        assert_eq!(info.title.as_deref(), Some("/video/somedir"));
    }

    #[test]
    fn test_image_and_audiocd_prefixes() {
        let info = parse_replay_name("[image] holiday.jpg");
        assert_eq!(info.mode, WatchMode::ReplayImage);
        assert_eq!(info.title.as_deref(), Some("holiday.jpg"));

        let info = parse_replay_name("[audiocd] 04 Track");
        assert_eq!(info.mode, WatchMode::ReplayAudioCd);
        assert_eq!(info.title.as_deref(), Some("04 Track"));
    }

    #[test]
    fn test_plain_name_used_verbatim() {
        let info = parse_replay_name("Evening News");
        assert_eq!(info.mode, WatchMode::ReplayNormal);
        assert_eq!(info.title.as_deref(), Some("Evening News"));
    }

    #[test]
    fn test_empty_name_has_no_title() {
        assert_eq!(parse_replay_name("").title, None);
    }

    #[test]
    fn test_format_replay_time_short() {
        assert_eq!(format_replay_time(0, 1), "00:00");
        assert_eq!(format_replay_time(25 * 90, 25 * 120), "01:30 (02:00)");
    }

    #[test]
    fn test_format_replay_time_hours() {
        assert_eq!(format_replay_time(0, 25 * 3700), "0:00:00 (1:01:40)");
        assert_eq!(format_replay_time(25 * 3661, 1), "1:01:01");
    }
}
