//! Library track records.

use std::path::{Path, PathBuf};

/// One library entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Path to the audio file as imported.
    pub path: PathBuf,
    /// Display title (file name without extension). Unique within a library.
    pub title: String,
    /// Cached length as `m:ss`.
    pub length: String,
    /// `file://` URL of the absolute path.
    pub source_url: String,
}

impl Track {
    /// Build a track for `path` with an already formatted length.
    pub fn new(path: impl Into<PathBuf>, length: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            title: title_for(&path),
            source_url: file_url(&path),
            length: length.into(),
            path,
        }
    }

    /// Build a track from a length in seconds.
    pub fn with_seconds(path: impl Into<PathBuf>, seconds: f64) -> Self {
        Self::new(path, seconds_to_minutes(seconds))
    }
}

/// Title derived from a path: the file name without its extension.
pub fn title_for(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

/// Format seconds as `m:ss`, rounding to the nearest second.
pub fn seconds_to_minutes(seconds: f64) -> String {
    let rounded = if seconds.is_finite() {
        seconds.max(0.0).round() as u64
    } else {
        0
    };
    format!("{}:{:02}", rounded / 60, rounded % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_with_rounding() {
        assert_eq!(seconds_to_minutes(0.0), "0:00");
        assert_eq!(seconds_to_minutes(59.4), "0:59");
        assert_eq!(seconds_to_minutes(59.5), "1:00");
        assert_eq!(seconds_to_minutes(125.0), "2:05");
        assert_eq!(seconds_to_minutes(3_600.0), "60:00");
        assert_eq!(seconds_to_minutes(f64::NAN), "0:00");
    }

    #[test]
    fn title_is_the_file_stem() {
        let track = Track::new("/music/Night Drive.mp3", "3:12");
        assert_eq!(track.title, "Night Drive");
        assert_eq!(track.source_url, "file:///music/Night Drive.mp3");
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let track = Track::with_seconds("beat.wav", 61.0);
        assert_eq!(track.length, "1:01");
        assert!(track.source_url.starts_with("file:///"));
        assert!(track.source_url.ends_with("beat.wav"));
    }
}
