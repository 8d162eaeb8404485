//! Track library: import with duplicate rejection, search, removal and
//! flat-file persistence.

mod persist;
pub mod track;

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::audio::AudioDecoder;
use crate::error::LibraryError;

pub use persist::{load_tracks, save_tracks};
pub use track::{seconds_to_minutes, title_for, Track};

/// Outcome of [`Library::import`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Titles added.
    pub added: Vec<String>,
    /// Titles skipped because a track with the same title exists.
    pub duplicates: Vec<String>,
    /// Files whose length could not be read, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Ordered list of tracks with unique titles.
#[derive(Debug, Clone, Default)]
pub struct Library {
    tracks: Vec<Track>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a persisted list. Missing files give an empty library.
    ///
    /// Cached lengths are trusted; files are not re-probed.
    pub fn load(path: &Path) -> Result<Self, LibraryError> {
        let mut library = Self::new();
        for track in load_tracks(path)? {
            if let Err(err) = library.add(track) {
                warn!("{}", err);
            }
        }
        info!("loaded {} tracks from {}", library.len(), path.display());
        Ok(library)
    }

    pub fn save(&self, path: &Path) -> Result<(), LibraryError> {
        save_tracks(path, &self.tracks)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Exact, case-sensitive title match.
    pub fn contains_title(&self, title: &str) -> bool {
        self.tracks.iter().any(|track| track.title == title)
    }

    /// Append a track unless its title is already present.
    pub fn add(&mut self, track: Track) -> Result<(), LibraryError> {
        if self.contains_title(&track.title) {
            return Err(LibraryError::Duplicate(track.title));
        }
        self.tracks.push(track);
        Ok(())
    }

    /// Import files, probing each one's length with `decoder`.
    ///
    /// Files whose title is already present (including earlier files of the
    /// same batch) are skipped; unreadable files are skipped and reported.
    pub fn import<P: AsRef<Path>>(&mut self, paths: &[P], decoder: &dyn AudioDecoder) -> ImportReport {
        let mut report = ImportReport::default();
        for path in paths {
            let path = path.as_ref();
            let title = title_for(path);
            if self.contains_title(&title) {
                info!("{} already in library", title);
                report.duplicates.push(title);
                continue;
            }
            match decoder.probe_length(path) {
                Ok(seconds) => {
                    self.tracks.push(Track::with_seconds(path, seconds));
                    info!("imported {}", title);
                    report.added.push(title);
                }
                Err(err) => {
                    warn!("failed to import {}: {}", path.display(), err);
                    report.failed.push((path.to_path_buf(), err.to_string()));
                }
            }
        }
        report
    }

    /// Index of the first track whose title contains `text`, ignoring case.
    /// Empty text matches nothing.
    pub fn find(&self, text: &str) -> Option<usize> {
        if text.is_empty() {
            return None;
        }
        let needle = text.to_lowercase();
        self.tracks
            .iter()
            .position(|track| track.title.to_lowercase().contains(&needle))
    }

    pub fn remove(&mut self, index: usize) -> Result<Track, LibraryError> {
        if index >= self.tracks.len() {
            return Err(LibraryError::OutOfRange {
                index,
                len: self.tracks.len(),
            });
        }
        let track = self.tracks.remove(index);
        info!("{} removed from library", track.title);
        Ok(track)
    }
}
