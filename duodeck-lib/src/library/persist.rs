//! Flat-file persistence: one `path,length` record per line, no header.
//!
//! Records are read as raw bytes so one undecodable line never costs the
//! rest of the list. On unix, paths are stored byte for byte.

use std::borrow::Cow;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::LibraryError;

use super::track::Track;

/// Read tracks from `path`. A missing file is an empty library.
///
/// Malformed records are skipped with a warning; only I/O failures abort.
pub fn load_tracks(path: &Path) -> Result<Vec<Track>, LibraryError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("no library at {}; starting empty", path.display());
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut tracks = Vec::new();
    for (line, record) in reader.byte_records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                warn!("skipping library record {} in {}: {}", line + 1, path.display(), err);
                continue;
            }
        };
        let track_path = record.get(0).filter(|bytes| !bytes.is_empty()).and_then(path_from_bytes);
        let length = record.get(1).and_then(|bytes| std::str::from_utf8(bytes).ok());
        match (track_path, length) {
            (Some(track_path), Some(length)) => tracks.push(Track::new(track_path, length.trim())),
            _ => warn!("skipping malformed library record {} in {}", line + 1, path.display()),
        }
    }
    Ok(tracks)
}

/// Write `tracks` to `path`, replacing any existing file.
pub fn save_tracks(path: &Path, tracks: &[Track]) -> Result<(), LibraryError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    for track in tracks {
        let track_path = path_to_bytes(&track.path);
        writer.write_record([track_path.as_ref(), track.length.as_bytes()])?;
    }
    writer.flush()?;
    debug!("saved {} tracks to {}", tracks.len(), path.display());
    Ok(())
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStrExt;
    Some(PathBuf::from(std::ffi::OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> Option<PathBuf> {
    std::str::from_utf8(bytes).ok().map(PathBuf::from)
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
        Cow::Owned(text) => Cow::Owned(text.into_bytes()),
    }
}
