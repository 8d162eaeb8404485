//! Error types shared across the library.

use std::path::PathBuf;

/// Failure to turn an input into decoded PCM.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported format: {0}")]
    Unsupported(String),
    #[error("no decodable audio track")]
    NoAudioTrack,
    #[error("codec error: {0}")]
    Codec(String),
    #[error("decoded stream is empty")]
    Empty,
}

impl From<symphonia::core::errors::Error> for DecodeError {
    fn from(value: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error;
        match value {
            Error::IoError(err) => Self::Io(err),
            Error::Unsupported(what) => Self::Unsupported(what.to_string()),
            other => Self::Codec(other.to_string()),
        }
    }
}

/// Failure to load a file into a deck. The deck keeps its previous source.
#[derive(thiserror::Error, Debug)]
#[error("failed to load {path}: {source}")]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: DecodeError,
}

/// A setter received a value outside its documented domain.
///
/// The previously accepted value is retained.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{name} must be within [{min}, {max}], got {value}")]
pub struct ParameterError {
    pub name: &'static str,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl ParameterError {
    /// Validate `value` against the inclusive range `[min, max]`.
    ///
    /// NaN never passes.
    pub fn check(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), Self> {
        if value >= min && value <= max {
            Ok(())
        } else {
            Err(Self {
                name,
                value,
                min,
                max,
            })
        }
    }
}

/// Errors raised by the track library and its persistence.
#[derive(thiserror::Error, Debug)]
pub enum LibraryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("\"{0}\" is already in the library")]
    Duplicate(String),
    #[error("no track at index {index} (library has {len})")]
    OutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Failure to open or drive the audio output device.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    #[error("failed to open output stream after {attempts} attempts: {reason}")]
    Open { attempts: usize, reason: String },
}

/// Failure to read a settings payload.
#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings json: {0}")]
    Json(#[from] serde_json::Error),
}
