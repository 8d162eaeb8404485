//! # Duodeck Library
//!
//! Core playback pipeline for a two-deck DJ player: a transport over a decoded
//! source, a varispeed resampler, a four-parameter reverb, end-of-track
//! looping and a small track library with flat-file persistence.
//!
//! Audio is pulled in fixed-size blocks through [`audio::AudioCallback`]; all
//! control methods live on [`playback::deck::DeckHandle`] and are safe to call
//! from any non-realtime thread.

pub mod audio;
pub mod constants;
pub mod diagnostics;
pub mod dsp;
pub mod error;
pub mod library;
pub mod playback;
