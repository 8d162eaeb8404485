//! Shared constants for playback defaults.

/// Default device sample rate (Hz).
pub const SAMPLE_RATE: u32 = 44_100;

/// Default number of frames requested per device callback.
pub const BLOCK_SIZE: usize = 512;

/// Interleaved channel count used throughout the pipeline.
pub const CHANNELS: usize = 2;

/// Window before the end of a track within which a loop restart is armed.
pub const LOOP_TAIL_SECONDS: f64 = 2.0;

/// Default cadence of the control-domain poll (position display + looping).
pub const TICK_INTERVAL_MS: u64 = 500;

/// Accepted varispeed range (inclusive).
pub const MIN_SPEED: f64 = 0.25;
pub const MAX_SPEED: f64 = 4.0;

/// Number of decks in the player.
pub const DECK_COUNT: usize = 2;

/// Peak windows computed per loaded track for the waveform overview.
pub const WAVEFORM_WINDOWS: usize = 512;
