//! Control-domain surface of a deck.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::audio::{AudioDecoder, PcmSource, PeakWindow};
use crate::constants::LOOP_TAIL_SECONDS;
use crate::dsp::effects::ReverbParameters;
use crate::error::{LoadError, ParameterError};

use crate::playback::reverb::ReverbControl;
use crate::playback::resampler::SpeedControl;
use crate::playback::transport::{PlaybackState, TransportControl};

/// Handle used by UI code, pollers and tests to drive one deck.
///
/// All methods are safe to call from any non-realtime thread; none of them
/// touch the audio thread's state directly.
#[derive(Clone)]
pub struct DeckHandle {
    pub(super) transport: TransportControl,
    pub(super) speed: SpeedControl,
    pub(super) reverb: ReverbControl,
    pub(super) looping: Arc<AtomicBool>,
    pub(super) decoder: Arc<dyn AudioDecoder>,
}

impl DeckHandle {
    /// Decode `path` and make it the deck's source.
    ///
    /// On failure the previous source and position are left untouched.
    pub fn load(&self, path: &Path) -> Result<(), LoadError> {
        match self.decoder.decode(path) {
            Ok(source) => {
                info!(
                    "loaded {} ({:.1}s)",
                    path.display(),
                    source.length_in_seconds()
                );
                self.transport.load_source(source);
                Ok(())
            }
            Err(source) => {
                warn!("failed to load {}: {}", path.display(), source);
                Err(LoadError {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Publish an already decoded source.
    pub fn load_source(&self, source: PcmSource) {
        self.transport.load_source(source);
    }

    /// Load from a drop of files onto the deck. Only a single dropped file is
    /// accepted; anything else is ignored and `Ok(false)` returned.
    pub fn load_dropped(&self, paths: &[PathBuf]) -> Result<bool, LoadError> {
        match paths {
            [path] => self.load(path).map(|()| true),
            _ => {
                info!("ignoring drop of {} files onto deck", paths.len());
                Ok(false)
            }
        }
    }

    /// Start playback. Returns `false` when no source is loaded.
    pub fn play(&self) -> bool {
        self.transport.play()
    }

    /// Stop playback, keeping the position where it is.
    pub fn stop(&self) {
        self.transport.stop();
    }

    /// Current transport state. Reaching the end of the source reports
    /// [`PlaybackState::Stopped`].
    pub fn state(&self) -> PlaybackState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    /// Whether a source has been published to the audio thread.
    pub fn is_loaded(&self) -> bool {
        self.transport.is_loaded()
    }

    /// Seek in seconds; clamped to the track.
    pub fn set_position(&self, seconds: f64) {
        self.transport.set_position(seconds);
    }

    /// Seek to `fraction` of the track length. Fractions outside `[0, 1]` are
    /// rejected and leave the position unchanged.
    pub fn set_position_relative(&self, fraction: f64) -> Result<(), ParameterError> {
        self.transport.set_position_relative(fraction)
    }

    /// Playback position in seconds. A seek that has not been rendered yet is
    /// already reflected here.
    pub fn position_seconds(&self) -> f64 {
        self.transport.position_seconds()
    }

    /// `position / length`; NaN when nothing is loaded.
    pub fn position_relative(&self) -> f64 {
        self.transport.position_relative()
    }

    /// Track length in seconds, 0 when nothing is loaded.
    pub fn length_in_seconds(&self) -> f64 {
        self.transport.length_in_seconds()
    }

    /// Output gain in `[0, 1]`, ramped over one block on the audio thread.
    pub fn set_gain(&self, gain: f32) -> Result<(), ParameterError> {
        self.transport.set_gain(gain)
    }

    /// Last accepted gain.
    pub fn gain(&self) -> f32 {
        self.transport.gain()
    }

    /// Varispeed ratio in `[0.25, 4]`. Pitch follows speed.
    pub fn set_speed(&self, ratio: f64) -> Result<(), ParameterError> {
        self.speed.set_speed(ratio)
    }

    pub fn speed(&self) -> f64 {
        self.speed.speed()
    }

    /// Reverb room size in `[0, 1]`.
    ///
    /// Each reverb setter publishes a whole new parameter set, so the audio
    /// thread never sees half of an update.
    pub fn set_room_size(&self, value: f32) -> Result<(), ParameterError> {
        self.reverb.set_room_size(value)
    }

    /// Reverb damping in `[0, 1]`.
    pub fn set_damping(&self, value: f32) -> Result<(), ParameterError> {
        self.reverb.set_damping(value)
    }

    /// Reverb wet level in `[0, 1]`.
    pub fn set_wet_level(&self, value: f32) -> Result<(), ParameterError> {
        self.reverb.set_wet_level(value)
    }

    /// Reverb dry level in `[0, 1]`.
    pub fn set_dry_level(&self, value: f32) -> Result<(), ParameterError> {
        self.reverb.set_dry_level(value)
    }

    /// Replace all four reverb parameters at once. Rejected as a whole if any
    /// field is out of range.
    pub fn set_reverb_parameters(&self, parameters: ReverbParameters) -> Result<(), ParameterError> {
        self.reverb.set_parameters(parameters)
    }

    pub fn reverb_parameters(&self) -> ReverbParameters {
        self.reverb.parameters()
    }

    /// Peak envelope of the loaded track for waveform overviews. Computed
    /// once per load; `None` when nothing is loaded.
    pub fn waveform(&self) -> Option<Arc<[PeakWindow]>> {
        self.transport.peaks()
    }

    /// Restart at `length * restart_fraction` if the position is within
    /// [`LOOP_TAIL_SECONDS`] of the end. Returns whether a seek was issued.
    ///
    /// Loop accuracy is bounded by how often this is called.
    pub fn loop_to(&self, restart_fraction: f64) -> bool {
        let length = self.length_in_seconds();
        if length <= 0.0 {
            return false;
        }
        if self.position_seconds() >= length - LOOP_TAIL_SECONDS {
            self.set_position(length * restart_fraction);
            return true;
        }
        false
    }

    /// Arm or disarm looping. The flag is read by the loop poller, not the
    /// audio thread.
    pub fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::Relaxed);
    }

    /// Flip the loop flag, returning the new value.
    pub fn toggle_looping(&self) -> bool {
        !self.looping.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Relaxed)
    }
}
