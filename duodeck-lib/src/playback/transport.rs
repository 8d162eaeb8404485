//! Transport: owns the decoded source, the playback position and the
//! play/stop state of one deck.
//!
//! The audio side ([`Transport`]) is the only writer of the position. Control
//! code goes through [`TransportControl`], which publishes sources through a
//! `basedrop::SharedCell`, seeks through a pending-seek slot and scalars
//! through atomics, so rendering a block never waits on the control domain.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use basedrop::{Shared, SharedCell};
use log::{debug, warn};

use crate::audio::{clear, extract_peaks, AudioCallback, PcmSource, PeakWindow};
use crate::constants::WAVEFORM_WINDOWS;
use crate::dsp::effects::LinearRamp;
use crate::error::ParameterError;

use super::atomic::{AtomicF32, AtomicF64};
use super::gc::gc_handle;

/// Empty pending-seek slot. Real targets are never negative.
const NO_SEEK: f64 = -1.0;

/// Play/stop state of a deck. There is no paused state: stopping keeps the
/// position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

struct LoadedSource {
    pcm: PcmSource,
    peaks: Arc<[PeakWindow]>,
    generation: u64,
}

struct TransportShared {
    source: SharedCell<Option<LoadedSource>>,
    generation: AtomicU64,
    /// Read position in source frames.
    position: AtomicF64,
    /// Seek target in source frames, or `NO_SEEK`.
    pending_seek: AtomicF64,
    playing: AtomicBool,
    gain: AtomicF32,
}

/// Audio-domain half of the transport.
pub struct Transport {
    shared: Arc<TransportShared>,
    device_rate: u32,
    generation: u64,
    gain: LinearRamp,
}

impl Transport {
    pub fn new() -> Self {
        let shared = Arc::new(TransportShared {
            source: SharedCell::new(Shared::new(&gc_handle(), None)),
            generation: AtomicU64::new(0),
            position: AtomicF64::new(0.0),
            pending_seek: AtomicF64::new(NO_SEEK),
            playing: AtomicBool::new(false),
            gain: AtomicF32::new(1.0),
        });
        Self {
            shared,
            device_rate: 0,
            generation: 0,
            gain: LinearRamp::new(1.0),
        }
    }

    /// Control handle sharing this transport's state.
    pub fn control(&self) -> TransportControl {
        TransportControl {
            shared: self.shared.clone(),
        }
    }
}

impl Transport {
    /// Store the end-of-block position, then release the seek consumed at
    /// block start. A seek issued during the block is left pending.
    fn publish_position(&self, position: f64, consumed_seek: f64) {
        self.shared.position.store(position);
        if consumed_seek >= 0.0 {
            self.shared
                .pending_seek
                .compare_exchange(consumed_seek, NO_SEEK);
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCallback for Transport {
    fn prepare_to_play(&mut self, _block_size: usize, sample_rate: u32) {
        self.device_rate = sample_rate;
        self.gain.reset(self.shared.gain.load());
    }

    fn get_next_audio_block(&mut self, block: &mut [f32]) {
        let snapshot = self.shared.source.get();
        let loaded = match snapshot.as_ref() {
            Some(loaded) if self.device_rate > 0 => loaded,
            _ => {
                clear(block);
                return;
            }
        };

        let mut position = self.shared.position.load();
        if loaded.generation != self.generation {
            self.generation = loaded.generation;
            position = 0.0;
        }
        // The slot stays set until the position it produced is published, so
        // queries never fall back to the pre-seek position mid-block.
        let seek = self.shared.pending_seek.load();
        if seek >= 0.0 {
            position = seek;
        }

        let length = loaded.pcm.frames() as f64;
        position = position.min(length);

        if !self.shared.playing.load(Ordering::Acquire) {
            clear(block);
            self.publish_position(position, seek);
            return;
        }

        let frames = block.len() / 2;
        self.gain.set_target(self.shared.gain.load(), frames);

        let step = loaded.pcm.sample_rate() as f64 / self.device_rate as f64;
        let mut ended = false;
        for frame in block.chunks_exact_mut(2) {
            if position >= length {
                ended = true;
                frame[0] = 0.0;
                frame[1] = 0.0;
                continue;
            }
            let (left, right) = loaded.pcm.frame_at(position);
            let gain = self.gain.next_value();
            frame[0] = left * gain;
            frame[1] = right * gain;
            position += step;
        }

        if ended || position >= length {
            position = length;
            self.shared.playing.store(false, Ordering::Release);
        }
        self.publish_position(position, seek);
    }

    fn release_resources(&mut self) {
        self.device_rate = 0;
    }
}

/// Control-domain handle to a [`Transport`]. Cheap to clone.
#[derive(Clone)]
pub struct TransportControl {
    shared: Arc<TransportShared>,
}

impl TransportControl {
    /// Publish a fully decoded source. Position resets to 0 and the deck stops.
    ///
    /// The previous source is reclaimed on the collector thread once the audio
    /// thread has let go of it.
    pub fn load_source(&self, pcm: PcmSource) {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(
            "loading source generation {} ({:.2}s @ {} Hz)",
            generation,
            pcm.length_in_seconds(),
            pcm.sample_rate()
        );
        let peaks = extract_peaks(&pcm, WAVEFORM_WINDOWS).into();
        self.shared.playing.store(false, Ordering::Release);
        self.shared.source.set(Shared::new(
            &gc_handle(),
            Some(LoadedSource {
                pcm,
                peaks,
                generation,
            }),
        ));
        self.shared.pending_seek.store(0.0);
    }

    /// Start playing from the current position. Returns `false` (and does
    /// nothing) when no source is loaded.
    pub fn play(&self) -> bool {
        if !self.is_loaded() {
            debug!("play ignored: no source loaded");
            return false;
        }
        self.shared.playing.store(true, Ordering::Release);
        true
    }

    /// Stop; the position is retained.
    pub fn stop(&self) {
        self.shared.playing.store(false, Ordering::Release);
    }

    /// `Playing` until stopped or the source runs out.
    pub fn state(&self) -> PlaybackState {
        if self.shared.playing.load(Ordering::Acquire) {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    /// Whether any source has been published.
    pub fn is_loaded(&self) -> bool {
        self.shared.source.get().is_some()
    }

    /// Seek to `seconds`, clamped to `[0, length]`. No-op without a source.
    pub fn set_position(&self, seconds: f64) {
        let snapshot = self.shared.source.get();
        let Some(loaded) = snapshot.as_ref() else {
            return;
        };
        let seconds = if seconds.is_nan() { 0.0 } else { seconds };
        let clamped = seconds.clamp(0.0, loaded.pcm.length_in_seconds());
        self.shared
            .pending_seek
            .store(clamped * loaded.pcm.sample_rate() as f64);
    }

    /// Seek to `fraction * length`. Fractions outside `[0, 1]` are rejected
    /// and the position is left unchanged.
    pub fn set_position_relative(&self, fraction: f64) -> Result<(), ParameterError> {
        if let Err(err) = ParameterError::check("position", fraction, 0.0, 1.0) {
            warn!("rejected relative position: {}", err);
            return Err(err);
        }
        self.set_position(fraction * self.length_in_seconds());
        Ok(())
    }

    /// Current position in seconds, including a seek not yet picked up by
    /// the audio thread.
    pub fn position_seconds(&self) -> f64 {
        let snapshot = self.shared.source.get();
        let Some(loaded) = snapshot.as_ref() else {
            return 0.0;
        };
        let pending = self.shared.pending_seek.load();
        let frames = if pending >= 0.0 {
            pending
        } else {
            self.shared.position.load()
        };
        frames.min(loaded.pcm.frames() as f64) / loaded.pcm.sample_rate() as f64
    }

    /// `position / length`. Non-finite when nothing is loaded; callers treat
    /// non-finite or non-positive values as "no position".
    pub fn position_relative(&self) -> f64 {
        self.position_seconds() / self.length_in_seconds()
    }

    /// Length of the loaded source, 0 when nothing is loaded.
    pub fn length_in_seconds(&self) -> f64 {
        match self.shared.source.get().as_ref() {
            Some(loaded) => loaded.pcm.length_in_seconds(),
            None => 0.0,
        }
    }

    /// Peak envelope of the loaded source, `None` when nothing is loaded.
    pub fn peaks(&self) -> Option<Arc<[PeakWindow]>> {
        self.shared
            .source
            .get()
            .as_ref()
            .map(|loaded| loaded.peaks.clone())
    }

    /// Set output gain in `[0, 1]`. Out-of-range values are rejected.
    pub fn set_gain(&self, gain: f32) -> Result<(), ParameterError> {
        if let Err(err) = ParameterError::check("gain", gain as f64, 0.0, 1.0) {
            warn!("rejected gain: {}", err);
            return Err(err);
        }
        self.shared.gain.store(gain);
        Ok(())
    }

    /// Last accepted gain target.
    pub fn gain(&self) -> f32 {
        self.shared.gain.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RATE: u32 = 1_000;

    fn ramp_source(seconds: usize) -> PcmSource {
        PcmSource::from_fn(seconds * RATE as usize, RATE, |i| (i as f32, -(i as f32)))
    }

    fn prepared() -> (Transport, TransportControl) {
        let mut transport = Transport::new();
        transport.prepare_to_play(100, RATE);
        let control = transport.control();
        (transport, control)
    }

    #[test]
    fn renders_silence_without_a_source() {
        let (mut transport, control) = prepared();
        assert!(!control.play());
        let mut block = vec![1.0_f32; 200];
        transport.get_next_audio_block(&mut block);
        assert!(block.iter().all(|s| *s == 0.0));
        assert_eq!(control.length_in_seconds(), 0.0);
        assert!(!control.position_relative().is_finite());
    }

    #[test]
    fn playback_advances_and_stop_retains_position() {
        let (mut transport, control) = prepared();
        control.load_source(ramp_source(10));
        assert!(control.play());

        let mut block = vec![0.0_f32; 200];
        transport.get_next_audio_block(&mut block);
        assert_eq!(block[0], 0.0);
        assert_eq!(block[2], 1.0);
        assert_eq!(block[3], -1.0);
        assert_relative_eq!(control.position_seconds(), 0.1);

        control.stop();
        transport.get_next_audio_block(&mut block);
        assert!(block.iter().all(|s| *s == 0.0));
        assert_relative_eq!(control.position_seconds(), 0.1);

        control.play();
        transport.get_next_audio_block(&mut block);
        assert_eq!(block[0], 100.0);
    }

    #[test]
    fn set_position_clamps_to_track() {
        let (_transport, control) = prepared();
        control.load_source(ramp_source(10));
        control.set_position(42.0);
        assert_relative_eq!(control.position_seconds(), 10.0);
        control.set_position(-3.0);
        assert_relative_eq!(control.position_seconds(), 0.0);
    }

    #[test]
    fn relative_position_outside_unit_range_is_rejected() {
        let (_transport, control) = prepared();
        control.load_source(ramp_source(10));
        control.set_position_relative(0.25).unwrap();
        assert_relative_eq!(control.position_seconds(), 2.5);

        assert!(control.set_position_relative(1.5).is_err());
        assert!(control.set_position_relative(-0.1).is_err());
        assert!(control.set_position_relative(f64::NAN).is_err());
        assert_relative_eq!(control.position_seconds(), 2.5);
        assert_relative_eq!(control.position_relative(), 0.25);
    }

    #[test]
    fn end_of_stream_parks_at_length_and_stops() {
        let (mut transport, control) = prepared();
        control.load_source(ramp_source(1));
        control.set_position(0.95);
        control.play();

        let mut block = vec![1.0_f32; 200];
        transport.get_next_audio_block(&mut block);
        assert_eq!(block[0], 950.0);
        assert!(block[100..].iter().all(|s| *s == 0.0));
        assert_eq!(control.state(), PlaybackState::Stopped);
        assert_relative_eq!(control.position_seconds(), 1.0);
    }

    #[test]
    fn loading_resets_position_and_stops() {
        let (mut transport, control) = prepared();
        control.load_source(ramp_source(10));
        control.play();
        let mut block = vec![0.0_f32; 200];
        transport.get_next_audio_block(&mut block);

        control.load_source(ramp_source(4));
        assert_eq!(control.state(), PlaybackState::Stopped);
        assert_eq!(control.position_seconds(), 0.0);
        assert_relative_eq!(control.length_in_seconds(), 4.0);

        control.play();
        transport.get_next_audio_block(&mut block);
        assert_eq!(block[0], 0.0);
        assert_eq!(block[2], 1.0);
    }

    #[test]
    fn load_computes_a_peak_envelope() {
        let (_transport, control) = prepared();
        assert!(control.peaks().is_none());

        control.load_source(ramp_source(10));
        let peaks = control.peaks().unwrap();
        assert_eq!(peaks.len(), WAVEFORM_WINDOWS);
        assert_eq!(peaks[WAVEFORM_WINDOWS - 1].max, 9_999.0);

        control.load_source(PcmSource::from_fn(3, RATE, |_| (0.5, 0.5)));
        assert_eq!(control.peaks().unwrap().len(), 3);
    }

    #[test]
    fn source_rate_is_corrected_to_device_rate() {
        let mut transport = Transport::new();
        transport.prepare_to_play(100, RATE * 2);
        let control = transport.control();
        control.load_source(ramp_source(10));
        control.play();

        let mut block = vec![0.0_f32; 200];
        transport.get_next_audio_block(&mut block);
        assert_relative_eq!(block[2], 0.5);
        assert_relative_eq!(control.position_seconds(), 0.05);
    }

    #[test]
    fn seek_issued_during_a_block_is_not_lost() {
        let (mut transport, control) = prepared();
        control.load_source(ramp_source(10));
        control.set_position(2.0);
        let consumed = control.shared.pending_seek.load();

        // A newer seek lands before the block consuming the first one is
        // published.
        control.set_position(6.0);
        transport.publish_position(2.5 * RATE as f64, consumed);
        assert_relative_eq!(control.position_seconds(), 6.0);

        let mut block = vec![0.0_f32; 200];
        transport.get_next_audio_block(&mut block);
        assert_relative_eq!(control.position_seconds(), 6.0);
        assert!(control.shared.pending_seek.load() < 0.0);
    }

    #[test]
    fn seeks_are_visible_while_the_audio_thread_renders() {
        use std::sync::atomic::AtomicBool;
        use std::thread;

        let mut transport = Transport::new();
        transport.prepare_to_play(16_384, 44_100);
        let control = transport.control();
        control.load_source(PcmSource::from_fn(400 * RATE as usize, RATE, |_| (0.1, 0.1)));
        control.play();

        let done = Arc::new(AtomicBool::new(false));
        let render = {
            let done = done.clone();
            let control = control.clone();
            thread::spawn(move || {
                let mut block = vec![0.0_f32; 16_384 * 2];
                while !done.load(Ordering::Acquire) {
                    transport.get_next_audio_block(&mut block);
                    // Keep the deck running if a seek parked it at the end.
                    control.play();
                }
            })
        };

        // The targets are 290 s apart; anything near the other target is a
        // stale read. The margin absorbs blocks rendered between the two calls.
        let mut stale = 0;
        for index in 0..2_000 {
            let target = if index % 2 == 0 { 300.0 } else { 10.0 };
            control.set_position(target);
            let seen = control.position_seconds();
            if (seen - target).abs() > 50.0 {
                stale += 1;
            }
        }
        done.store(true, Ordering::Release);
        render.join().unwrap();
        assert_eq!(stale, 0);
    }

    #[test]
    fn gain_rejects_out_of_range_and_ramps_in() {
        let (mut transport, control) = prepared();
        control.load_source(PcmSource::from_fn(10_000, RATE, |_| (1.0, 1.0)));
        assert!(control.set_gain(1.5).is_err());
        assert_eq!(control.gain(), 1.0);
        control.set_gain(0.5).unwrap();
        control.play();

        let mut block = vec![0.0_f32; 200];
        transport.get_next_audio_block(&mut block);
        assert!(block[0] < 1.0 && block[0] > 0.5);
        assert_relative_eq!(block[198], 0.5);
        transport.get_next_audio_block(&mut block);
        assert!(block.iter().all(|s| (*s - 0.5).abs() < 1e-6));
    }
}
