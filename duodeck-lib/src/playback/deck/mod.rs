//! Per-deck playback pipeline.
//!
//! A deck is `Transport -> ResamplerStage -> ReverbStage`, pulled from the
//! reverb end by the device callback. [`DeckEngine`] is the audio half and
//! lives inside the callback; [`DeckHandle`] is the control half.

mod controls;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::audio::{clear, AudioCallback, AudioDecoder, SymphoniaDecoder};
use crate::constants::CHANNELS;

use super::resampler::ResamplerStage;
use super::reverb::ReverbStage;
use super::transport::Transport;

pub use controls::DeckHandle;

type Chain = ReverbStage<ResamplerStage<Transport>>;

/// Audio-domain half of a deck.
pub struct DeckEngine {
    chain: Chain,
    handle: DeckHandle,
    block_size: usize,
}

impl DeckEngine {
    pub fn new(decoder: Arc<dyn AudioDecoder>) -> Self {
        let transport = Transport::new();
        let transport_control = transport.control();
        let resampler = ResamplerStage::new(transport);
        let speed = resampler.control();
        let chain = ReverbStage::new(resampler);
        let handle = DeckHandle {
            transport: transport_control,
            speed,
            reverb: chain.control(),
            looping: Arc::new(AtomicBool::new(false)),
            decoder,
        };
        Self {
            chain,
            handle,
            block_size: 0,
        }
    }

    /// Control handle for this deck. Clones share state.
    pub fn handle(&self) -> DeckHandle {
        self.handle.clone()
    }
}

impl Default for DeckEngine {
    fn default() -> Self {
        Self::new(Arc::new(SymphoniaDecoder::new()))
    }
}

impl AudioCallback for DeckEngine {
    fn prepare_to_play(&mut self, block_size: usize, sample_rate: u32) {
        self.block_size = block_size.max(1);
        self.chain.prepare_to_play(self.block_size, sample_rate);
    }

    fn get_next_audio_block(&mut self, block: &mut [f32]) {
        if self.block_size == 0 {
            clear(block);
            return;
        }
        // Devices may ask for more than they announced.
        for chunk in block.chunks_mut(self.block_size * CHANNELS) {
            self.chain.get_next_audio_block(chunk);
        }
    }

    fn release_resources(&mut self) {
        self.chain.release_resources();
        self.block_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PcmSource;
    use crate::error::DecodeError;
    use crate::playback::output::OfflineDevice;
    use crate::playback::transport::PlaybackState;
    use crate::dsp::effects::ReverbParameters;
    use approx::assert_abs_diff_eq;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::Ordering;
    use std::thread;
    use std::time::Duration;

    const RATE: u32 = 8_000;

    /// Decodes `<seconds>.wav` into a quiet sine of that length; anything
    /// else fails.
    struct ToneDecoder;

    impl AudioDecoder for ToneDecoder {
        fn decode(&self, path: &Path) -> Result<PcmSource, DecodeError> {
            let seconds: usize = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse().ok())
                .ok_or_else(|| DecodeError::Unsupported(path.display().to_string()))?;
            Ok(PcmSource::from_fn(seconds * RATE as usize, RATE, |i| {
                let v = (i as f32 * 0.05).sin() * 0.1;
                (v, v)
            }))
        }
    }

    fn deck() -> (DeckEngine, DeckHandle, OfflineDevice) {
        let mut engine = DeckEngine::new(Arc::new(ToneDecoder));
        let device = OfflineDevice::new(512, RATE);
        device.prepare(&mut engine);
        let handle = engine.handle();
        (engine, handle, device)
    }

    #[test]
    fn silence_until_a_source_is_loaded() {
        let (mut engine, handle, mut device) = deck();
        assert!(!handle.play());
        let rendered = device.render(&mut engine, 2_000);
        assert!(rendered.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn double_speed_covers_the_track_in_half_the_time() {
        let (mut engine, handle, mut device) = deck();
        handle.load(Path::new("120.wav")).unwrap();
        handle.set_speed(2.0).unwrap();
        assert!(handle.play());

        device.advance(&mut engine, 60.0);
        assert_abs_diff_eq!(handle.position_seconds(), 120.0, epsilon = 0.1);
        assert_abs_diff_eq!(handle.length_in_seconds(), 120.0);
    }

    #[test]
    fn stop_freezes_and_play_resumes_without_reset() {
        let (mut engine, handle, mut device) = deck();
        handle.load(Path::new("120.wav")).unwrap();
        handle.set_speed(2.0).unwrap();
        handle.play();

        device.advance(&mut engine, 30.0);
        let frozen = handle.position_seconds();
        assert_abs_diff_eq!(frozen, 60.0, epsilon = 0.1);

        handle.stop();
        device.advance(&mut engine, 5.0);
        assert_eq!(handle.position_seconds(), frozen);
        assert_eq!(handle.state(), PlaybackState::Stopped);

        handle.play();
        device.advance(&mut engine, 1.0);
        assert_abs_diff_eq!(handle.position_seconds(), frozen + 2.0, epsilon = 0.1);
    }

    #[test]
    fn failed_load_keeps_previous_source_and_position() {
        let (_engine, handle, _device) = deck();
        handle.load(Path::new("10.wav")).unwrap();
        handle.set_position(4.0);

        let err = handle.load(Path::new("broken.mp3")).unwrap_err();
        assert_eq!(err.path, PathBuf::from("broken.mp3"));
        assert!(handle.is_loaded());
        assert_abs_diff_eq!(handle.length_in_seconds(), 10.0);
        assert_abs_diff_eq!(handle.position_seconds(), 4.0);
    }

    #[test]
    fn successful_load_resets_position_and_length() {
        let (_engine, handle, _device) = deck();
        handle.load(Path::new("10.wav")).unwrap();
        handle.set_position(4.0);
        handle.load(Path::new("30.wav")).unwrap();
        assert_eq!(handle.position_seconds(), 0.0);
        assert_abs_diff_eq!(handle.length_in_seconds(), 30.0);
    }

    #[test]
    fn loop_seeks_only_inside_the_tail() {
        let (_engine, handle, _device) = deck();
        handle.load(Path::new("10.wav")).unwrap();

        handle.set_position(7.9);
        assert!(!handle.loop_to(0.0));
        assert_abs_diff_eq!(handle.position_seconds(), 7.9, epsilon = 1e-9);

        handle.set_position(8.0);
        assert!(handle.loop_to(0.0));
        assert_eq!(handle.position_seconds(), 0.0);
    }

    #[test]
    fn loop_honours_a_restart_fraction() {
        let (_engine, handle, _device) = deck();
        handle.load(Path::new("10.wav")).unwrap();
        handle.set_position(9.5);
        assert!(handle.loop_to(0.5));
        assert_abs_diff_eq!(handle.position_seconds(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn loop_without_a_source_is_a_no_op() {
        let (_engine, handle, _device) = deck();
        assert!(!handle.loop_to(0.0));
        assert!(handle.position_relative().is_nan());
    }

    #[test]
    fn out_of_range_setters_are_idempotent_rejections() {
        let (_engine, handle, _device) = deck();
        handle.set_gain(0.8).unwrap();
        handle.set_speed(1.25).unwrap();
        handle.set_room_size(0.6).unwrap();
        let reverb = handle.reverb_parameters();

        for _ in 0..2 {
            assert!(handle.set_gain(-0.5).is_err());
            assert!(handle.set_speed(5.0).is_err());
            assert!(handle.set_room_size(1.01).is_err());
            assert!(handle.set_damping(-1.0).is_err());
            assert!(handle.set_wet_level(3.0).is_err());
            assert!(handle.set_dry_level(f32::NAN).is_err());
        }

        assert_eq!(handle.gain(), 0.8);
        assert_eq!(handle.speed(), 1.25);
        assert_eq!(handle.reverb_parameters(), reverb);
    }

    #[test]
    fn only_single_file_drops_load() {
        let (_engine, handle, _device) = deck();
        let two = vec![PathBuf::from("10.wav"), PathBuf::from("20.wav")];
        assert!(!handle.load_dropped(&two).unwrap());
        assert!(!handle.is_loaded());

        assert!(handle.load_dropped(&[PathBuf::from("20.wav")]).unwrap());
        assert_abs_diff_eq!(handle.length_in_seconds(), 20.0);
    }

    #[test]
    fn loop_flag_toggles() {
        let (_engine, handle, _device) = deck();
        assert!(!handle.is_looping());
        assert!(handle.toggle_looping());
        assert!(handle.is_looping());
        handle.set_looping(false);
        assert!(!handle.is_looping());
    }

    #[test]
    fn oversized_device_blocks_are_split() {
        let mut engine = DeckEngine::new(Arc::new(ToneDecoder));
        engine.prepare_to_play(64, RATE);
        let handle = engine.handle();
        handle.load(Path::new("5.wav")).unwrap();
        handle.play();

        let mut block = vec![0.0_f32; 1_000 * 2];
        engine.get_next_audio_block(&mut block);
        assert!(block.iter().any(|s| *s != 0.0));
        assert_abs_diff_eq!(handle.position_seconds(), 1_000.0 / RATE as f64, epsilon = 1e-3);
    }

    #[test]
    fn control_thread_and_render_thread_stay_consistent() {
        let (mut engine, handle, _device) = deck();
        handle.load(Path::new("600.wav")).unwrap();
        handle.play();

        let a = ReverbParameters {
            room_size: 0.2,
            damping: 0.3,
            wet_level: 0.4,
            dry_level: 0.5,
        };
        let b = ReverbParameters {
            room_size: 0.9,
            damping: 0.8,
            wet_level: 0.7,
            dry_level: 0.6,
        };

        let done = Arc::new(AtomicBool::new(false));
        let render = {
            let done = done.clone();
            thread::spawn(move || {
                let mut block = vec![0.0_f32; 512 * CHANNELS];
                let mut mixed = 0;
                let mut blocks = 0;
                while !done.load(Ordering::Acquire) {
                    engine.get_next_audio_block(&mut block);
                    let active = engine.chain.active_parameters();
                    if active != ReverbParameters::default() && active != a && active != b {
                        mixed += 1;
                    }
                    blocks += 1;
                    thread::sleep(Duration::from_micros(50));
                }
                (mixed, blocks)
            })
        };

        for i in 0..2_000 {
            handle
                .set_reverb_parameters(if i % 2 == 0 { a } else { b })
                .unwrap();
        }

        // Seeks must be visible at once, never the position before the seek.
        for i in 0..500 {
            let target = if i % 2 == 0 { 100.0 } else { 450.0 };
            handle.set_position(target);
            let position = handle.position_seconds();
            assert!(
                position >= target && position < target + 100.0,
                "seek to {} read back {}",
                target,
                position
            );
        }

        for i in 0..200 {
            let (name, length) = if i % 2 == 0 { ("2.wav", 2.0) } else { ("3.wav", 3.0) };
            handle.load(Path::new(name)).unwrap();
            handle.play();
            assert_abs_diff_eq!(handle.length_in_seconds(), length);
            assert!(handle.position_seconds() <= length);
            assert_eq!(handle.waveform().map(|peaks| peaks.len()), Some(512));
        }

        done.store(true, Ordering::Release);
        let (mixed, blocks) = render.join().unwrap();
        assert_eq!(mixed, 0);
        assert!(blocks > 0);
        assert_eq!(handle.reverb_parameters(), b);
    }
}
