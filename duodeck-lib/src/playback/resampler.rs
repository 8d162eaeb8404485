//! Varispeed stage: linear-interpolating resampler over an upstream callback.
//!
//! For a speed ratio `r` each output frame advances the read head by `r`
//! upstream frames. The fractional phase and the last upstream frames needed
//! for interpolation are carried across blocks, so a block boundary never
//! causes a click or drops a frame.

use std::sync::Arc;

use log::warn;

use crate::audio::{frames_in, AudioCallback};
use crate::constants::{CHANNELS, MAX_SPEED, MIN_SPEED};
use crate::error::ParameterError;

use super::atomic::AtomicF32;

pub struct ResamplerStage<S> {
    upstream: S,
    speed: Arc<AtomicF32>,
    /// Interleaved upstream frames; the first `carry` frames are left over
    /// from the previous block.
    window: Vec<f32>,
    carry: usize,
    phase: f64,
    max_block: usize,
}

impl<S: AudioCallback> ResamplerStage<S> {
    pub fn new(upstream: S) -> Self {
        Self {
            upstream,
            speed: Arc::new(AtomicF32::new(1.0)),
            window: Vec::new(),
            carry: 0,
            phase: 0.0,
            max_block: 0,
        }
    }

    pub fn control(&self) -> SpeedControl {
        SpeedControl {
            speed: self.speed.clone(),
        }
    }

    pub fn upstream(&self) -> &S {
        &self.upstream
    }

    fn reset_window(&mut self) {
        self.window.fill(0.0);
        // One silent frame primes the interpolator.
        self.carry = 1;
        self.phase = 0.0;
    }
}

impl<S: AudioCallback> AudioCallback for ResamplerStage<S> {
    fn prepare_to_play(&mut self, block_size: usize, sample_rate: u32) {
        self.upstream.prepare_to_play(block_size, sample_rate);
        self.max_block = block_size;
        let max_window = (block_size as f64 * MAX_SPEED).ceil() as usize + 4;
        self.window = vec![0.0; max_window * CHANNELS];
        self.reset_window();
    }

    fn get_next_audio_block(&mut self, block: &mut [f32]) {
        let frames = frames_in(block);
        if frames == 0 || frames > self.max_block {
            block.fill(0.0);
            return;
        }

        let ratio = self.speed.load() as f64;
        let last_t = self.phase + (frames - 1) as f64 * ratio;
        let end_t = self.phase + frames as f64 * ratio;
        let window_len = (last_t.floor() as usize + 2).max(end_t.floor() as usize + 1);
        if window_len * CHANNELS > self.window.len() {
            block.fill(0.0);
            return;
        }

        let carry = self.carry.min(window_len);
        self.upstream
            .get_next_audio_block(&mut self.window[carry * CHANNELS..window_len * CHANNELS]);

        for (index, frame) in block.chunks_exact_mut(CHANNELS).enumerate() {
            let t = self.phase + index as f64 * ratio;
            let base = t.floor();
            let frac = (t - base) as f32;
            let i = base as usize * CHANNELS;
            let (l0, r0) = (self.window[i], self.window[i + 1]);
            let (l1, r1) = (self.window[i + 2], self.window[i + 3]);
            frame[0] = l0 + (l1 - l0) * frac;
            frame[1] = r0 + (r1 - r0) * frac;
        }

        let consumed = (end_t.floor() as usize).min(window_len);
        self.window
            .copy_within(consumed * CHANNELS..window_len * CHANNELS, 0);
        self.carry = window_len - consumed;
        self.phase = end_t - consumed as f64;
    }

    fn release_resources(&mut self) {
        self.upstream.release_resources();
        self.window = Vec::new();
        self.carry = 0;
        self.phase = 0.0;
        self.max_block = 0;
    }
}

/// Control-domain handle for the playback speed.
#[derive(Clone)]
pub struct SpeedControl {
    speed: Arc<AtomicF32>,
}

impl SpeedControl {
    /// Set the speed ratio in `[MIN_SPEED, MAX_SPEED]`. Out-of-range values
    /// are rejected and the previous ratio stays active.
    pub fn set_speed(&self, ratio: f64) -> Result<(), ParameterError> {
        if let Err(err) = ParameterError::check("speed", ratio, MIN_SPEED, MAX_SPEED) {
            warn!("rejected speed: {}", err);
            return Err(err);
        }
        self.speed.store(ratio as f32);
        Ok(())
    }

    pub fn speed(&self) -> f64 {
        self.speed.load() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Emits an increasing frame counter on both channels.
    struct Counter {
        next: f32,
        pulled: usize,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                next: 0.0,
                pulled: 0,
            }
        }
    }

    impl AudioCallback for Counter {
        fn prepare_to_play(&mut self, _block_size: usize, _sample_rate: u32) {}

        fn get_next_audio_block(&mut self, block: &mut [f32]) {
            for frame in block.chunks_exact_mut(2) {
                frame[0] = self.next;
                frame[1] = self.next;
                self.next += 1.0;
                self.pulled += 1;
            }
        }

        fn release_resources(&mut self) {}
    }

    fn stage(block: usize, speed: f64) -> ResamplerStage<Counter> {
        let mut stage = ResamplerStage::new(Counter::new());
        stage.prepare_to_play(block, 1_000);
        stage.control().set_speed(speed).unwrap();
        stage
    }

    fn render(stage: &mut ResamplerStage<Counter>, blocks: usize, frames: usize) -> Vec<f32> {
        let mut out = Vec::new();
        let mut block = vec![0.0_f32; frames * 2];
        for _ in 0..blocks {
            stage.get_next_audio_block(&mut block);
            out.extend(block.iter().step_by(2));
        }
        out
    }

    #[test]
    fn unity_speed_delays_by_one_priming_frame() {
        let mut stage = stage(64, 1.0);
        let out = render(&mut stage, 3, 64);
        assert_eq!(out[0], 0.0);
        for (index, value) in out.iter().enumerate().skip(1) {
            assert_eq!(*value, (index - 1) as f32);
        }
    }

    #[test]
    fn double_speed_consumes_two_frames_per_output_frame() {
        let mut stage = stage(64, 2.0);
        let out = render(&mut stage, 4, 64);
        for pair in out.windows(2).skip(1) {
            assert_relative_eq!(pair[1] - pair[0], 2.0);
        }
        let pulled = stage.upstream().pulled;
        assert!((pulled as i64 - 4 * 64 * 2).abs() <= 2, "pulled {pulled}");
    }

    #[test]
    fn fractional_speed_is_continuous_across_blocks() {
        let mut stage = stage(37, 0.75);
        let out = render(&mut stage, 10, 37);
        for pair in out.windows(2).skip(2) {
            assert_relative_eq!(pair[1] - pair[0], 0.75, epsilon = 1e-4);
        }
    }

    #[test]
    fn max_speed_fits_the_window() {
        let mut stage = stage(128, MAX_SPEED);
        let out = render(&mut stage, 5, 128);
        assert_relative_eq!(out[out.len() - 1] - out[out.len() - 2], 4.0);
    }

    #[test]
    fn out_of_range_speed_is_rejected() {
        let stage = stage(64, 1.5);
        let control = stage.control();
        assert!(control.set_speed(0.2).is_err());
        assert!(control.set_speed(4.01).is_err());
        assert!(control.set_speed(f64::NAN).is_err());
        assert_relative_eq!(control.speed(), 1.5);
        control.set_speed(MIN_SPEED).unwrap();
        control.set_speed(MAX_SPEED).unwrap();
        assert_relative_eq!(control.speed(), 4.0);
    }
}
