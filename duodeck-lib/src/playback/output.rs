//! Device adapters that drive an [`AudioCallback`].
//!
//! [`OutputDevice`] plays through the default rodio output stream.
//! [`OfflineDevice`] renders without hardware, advancing the audio clock as
//! fast as the callback can fill blocks.

use crate::audio::AudioCallback;
use crate::constants::CHANNELS;

#[cfg(feature = "device")]
pub use self::device::OutputDevice;

/// Renders a callback in fixed-size blocks without an audio device.
pub struct OfflineDevice {
    block_size: usize,
    sample_rate: u32,
    frames_rendered: u64,
    block: Vec<f32>,
}

impl OfflineDevice {
    pub fn new(block_size: usize, sample_rate: u32) -> Self {
        let block_size = block_size.max(1);
        Self {
            block_size,
            sample_rate: sample_rate.max(1),
            frames_rendered: 0,
            block: vec![0.0; block_size * CHANNELS],
        }
    }

    pub fn prepare<C: AudioCallback + ?Sized>(&self, callback: &mut C) {
        callback.prepare_to_play(self.block_size, self.sample_rate);
    }

    pub fn release<C: AudioCallback + ?Sized>(&self, callback: &mut C) {
        callback.release_resources();
    }

    /// Render `frames` frames and return them interleaved.
    pub fn render<C: AudioCallback + ?Sized>(&mut self, callback: &mut C, frames: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(frames * CHANNELS);
        self.pump(callback, frames, |block| out.extend_from_slice(block));
        out
    }

    /// Run the callback for `seconds` of audio, discarding the output.
    /// Returns the number of frames rendered.
    pub fn advance<C: AudioCallback + ?Sized>(&mut self, callback: &mut C, seconds: f64) -> usize {
        let frames = (seconds.max(0.0) * self.sample_rate as f64).round() as usize;
        self.pump(callback, frames, |_| {});
        frames
    }

    /// Seconds of audio rendered since construction.
    pub fn elapsed_seconds(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    fn pump<C: AudioCallback + ?Sized>(
        &mut self,
        callback: &mut C,
        frames: usize,
        mut sink: impl FnMut(&[f32]),
    ) {
        let mut remaining = frames;
        while remaining > 0 {
            let n = remaining.min(self.block_size);
            let block = &mut self.block[..n * CHANNELS];
            callback.get_next_audio_block(block);
            sink(block);
            remaining -= n;
            self.frames_rendered += n as u64;
        }
    }
}

#[cfg(feature = "device")]
mod device {
    use std::thread;
    use std::time::Duration;

    use log::{info, warn};
    use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};

    use crate::audio::AudioCallback;
    use crate::constants::CHANNELS;
    use crate::error::OutputError;
    use crate::playback::settings::EngineConfig;

    const OUTPUT_STREAM_OPEN_RETRIES: usize = 20;
    const OUTPUT_STREAM_OPEN_RETRY_MS: u64 = 100;

    /// A running default output stream fed by a callback.
    ///
    /// Dropping the device stops playback and releases the callback.
    pub struct OutputDevice {
        _sink: Sink,
        _stream: OutputStream,
    }

    impl OutputDevice {
        /// Open the default output and start pulling blocks from `callback`.
        pub fn open<C: AudioCallback + 'static>(
            mut callback: C,
            config: &EngineConfig,
        ) -> Result<Self, OutputError> {
            let stream = open_output_stream_with_retry()?;

            callback.prepare_to_play(config.block_size, config.sample_rate);
            let source = CallbackSource {
                callback,
                block: vec![0.0; config.block_size.max(1) * CHANNELS],
                cursor: usize::MAX,
                sample_rate: config.sample_rate,
            };

            let sink = Sink::connect_new(stream.mixer());
            sink.append(source);
            sink.play();
            info!(
                "output started ({} frames @ {} Hz)",
                config.block_size, config.sample_rate
            );
            Ok(Self {
                _sink: sink,
                _stream: stream,
            })
        }
    }

    fn open_output_stream_with_retry() -> Result<OutputStream, OutputError> {
        let mut last_error = String::new();
        for attempt in 1..=OUTPUT_STREAM_OPEN_RETRIES {
            match OutputStreamBuilder::open_default_stream() {
                Ok(stream) => return Ok(stream),
                Err(err) => {
                    warn!(
                        "open_default_stream attempt {}/{} failed: {}",
                        attempt, OUTPUT_STREAM_OPEN_RETRIES, err
                    );
                    last_error = err.to_string();
                    if attempt < OUTPUT_STREAM_OPEN_RETRIES {
                        thread::sleep(Duration::from_millis(OUTPUT_STREAM_OPEN_RETRY_MS));
                    }
                }
            }
        }
        Err(OutputError::Open {
            attempts: OUTPUT_STREAM_OPEN_RETRIES,
            reason: last_error,
        })
    }

    /// Endless rodio source that refills from the callback one block at a
    /// time.
    struct CallbackSource<C: AudioCallback> {
        callback: C,
        block: Vec<f32>,
        cursor: usize,
        sample_rate: u32,
    }

    impl<C: AudioCallback> Iterator for CallbackSource<C> {
        type Item = f32;

        fn next(&mut self) -> Option<Self::Item> {
            if self.cursor >= self.block.len() {
                self.callback.get_next_audio_block(&mut self.block);
                self.cursor = 0;
            }
            let sample = self.block[self.cursor];
            self.cursor += 1;
            Some(sample)
        }
    }

    impl<C: AudioCallback> Source for CallbackSource<C> {
        fn current_span_len(&self) -> Option<usize> {
            None
        }

        fn channels(&self) -> u16 {
            CHANNELS as u16
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn total_duration(&self) -> Option<Duration> {
            None
        }
    }

    impl<C: AudioCallback> Drop for CallbackSource<C> {
        fn drop(&mut self) {
            self.callback.release_resources();
        }
    }
}
