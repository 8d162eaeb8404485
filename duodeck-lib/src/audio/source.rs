//! Fully decoded, in-memory PCM source.

use crate::constants::CHANNELS;

/// Decoded interleaved-stereo audio owned by a deck.
///
/// Reads are plain slice indexing so the audio thread never allocates or
/// blocks while rendering from it.
#[derive(Clone)]
pub struct PcmSource {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl PcmSource {
    /// Wrap interleaved stereo samples. A trailing partial frame is dropped.
    pub fn from_interleaved(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        let whole = samples.len() - samples.len() % CHANNELS;
        samples.truncate(whole);
        Self {
            samples,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Build a source by evaluating `f(frame_index) -> (left, right)`.
    pub fn from_fn(frames: usize, sample_rate: u32, mut f: impl FnMut(usize) -> (f32, f32)) -> Self {
        let mut samples = Vec::with_capacity(frames * CHANNELS);
        for index in 0..frames {
            let (left, right) = f(index);
            samples.push(left);
            samples.push(right);
        }
        Self::from_interleaved(samples, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of stereo frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    pub fn length_in_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Stereo frame at `index`, silence past the end.
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        let offset = index * CHANNELS;
        match self.samples.get(offset..offset + CHANNELS) {
            Some(frame) => (frame[0], frame[1]),
            None => (0.0, 0.0),
        }
    }

    /// Linearly interpolated frame at a fractional position.
    #[inline]
    pub fn frame_at(&self, position: f64) -> (f32, f32) {
        let index = position.floor();
        let frac = (position - index) as f32;
        let index = index as usize;
        let (l0, r0) = self.frame(index);
        if frac == 0.0 {
            return (l0, r0);
        }
        let (l1, r1) = self.frame(index + 1);
        (l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac)
    }
}

impl std::fmt::Debug for PcmSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmSource")
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn length_follows_frames_and_rate() {
        let source = PcmSource::from_fn(8_000 * 3, 8_000, |_| (0.0, 0.0));
        assert_eq!(source.frames(), 24_000);
        assert_relative_eq!(source.length_in_seconds(), 3.0);
    }

    #[test]
    fn partial_trailing_frame_is_dropped() {
        let source = PcmSource::from_interleaved(vec![0.1, 0.2, 0.3], 100);
        assert_eq!(source.frames(), 1);
    }

    #[test]
    fn interpolates_between_frames() {
        let source = PcmSource::from_interleaved(vec![0.0, 1.0, 1.0, 0.0], 100);
        let (left, right) = source.frame_at(0.25);
        assert_relative_eq!(left, 0.25);
        assert_relative_eq!(right, 0.75);
    }

    #[test]
    fn reads_past_end_are_silent() {
        let source = PcmSource::from_interleaved(vec![0.5, 0.5], 100);
        assert_eq!(source.frame(3), (0.0, 0.0));
        assert_eq!(source.frame_at(0.5), (0.25, 0.25));
    }
}
