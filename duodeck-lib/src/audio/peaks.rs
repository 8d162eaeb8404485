//! Coarse peak envelope of a decoded source, used for waveform overviews.

use super::source::PcmSource;

/// Extremes of one window of frames, both channels folded together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakWindow {
    pub max: f32,
    pub min: f32,
}

impl PeakWindow {
    /// Largest absolute excursion in the window.
    pub fn amplitude(&self) -> f32 {
        self.max.abs().max(self.min.abs())
    }
}

#[derive(Debug)]
struct PeakAccumulator {
    current_max: f32,
    current_min: f32,
    count: usize,
}

impl PeakAccumulator {
    fn new() -> Self {
        Self {
            current_max: f32::MIN,
            current_min: f32::MAX,
            count: 0,
        }
    }

    fn push(&mut self, sample: f32) {
        self.current_max = self.current_max.max(sample);
        self.current_min = self.current_min.min(sample);
        self.count += 1;
    }

    fn take(&mut self) -> PeakWindow {
        let window = if self.count == 0 {
            PeakWindow { max: 0.0, min: 0.0 }
        } else {
            PeakWindow {
                max: self.current_max,
                min: self.current_min,
            }
        };
        *self = Self::new();
        window
    }
}

/// Split `source` into `windows` near-equal spans and record the extremes of
/// each. A source shorter than `windows` frames yields one window per frame.
pub fn extract_peaks(source: &PcmSource, windows: usize) -> Vec<PeakWindow> {
    let frames = source.frames();
    if frames == 0 || windows == 0 {
        return Vec::new();
    }
    let windows = windows.min(frames);

    let mut accumulator = PeakAccumulator::new();
    let mut peaks = Vec::with_capacity(windows);
    for window in 0..windows {
        let start = window * frames / windows;
        let end = (window + 1) * frames / windows;
        for index in start..end {
            let (left, right) = source.frame(index);
            accumulator.push(left);
            accumulator.push(right);
        }
        peaks.push(accumulator.take());
    }
    peaks
}
