//! Four-parameter algorithmic stereo reverb.
//!
//! This is a Freeverb-style layout:
//! 1) The stereo input is summed to mono and scaled down.
//! 2) Eight parallel lowpass-feedback comb filters per channel build the
//!    decay. The right channel's delays are offset by a small stereo spread.
//! 3) Four series allpass filters per channel smear transients so the tail
//!    sounds dense instead of grainy.
//!
//! Room size drives comb feedback, damping drives the lowpass inside the comb
//! feedback path, and the wet/dry levels set the output mix. Wet and dry gains
//! are ramped over a few milliseconds when parameters change.

use serde::{Deserialize, Serialize};

use super::gain::LinearRamp;

const COMB_TUNINGS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS: [usize; 4] = [556, 441, 341, 225];
const STEREO_SPREAD: usize = 23;
const TUNING_SAMPLE_RATE: f64 = 44_100.0;

const INPUT_GAIN: f32 = 0.015;
const WET_SCALE: f32 = 3.0;
const DAMPING_SCALE: f32 = 0.4;
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;
const ALLPASS_FEEDBACK: f32 = 0.5;
const SMOOTHING_SECONDS: f64 = 0.01;

/// The four user-facing reverb controls, each in `[0, 1]`.
///
/// Defaults are dry pass-through: no room, no damping, no wet signal, full
/// dry signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbParameters {
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
}

impl Default for ReverbParameters {
    fn default() -> Self {
        Self {
            room_size: 0.0,
            damping: 0.0,
            wet_level: 0.0,
            dry_level: 1.0,
        }
    }
}

/// Reverb processor state. Buffers are sized in [`Reverb::prepare`].
pub struct Reverb {
    parameters: ReverbParameters,
    sample_rate: u32,
    feedback: f32,
    damping: f32,
    wet: LinearRamp,
    dry: LinearRamp,
    smoothing_steps: usize,
    combs: [[CombFilter; 8]; 2],
    allpasses: [[AllpassFilter; 4]; 2],
}

impl Reverb {
    pub fn new() -> Self {
        let mut reverb = Self {
            parameters: ReverbParameters::default(),
            sample_rate: 0,
            feedback: 0.0,
            damping: 0.0,
            wet: LinearRamp::new(0.0),
            dry: LinearRamp::new(1.0),
            smoothing_steps: 0,
            combs: Default::default(),
            allpasses: Default::default(),
        };
        reverb.set_parameters(ReverbParameters::default());
        reverb
    }

    /// Size all delay lines for `sample_rate`. Allocates.
    pub fn prepare(&mut self, sample_rate: u32) {
        let scale = sample_rate.max(1) as f64 / TUNING_SAMPLE_RATE;
        for (channel, spread) in [0, STEREO_SPREAD].into_iter().enumerate() {
            for (comb, tuning) in self.combs[channel].iter_mut().zip(COMB_TUNINGS) {
                comb.resize(scaled(tuning + spread, scale));
            }
            for (allpass, tuning) in self.allpasses[channel].iter_mut().zip(ALLPASS_TUNINGS) {
                allpass.resize(scaled(tuning + spread, scale));
            }
        }
        self.sample_rate = sample_rate;
        self.smoothing_steps = (sample_rate as f64 * SMOOTHING_SECONDS) as usize;
        self.wet.reset(self.wet.target());
        self.dry.reset(self.dry.target());
    }

    /// Apply a complete parameter set. Never allocates.
    pub fn set_parameters(&mut self, parameters: ReverbParameters) {
        self.parameters = parameters;
        self.feedback = parameters.room_size * ROOM_SCALE + ROOM_OFFSET;
        self.damping = parameters.damping * DAMPING_SCALE;
        self.wet
            .set_target(parameters.wet_level * WET_SCALE, self.smoothing_steps);
        self.dry.set_target(parameters.dry_level, self.smoothing_steps);
    }

    pub fn parameters(&self) -> ReverbParameters {
        self.parameters
    }

    /// Clear all delay lines without releasing them.
    pub fn reset(&mut self) {
        for comb in self.combs.iter_mut().flatten() {
            comb.clear();
        }
        for allpass in self.allpasses.iter_mut().flatten() {
            allpass.clear();
        }
    }

    /// Release delay line storage.
    pub fn release(&mut self) {
        for comb in self.combs.iter_mut().flatten() {
            comb.resize(0);
        }
        for allpass in self.allpasses.iter_mut().flatten() {
            allpass.resize(0);
        }
        self.sample_rate = 0;
    }

    /// Process an interleaved stereo block in place.
    pub fn process(&mut self, block: &mut [f32]) {
        if self.sample_rate == 0 {
            return;
        }

        let [left_combs, right_combs] = &mut self.combs;
        let [left_allpasses, right_allpasses] = &mut self.allpasses;

        for frame in block.chunks_exact_mut(2) {
            let (left, right) = (frame[0], frame[1]);
            let input = (left + right) * INPUT_GAIN;

            let mut wet_left = 0.0;
            let mut wet_right = 0.0;
            for comb in left_combs.iter_mut() {
                wet_left += comb.process(input, self.feedback, self.damping);
            }
            for comb in right_combs.iter_mut() {
                wet_right += comb.process(input, self.feedback, self.damping);
            }
            for allpass in left_allpasses.iter_mut() {
                wet_left = allpass.process(wet_left);
            }
            for allpass in right_allpasses.iter_mut() {
                wet_right = allpass.process(wet_right);
            }

            let wet = self.wet.next_value();
            let dry = self.dry.next_value();
            frame[0] = wet_left * wet + left * dry;
            frame[1] = wet_right * wet + right * dry;
        }
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new()
    }
}

fn scaled(tuning: usize, scale: f64) -> usize {
    ((tuning as f64 * scale).round() as usize).max(1)
}

#[derive(Clone, Default)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    lowpass: f32,
}

impl CombFilter {
    fn resize(&mut self, len: usize) {
        self.buffer = vec![0.0; len];
        self.index = 0;
        self.lowpass = 0.0;
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.lowpass = 0.0;
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damping: f32) -> f32 {
        let Some(&output) = self.buffer.get(self.index) else {
            return 0.0;
        };
        self.lowpass = output * (1.0 - damping) + self.lowpass * damping;
        self.buffer[self.index] = input + self.lowpass * feedback;
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }
        output
    }
}

#[derive(Clone, Default)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn resize(&mut self, len: usize) {
        self.buffer = vec![0.0; len];
        self.index = 0;
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let Some(&delayed) = self.buffer.get(self.index) else {
            return input;
        };
        self.buffer[self.index] = input + delayed * ALLPASS_FEEDBACK;
        self.index += 1;
        if self.index >= self.buffer.len() {
            self.index = 0;
        }
        delayed - input
    }
}
