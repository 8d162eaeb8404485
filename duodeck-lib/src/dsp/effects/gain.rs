//! Gain smoothing.

/// Linear ramp from the current value to a target over a fixed number of
/// steps. Used to apply gain changes without zipper noise.
#[derive(Debug, Clone, Copy)]
pub struct LinearRamp {
    current: f32,
    target: f32,
    step: f32,
    remaining: usize,
}

impl LinearRamp {
    /// Start settled at `value`.
    pub fn new(value: f32) -> Self {
        Self {
            current: value,
            target: value,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Move towards `target` over `steps` calls to [`LinearRamp::next_value`].
    ///
    /// Re-targeting to the same value keeps the ramp in progress.
    pub fn set_target(&mut self, target: f32, steps: usize) {
        if target == self.target {
            return;
        }
        self.target = target;
        if steps == 0 {
            self.current = target;
            self.remaining = 0;
            self.step = 0.0;
            return;
        }
        self.remaining = steps;
        self.step = (target - self.current) / steps as f32;
    }

    /// Jump straight to `value`.
    pub fn reset(&mut self, value: f32) {
        *self = Self::new(value);
    }

    #[inline]
    pub fn next_value(&mut self) -> f32 {
        if self.remaining == 0 {
            return self.target;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            self.current = self.target;
        } else {
            self.current += self.step;
        }
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}
