//! Reverb stage and its control handle.
//!
//! The four reverb parameters are published as one immutable snapshot. Each
//! accepted setter builds a new snapshot from the full, validated set and
//! swaps it in with a single `SharedCell::set`; the audio thread picks it up
//! at the next block start and applies all four values together.

use std::sync::Arc;

use basedrop::{Shared, SharedCell};
use log::warn;
use parking_lot::Mutex;

use crate::audio::AudioCallback;
use crate::dsp::effects::{Reverb, ReverbParameters};
use crate::error::ParameterError;

use super::gc::gc_handle;

pub struct ReverbStage<S> {
    upstream: S,
    reverb: Reverb,
    active: ReverbParameters,
    published: Arc<SharedCell<ReverbParameters>>,
    control: ReverbControl,
}

impl<S: AudioCallback> ReverbStage<S> {
    pub fn new(upstream: S) -> Self {
        let defaults = ReverbParameters::default();
        let published = Arc::new(SharedCell::new(Shared::new(&gc_handle(), defaults)));
        let control = ReverbControl {
            parameters: Arc::new(Mutex::new(defaults)),
            published: published.clone(),
        };
        let mut reverb = Reverb::new();
        reverb.set_parameters(defaults);
        Self {
            upstream,
            reverb,
            active: defaults,
            published,
            control,
        }
    }

    pub fn control(&self) -> ReverbControl {
        self.control.clone()
    }

    pub fn upstream(&self) -> &S {
        &self.upstream
    }

    /// Parameters the audio thread is currently rendering with.
    #[cfg(test)]
    pub(crate) fn active_parameters(&self) -> ReverbParameters {
        self.active
    }
}

impl<S: AudioCallback> AudioCallback for ReverbStage<S> {
    fn prepare_to_play(&mut self, block_size: usize, sample_rate: u32) {
        self.upstream.prepare_to_play(block_size, sample_rate);
        self.active = *self.published.get();
        self.reverb.set_parameters(self.active);
        self.reverb.prepare(sample_rate);
    }

    fn get_next_audio_block(&mut self, block: &mut [f32]) {
        self.upstream.get_next_audio_block(block);

        let snapshot = self.published.get();
        if *snapshot != self.active {
            self.active = *snapshot;
            self.reverb.set_parameters(self.active);
        }

        self.reverb.process(block);

        if block.iter().any(|sample| !sample.is_finite()) {
            block.fill(0.0);
            self.reverb.reset();
        }
    }

    fn release_resources(&mut self) {
        self.upstream.release_resources();
        self.reverb.release();
    }
}

/// Control-domain handle for the reverb parameters.
#[derive(Clone)]
pub struct ReverbControl {
    parameters: Arc<Mutex<ReverbParameters>>,
    published: Arc<SharedCell<ReverbParameters>>,
}

impl ReverbControl {
    pub fn set_room_size(&self, value: f32) -> Result<(), ParameterError> {
        self.update("room_size", value, |p, v| p.room_size = v)
    }

    pub fn set_damping(&self, value: f32) -> Result<(), ParameterError> {
        self.update("damping", value, |p, v| p.damping = v)
    }

    pub fn set_wet_level(&self, value: f32) -> Result<(), ParameterError> {
        self.update("wet_level", value, |p, v| p.wet_level = v)
    }

    pub fn set_dry_level(&self, value: f32) -> Result<(), ParameterError> {
        self.update("dry_level", value, |p, v| p.dry_level = v)
    }

    /// Apply all four values. Nothing changes unless every value is valid.
    pub fn set_parameters(&self, parameters: ReverbParameters) -> Result<(), ParameterError> {
        for (name, value) in [
            ("room_size", parameters.room_size),
            ("damping", parameters.damping),
            ("wet_level", parameters.wet_level),
            ("dry_level", parameters.dry_level),
        ] {
            if let Err(err) = ParameterError::check(name, value as f64, 0.0, 1.0) {
                warn!("rejected reverb parameters: {}", err);
                return Err(err);
            }
        }
        let mut current = self.parameters.lock();
        *current = parameters;
        self.published.set(Shared::new(&gc_handle(), parameters));
        Ok(())
    }

    /// The parameter set the audio thread is applying (or will apply at the
    /// next block).
    pub fn parameters(&self) -> ReverbParameters {
        *self.published.get()
    }

    fn update(
        &self,
        name: &'static str,
        value: f32,
        apply: impl FnOnce(&mut ReverbParameters, f32),
    ) -> Result<(), ParameterError> {
        if let Err(err) = ParameterError::check(name, value as f64, 0.0, 1.0) {
            warn!("rejected reverb {}: {}", name, err);
            return Err(err);
        }
        let mut current = self.parameters.lock();
        apply(&mut current, value);
        self.published.set(Shared::new(&gc_handle(), *current));
        Ok(())
    }
}
