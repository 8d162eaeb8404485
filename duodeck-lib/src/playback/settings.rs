//! Serializable deck settings and engine configuration.

use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::{BLOCK_SIZE, SAMPLE_RATE, TICK_INTERVAL_MS};
use crate::error::{ParameterError, SettingsError};

use super::deck::DeckHandle;

/// Per-deck control values, as stored in a settings JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckSettings {
    pub gain: f32,
    pub speed: f64,
    pub room_size: f32,
    pub damping: f32,
    pub wet_level: f32,
    pub dry_level: f32,
    pub looping: bool,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            gain: 0.5,
            speed: 1.0,
            room_size: 0.0,
            damping: 0.0,
            wet_level: 0.0,
            dry_level: 1.0,
            looping: false,
        }
    }
}

impl DeckSettings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Capture the current values of a deck.
    pub fn from_deck(deck: &DeckHandle) -> Self {
        let reverb = deck.reverb_parameters();
        Self {
            gain: deck.gain(),
            speed: deck.speed(),
            room_size: reverb.room_size,
            damping: reverb.damping,
            wet_level: reverb.wet_level,
            dry_level: reverb.dry_level,
            looping: deck.is_looping(),
        }
    }

    /// Push every value through the deck's validated setters.
    ///
    /// Each value is applied independently; rejected ones leave the deck's
    /// previous value in place and are returned.
    pub fn apply(&self, deck: &DeckHandle) -> Vec<ParameterError> {
        let results = [
            deck.set_gain(self.gain),
            deck.set_speed(self.speed),
            deck.set_room_size(self.room_size),
            deck.set_damping(self.damping),
            deck.set_wet_level(self.wet_level),
            deck.set_dry_level(self.dry_level),
        ];
        deck.set_looping(self.looping);

        let rejected: Vec<ParameterError> = results.into_iter().filter_map(Result::err).collect();
        if !rejected.is_empty() {
            warn!("{} deck setting(s) rejected", rejected.len());
        }
        rejected
    }
}

/// Device-facing configuration shared by both decks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub block_size: usize,
    pub sample_rate: u32,
    pub tick_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_size: BLOCK_SIZE,
            sample_rate: SAMPLE_RATE,
            tick_interval_ms: TICK_INTERVAL_MS,
        }
    }
}
