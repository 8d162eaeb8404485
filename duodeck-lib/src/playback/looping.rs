//! End-of-track looping driven by a control-domain tick.
//!
//! The controller does not run on the audio thread. It checks the deck at
//! whatever cadence the caller ticks it (about 2 Hz in the default UI), so a
//! loop restart can land up to one tick interval of audio past the tail
//! threshold, and at high speeds the track may reach its end between ticks.

use log::debug;

use super::deck::DeckHandle;

/// Whether looping is armed. Mirrors the deck's loop flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    On,
}

impl From<bool> for LoopMode {
    fn from(value: bool) -> Self {
        if value {
            LoopMode::On
        } else {
            LoopMode::Off
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopTick {
    /// Looping is off or the deck is not playing.
    Idle,
    /// The deck has no usable position (nothing loaded or at the very start).
    NoPosition,
    /// Armed, but the position is still before the tail.
    NotInTail,
    /// A restart seek was issued.
    Restarted,
}

/// Restart point used by the tick. Always the start of the track.
const RESTART_FRACTION: f64 = 0.0;

#[derive(Debug, Default)]
pub struct LoopingController {
    restarts: u64,
}

impl LoopingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode, read from the deck's loop flag.
    pub fn mode(&self, deck: &DeckHandle) -> LoopMode {
        deck.is_looping().into()
    }

    /// Run one check against `deck`.
    pub fn tick(&mut self, deck: &DeckHandle) -> LoopTick {
        if self.mode(deck) == LoopMode::Off || !deck.is_playing() {
            return LoopTick::Idle;
        }
        let relative = deck.position_relative();
        if !relative.is_finite() || relative <= 0.0 {
            return LoopTick::NoPosition;
        }
        if deck.loop_to(RESTART_FRACTION) {
            self.restarts += 1;
            debug!("loop restart #{}", self.restarts);
            LoopTick::Restarted
        } else {
            LoopTick::NotInTail
        }
    }

    /// Number of restarts issued so far.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }
}
