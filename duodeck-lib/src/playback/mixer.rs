//! Two-deck summing mixer; the callback handed to the output device.

use std::sync::Arc;

use crate::audio::{AudioCallback, AudioDecoder};
use crate::constants::CHANNELS;

use super::deck::{DeckEngine, DeckHandle};

pub struct DeckMixer {
    decks: [DeckEngine; 2],
    scratch: Vec<f32>,
    chunk: usize,
}

impl DeckMixer {
    /// Build both decks around a shared decoder.
    pub fn new(decoder: Arc<dyn AudioDecoder>) -> Self {
        Self {
            decks: [DeckEngine::new(decoder.clone()), DeckEngine::new(decoder)],
            scratch: Vec::new(),
            chunk: 0,
        }
    }

    /// Control handles for deck 1 and deck 2.
    pub fn handles(&self) -> [DeckHandle; 2] {
        [self.decks[0].handle(), self.decks[1].handle()]
    }
}

impl AudioCallback for DeckMixer {
    fn prepare_to_play(&mut self, block_size: usize, sample_rate: u32) {
        for deck in &mut self.decks {
            deck.prepare_to_play(block_size, sample_rate);
        }
        self.chunk = block_size.max(1) * CHANNELS;
        self.scratch = vec![0.0; self.chunk];
    }

    fn get_next_audio_block(&mut self, block: &mut [f32]) {
        let [first, second] = &mut self.decks;
        first.get_next_audio_block(block);

        let mut offset = 0;
        while offset < block.len() {
            let len = (block.len() - offset).min(self.chunk);
            if len == 0 {
                break;
            }
            let scratch = &mut self.scratch[..len];
            second.get_next_audio_block(scratch);
            for (out, sample) in block[offset..offset + len].iter_mut().zip(scratch.iter()) {
                *out += *sample;
            }
            offset += len;
        }
    }

    fn release_resources(&mut self) {
        for deck in &mut self.decks {
            deck.release_resources();
        }
        self.scratch = Vec::new();
        self.chunk = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{PcmSource, SymphoniaDecoder};

    #[test]
    fn decks_are_summed() {
        let mut mixer = DeckMixer::new(Arc::new(SymphoniaDecoder::new()));
        mixer.prepare_to_play(32, 1_000);
        let [one, two] = mixer.handles();
        one.load_source(PcmSource::from_fn(1_000, 1_000, |_| (0.25, 0.25)));
        two.load_source(PcmSource::from_fn(1_000, 1_000, |_| (0.5, -0.5)));
        one.play();
        two.play();

        let mut block = vec![0.0_f32; 100 * 2];
        mixer.get_next_audio_block(&mut block);
        // Skip the resampler's priming frame.
        assert_eq!(block[2], 0.75);
        assert_eq!(block[3], -0.25);
        assert_eq!(block[198], 0.75);
    }

    #[test]
    fn an_idle_deck_adds_nothing() {
        let mut mixer = DeckMixer::new(Arc::new(SymphoniaDecoder::new()));
        mixer.prepare_to_play(32, 1_000);
        let [one, _two] = mixer.handles();
        one.load_source(PcmSource::from_fn(1_000, 1_000, |_| (0.25, 0.25)));
        one.play();

        let mut block = vec![0.0_f32; 64];
        mixer.get_next_audio_block(&mut block);
        assert!(block[2..].iter().all(|s| *s == 0.25));
    }
}
