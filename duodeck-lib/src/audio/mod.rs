//! Audio plumbing: the block-callback capability, decoded sources, their
//! peak envelopes and the decoder boundary.

mod convert;
pub mod decode;
pub mod peaks;
pub mod source;

pub use decode::{AudioDecoder, SymphoniaDecoder};
pub use peaks::{extract_peaks, PeakWindow};
pub use source::PcmSource;

use crate::constants::CHANNELS;

/// Capability set a device callback drives.
///
/// Blocks are interleaved stereo `f32`. `prepare_to_play` is called before the
/// first block and `release_resources` after the last; implementations may
/// allocate in `prepare_to_play` but never in `get_next_audio_block`.
pub trait AudioCallback: Send {
    /// Prepare for blocks of at most `block_size` frames at `sample_rate`.
    fn prepare_to_play(&mut self, block_size: usize, sample_rate: u32);

    /// Fill `block` completely. Must not block, allocate or panic.
    fn get_next_audio_block(&mut self, block: &mut [f32]);

    /// Drop any state built by `prepare_to_play`.
    fn release_resources(&mut self);
}

/// Number of whole frames in an interleaved stereo block.
pub fn frames_in(block: &[f32]) -> usize {
    block.len() / CHANNELS
}

/// Fill a block with silence.
pub fn clear(block: &mut [f32]) {
    block.fill(0.0);
}
