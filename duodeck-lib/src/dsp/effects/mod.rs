//! Effects applied in place to interleaved stereo blocks.

pub mod gain;
pub mod reverb;

pub use gain::LinearRamp;
pub use reverb::{Reverb, ReverbParameters};
