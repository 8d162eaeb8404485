//! Playback pipeline: transport, varispeed, reverb, deck composition,
//! looping, mixing and device adapters.

mod atomic;
pub mod deck;
mod gc;
pub mod looping;
pub mod mixer;
pub mod output;
pub mod resampler;
pub mod reverb;
pub mod settings;
pub mod transport;

pub use deck::{DeckEngine, DeckHandle};
pub use looping::{LoopMode, LoopTick, LoopingController};
pub use mixer::DeckMixer;
pub use output::OfflineDevice;
#[cfg(feature = "device")]
pub use output::OutputDevice;
pub use settings::{DeckSettings, EngineConfig};
pub use transport::PlaybackState;
