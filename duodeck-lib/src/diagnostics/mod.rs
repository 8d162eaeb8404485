//! Control-domain polling of deck state.

pub mod reporter;

pub use reporter::{DeckPoller, DeckReport};
