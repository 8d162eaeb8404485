//! DSP building blocks used by the deck pipeline.

pub mod effects;
