//! Chordcast Core - procedural chord synthesis with binaural noise for game audio

pub mod audio;
pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod spatial;
pub mod synth;
pub mod task;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use types::*;
