//! Engine error types
//!
//! Every variant here is a configuration or programming error. None of them
//! is recoverable at runtime; hosts should surface them as a startup failure.

use thiserror::Error;

/// Errors raised while building or driving the synthesis engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The output device reported a zero sample rate or callback block size
    #[error("Invalid device parameters: sample_rate={sample_rate}Hz, block_size={block_size}")]
    InvalidDevice { sample_rate: u32, block_size: u32 },

    /// A configuration value is outside its valid domain
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// A chord policy produced fewer tones than there are voices
    #[error("Chord policy returned {actual} tones, {required} voices need one each")]
    ChordTooShort { required: usize, actual: usize },

    /// A gap selector or buffer offset falls outside its container
    #[error("{what} out of range: index {index}, length {len}")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// The worker pool could not be created
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
