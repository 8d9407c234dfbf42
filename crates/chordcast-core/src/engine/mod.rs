//! Synthesis engine - refresh orchestration and the double-buffered output
//!
//! - `SynthEngine`: control-loop side, builds one task DAG per refresh
//! - `StereoOutputPair` / `OutputReader`: the lock-free hand-off to the
//!   real-time render callback

mod engine;
mod output;

pub use engine::*;
pub use output::*;
