//! Audio output through cpal
//!
//! The engine never talks to the device directly. A host opens an output,
//! reads the negotiated [`DeviceParams`](crate::synth::DeviceParams) from it,
//! builds the engine with them and then starts the stream with the engine's
//! [`OutputReader`](crate::engine::OutputReader).
//!
//! ```ignore
//! use chordcast_core::audio::{open_output, AudioConfig};
//!
//! let output = open_output(&AudioConfig::default())?;
//! let (engine, reader) = SynthEngine::new(config, output.device_params())?;
//! let _audio = output.start(reader)?;
//! ```

mod config;
mod cpal_backend;
mod device;
mod error;

pub use config::{
    AudioConfig, BufferSize, DeviceId, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLE_RATE, MAX_BUFFER_SIZE,
    MIN_BUFFER_SIZE,
};
pub use cpal_backend::{open_output, AudioHandle, OutputDevice, RenderSource};
pub use device::{list_output_devices, AudioDevice};
pub use error::{AudioError, AudioResult};
