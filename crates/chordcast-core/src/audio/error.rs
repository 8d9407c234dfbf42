//! Output backend errors

use thiserror::Error;

/// Failures while finding, negotiating or starting an output stream
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No output devices on any audio host")]
    NoOutputDevices,

    /// Carries the host name
    #[error("Host {0} has no default output device")]
    NoDefaultOutput(String),

    #[error("Output device not found: {0}")]
    UnknownDevice(String),

    /// Enumeration or stream-config query failed, or no f32 config exists
    #[error("Could not negotiate an output stream: {0}")]
    Negotiation(String),

    #[error("Could not build output stream: {0}")]
    StreamBuild(String),

    #[error("Could not start output stream: {0}")]
    StreamStart(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
