//! Output device configuration

use serde::{Deserialize, Serialize};

/// Largest callback block accepted for a fixed buffer size
pub const MAX_BUFFER_SIZE: u32 = 8192;

/// Smallest callback block accepted for a fixed buffer size
pub const MIN_BUFFER_SIZE: u32 = 64;

/// Callback block requested when no preference is given (frames)
pub const DEFAULT_BUFFER_SIZE: u32 = 512;

/// Sample rate requested when no preference is given
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Preferred callback block size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// [`DEFAULT_BUFFER_SIZE`]
    #[default]
    Default,
    /// A specific size in frames, clamped to the supported bounds
    Fixed(u32),
}

impl BufferSize {
    /// The block size that will be requested from the device
    pub fn frames(&self) -> u32 {
        match self {
            BufferSize::Default => DEFAULT_BUFFER_SIZE,
            BufferSize::Fixed(frames) => (*frames).clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE),
        }
    }

    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        self.frames() as f32 / sample_rate as f32 * 1000.0
    }
}

/// Output device identifier: name plus optional host ("ALSA", "JACK", ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceId {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

impl DeviceId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: None,
        }
    }

    pub fn with_host(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: Some(host.to_string()),
        }
    }

    /// `[host] name`, or just the name
    pub fn display_label(&self) -> String {
        match &self.host {
            Some(host) => format!("[{}] {}", host, self.name),
            None => self.name.clone(),
        }
    }
}

/// Output stream preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// None = default device of the default host
    pub device: Option<DeviceId>,
    pub buffer_size: BufferSize,
    /// None = [`DEFAULT_SAMPLE_RATE`]
    pub sample_rate: Option<u32>,
}

impl AudioConfig {
    pub fn with_device(mut self, device: DeviceId) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_frames() {
        assert_eq!(BufferSize::Default.frames(), 512);
        assert_eq!(BufferSize::Fixed(256).frames(), 256);
        assert_eq!(BufferSize::Fixed(1).frames(), MIN_BUFFER_SIZE);
        assert_eq!(BufferSize::Fixed(1 << 20).frames(), MAX_BUFFER_SIZE);
        assert!((BufferSize::Fixed(480).latency_ms(48000) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_device_label() {
        assert_eq!(DeviceId::new("hw:0,0").display_label(), "hw:0,0");
        assert_eq!(DeviceId::with_host("hw:0,0", "ALSA").display_label(), "[ALSA] hw:0,0");
    }

    #[test]
    fn test_builder() {
        let config = AudioConfig::default()
            .with_device(DeviceId::new("speakers"))
            .with_buffer_frames(128)
            .with_sample_rate(44100);
        assert_eq!(config.device, Some(DeviceId::new("speakers")));
        assert_eq!(config.buffer_size, BufferSize::Fixed(128));
        assert_eq!(config.target_sample_rate(), 44100);
        assert_eq!(AudioConfig::default().target_sample_rate(), DEFAULT_SAMPLE_RATE);
    }
}
