//! cpal output stream
//!
//! ```text
//! ┌──────────────────┐  tick()   ┌──────────────────┐  publish   ┌──────────────────┐
//! │  Control loop    │──────────►│  Task pool       │───────────►│ StereoOutputPair │
//! │  (~60Hz)         │           │  (rayon)         │            │ (two instances)  │
//! └──────────────────┘           └──────────────────┘            └────────┬─────────┘
//!                                                                         │ render()
//!                                                                ┌────────▼─────────┐
//!                                                                │ cpal audio thread│
//!                                                                └──────────────────┘
//! ```
//!
//! The callback only calls [`RenderSource::render`]; it never locks.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig, SupportedStreamConfig};

use super::config::AudioConfig;
use super::device::{default_device, find_device};
use super::error::{AudioError, AudioResult};
use crate::engine::OutputReader;
use crate::synth::{DeviceParams, ReferenceReader};
use crate::types::Sample;

/// Anything that can fill an interleaved f32 device block from the audio thread
pub trait RenderSource: Send + 'static {
    fn render(&mut self, data: &mut [Sample], channels: usize);
}

impl RenderSource for OutputReader {
    fn render(&mut self, data: &mut [Sample], channels: usize) {
        OutputReader::render(self, data, channels);
    }
}

impl RenderSource for ReferenceReader {
    fn render(&mut self, data: &mut [Sample], channels: usize) {
        ReferenceReader::render(self, data, channels);
    }
}

/// A device with a negotiated stream configuration, not yet playing
pub struct OutputDevice {
    device: cpal::Device,
    name: String,
    stream_config: StreamConfig,
    buffer_size: u32,
}

impl OutputDevice {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.stream_config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.stream_config.channels
    }

    /// The facts the engine sizes its buffers from
    pub fn device_params(&self) -> DeviceParams {
        DeviceParams::new(self.sample_rate(), self.buffer_size)
    }

    /// Build and start the stream; audio stops when the handle is dropped
    pub fn start<R: RenderSource>(self, mut source: R) -> AudioResult<AudioHandle> {
        let channels = self.stream_config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.stream_config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    source.render(data, channels);
                },
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamStart(e.to_string()))?;

        log::info!("Audio stream started on {}", self.name);

        Ok(AudioHandle {
            _stream: stream,
            sample_rate: self.sample_rate(),
            buffer_size: self.buffer_size,
        })
    }
}

/// Keeps the stream alive
pub struct AudioHandle {
    _stream: Stream,
    sample_rate: u32,
    buffer_size: u32,
}

impl AudioHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// One-way output latency of a single callback block
    pub fn latency_ms(&self) -> f32 {
        self.buffer_size as f32 / self.sample_rate as f32 * 1000.0
    }
}

/// Open the configured (or default) device and negotiate a stream config
pub fn open_output(config: &AudioConfig) -> AudioResult<OutputDevice> {
    let device = match &config.device {
        Some(id) => find_device(id)?,
        None => default_device()?,
    };
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let supported = negotiate(&device, config)?;
    let buffer_size = config.buffer_size.frames();
    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };

    log::info!(
        "Output {}: {} channels, {}Hz, {} frames (~{:.1}ms)",
        name,
        stream_config.channels,
        stream_config.sample_rate.0,
        buffer_size,
        config.buffer_size.latency_ms(stream_config.sample_rate.0)
    );

    Ok(OutputDevice {
        device,
        name,
        stream_config,
        buffer_size,
    })
}

/// Prefer f32, at least stereo and the requested rate, in that order
fn negotiate(device: &cpal::Device, config: &AudioConfig) -> AudioResult<SupportedStreamConfig> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::Negotiation(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    let target = config.target_sample_rate();
    let in_range = |c: &cpal::SupportedStreamConfigRange| {
        target >= c.min_sample_rate().0 && target <= c.max_sample_rate().0
    };

    let best = supported
        .iter()
        .find(|c| c.channels() >= 2 && in_range(c))
        .or_else(|| supported.iter().find(|c| c.channels() >= 2))
        .or_else(|| supported.first())
        .ok_or_else(|| AudioError::Negotiation("No f32 output configuration".to_string()))?;

    let rate = if in_range(best) {
        cpal::SampleRate(target)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "Output device doesn't support {}Hz, falling back to {}Hz",
            target,
            fallback.0
        );
        fallback
    };

    Ok(best.clone().with_sample_rate(rate))
}
