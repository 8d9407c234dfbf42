//! Offline bounce
//!
//! Runs the engine faster than real time: one tick per device block, waiting
//! for the task pool before the block is read, so the result only depends on
//! the config and the simulated game.

use std::path::Path;

use anyhow::{Context, Result};

use chordcast_core::config::EngineConfig;
use chordcast_core::engine::SynthEngine;
use chordcast_core::synth::DeviceParams;
use chordcast_core::{Sample, StereoSample};

use crate::simulate::GameSimulator;

/// How long the simulated game holds each stack layout
pub const SECONDS_PER_LAYOUT: f64 = 2.0;

/// Render `seconds` of interleaved stereo
pub fn bounce(config: &EngineConfig, device: DeviceParams, seconds: f64) -> Result<Vec<Sample>> {
    let (mut engine, mut reader) =
        SynthEngine::new(config.clone(), device).context("Failed to build engine")?;

    let block = device.block_size as usize;
    let frames = (seconds * device.sample_rate as f64).round().max(0.0) as usize;
    let ticks_per_second = device.sample_rate as f64 / block as f64;
    let mut game = GameSimulator::new(
        ticks_per_second,
        SECONDS_PER_LAYOUT,
        config.base_frequency,
        config.tilt_sensitivity,
    );

    let mut samples = vec![0.0; frames * 2];
    for chunk in samples.chunks_mut(block * 2) {
        engine.tick(&game.step())?;
        engine.wait_idle();
        reader.render(chunk, 2);
    }

    log::info!(
        "Bounced {} frames over {} published cycles",
        frames,
        engine.published_cycles()
    );
    engine.shutdown();
    Ok(samples)
}

/// Per-channel absolute peak
pub fn peak(samples: &[Sample]) -> StereoSample {
    let frames: &[StereoSample] = bytemuck::cast_slice(samples);
    frames.iter().fold(StereoSample::default(), |acc, f| StereoSample {
        left: acc.left.max(f.left.abs()),
        right: acc.right.max(f.right.abs()),
    })
}

/// Write interleaved stereo as a 32-bit float WAV
pub fn write_wav(path: &Path, samples: &[Sample], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}
