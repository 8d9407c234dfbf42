//! Chordcast Player - headless host for the chordcast engine
//!
//! Stands in for the game: a scripted simulator produces stack layouts and a
//! tilt, the control loop ticks the engine with them, and the engine's output
//! goes either to an audio device or to a WAV file.
//!
//! ## Commands
//!
//! - `play`: live output through cpal
//! - `render`: offline bounce to WAV
//! - `reference`: plain sine through the same output path
//! - `devices`: list output devices
//! - `init-config`: write a preset to the config file

mod bounce;
mod cli;
mod simulate;

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;

use chordcast_core::audio::{list_output_devices, open_output, AudioConfig, DeviceId};
use chordcast_core::config::{default_config_path, load_config, save_config, EngineConfig};
use chordcast_core::engine::{BinauralRefresh, SynthEngine};
use chordcast_core::synth::{reference_channel, DeviceParams, ReferenceTone, DEFAULT_LEAD_CHUNKS};

use cli::{Cli, Commands, OutputArgs};
use simulate::GameSimulator;

/// Control loop rate of the live player
const CONTROL_RATE_HZ: f64 = 60.0;

/// How often the reference feeder tops up its ring
const FEED_INTERVAL: Duration = Duration::from_millis(5);

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set RUST_LOG=debug for per-refresh output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Play { ref output, seconds } => {
            let config = cli.overrides.apply(load_config(&config_path));
            play(&config, output, seconds)
        }
        Commands::Render {
            ref output,
            seconds,
            sample_rate,
            block_size,
        } => {
            let config = cli.overrides.apply(load_config(&config_path));
            render(&config, output, seconds, DeviceParams::new(sample_rate, block_size))
        }
        Commands::Reference {
            ref output,
            frequency,
            seconds,
        } => reference(output, frequency, seconds),
        Commands::Devices => devices(),
        Commands::InitConfig { mode, force } => {
            let config = cli.overrides.apply(EngineConfig::preset(mode));
            init_config(&config, &config_path, force)
        }
    }
}

fn audio_config(args: &OutputArgs) -> AudioConfig {
    let mut config = AudioConfig::default();
    if let Some(name) = &args.device {
        config = config.with_device(match &args.host {
            Some(host) => DeviceId::with_host(name, host),
            None => DeviceId::new(name.as_str()),
        });
    }
    if let Some(frames) = args.buffer_frames {
        config = config.with_buffer_frames(frames);
    }
    if let Some(rate) = args.sample_rate {
        config = config.with_sample_rate(rate);
    }
    config
}

fn play(config: &EngineConfig, args: &OutputArgs, seconds: f64) -> Result<()> {
    let output = open_output(&audio_config(args)).context("Failed to open audio output")?;
    let channels = output.channels();
    let (mut engine, reader) =
        SynthEngine::new(config.clone(), output.device_params()).context("Failed to build engine")?;
    let audio = output.start(reader)?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                      Chordcast Player                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!(
        "{:?} on {} channels at {}Hz, {} frame blocks ({:.1}ms), {:.1}s loop",
        config.tone_mode,
        channels,
        audio.sample_rate(),
        audio.buffer_size(),
        audio.latency_ms(),
        engine.buffer_len() as f64 / engine.device().sample_rate as f64
    );

    let mut game = GameSimulator::new(
        CONTROL_RATE_HZ,
        bounce::SECONDS_PER_LAYOUT,
        config.base_frequency,
        config.tilt_sensitivity,
    );
    let period = Duration::from_secs_f64(1.0 / CONTROL_RATE_HZ);
    let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    let mut next = Instant::now();
    let mut deferred = 0u64;

    while Instant::now() < deadline {
        let report = engine.tick(&game.step())?;
        if report.binaural == BinauralRefresh::Deferred {
            deferred += 1;
        }

        next += period;
        if let Some(wait) = next.checked_duration_since(Instant::now()) {
            thread::sleep(wait);
        }
    }

    drop(audio);
    log::info!(
        "Played {} published cycles, {} binaural refreshes deferred by the reader",
        engine.published_cycles(),
        deferred
    );
    engine.shutdown();
    Ok(())
}

fn render(config: &EngineConfig, path: &Path, seconds: f64, device: DeviceParams) -> Result<()> {
    let samples = bounce::bounce(config, device, seconds)?;
    bounce::write_wav(path, &samples, device.sample_rate)?;

    let peak = bounce::peak(&samples);
    println!(
        "Wrote {} ({:.1}s, peak L {:.3} R {:.3})",
        path.display(),
        seconds,
        peak.left,
        peak.right
    );
    Ok(())
}

fn reference(args: &OutputArgs, frequency: f64, seconds: f64) -> Result<()> {
    let output = open_output(&audio_config(args)).context("Failed to open audio output")?;
    let tone = ReferenceTone::new(frequency, output.sample_rate());
    let (mut feeder, reader) = reference_channel(tone, DEFAULT_LEAD_CHUNKS);
    feeder.pump();

    let audio = output.start(reader)?;
    println!(
        "Reference {:.1}Hz for {:.1}s ({:.1}ms blocks)",
        frequency,
        seconds,
        audio.latency_ms()
    );

    let deadline = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    while Instant::now() < deadline {
        feeder.pump();
        thread::sleep(FEED_INTERVAL);
    }
    Ok(())
}

fn devices() -> Result<()> {
    let devices = list_output_devices()?;
    if devices.is_empty() {
        println!("No output devices found");
    }
    for device in devices {
        println!(
            "{}  [{} ch, {:?} Hz]",
            device, device.max_channels, device.sample_rates
        );
    }
    Ok(())
}

fn init_config(config: &EngineConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config.validate()?;
    save_config(config, path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
