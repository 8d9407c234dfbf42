//! Command-line arguments
//!
//! Engine settings come from the YAML config; the flags here override
//! individual fields for a single run.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use chordcast_core::config::EngineConfig;

/// Chordcast - procedural chord synthesis with binaural noise
#[derive(Parser)]
#[command(name = "chordcast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Engine config file (default: ~/.config/chordcast/engine.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: EngineOverrides,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play the engine live, driven by a simulated game
    Play {
        #[command(flatten)]
        output: OutputArgs,

        /// How long to play, in seconds
        #[arg(long, default_value_t = 30.0)]
        seconds: f64,
    },

    /// Bounce the simulated game to a stereo WAV file
    Render {
        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Length of the bounce, in seconds
        #[arg(long, default_value_t = 10.0)]
        seconds: f64,

        #[arg(long, default_value_t = 48000)]
        sample_rate: u32,

        /// Block size the bounce pretends the device uses
        #[arg(long, default_value_t = 512)]
        block_size: u32,
    },

    /// Play a plain sine for level and latency calibration
    Reference {
        #[command(flatten)]
        output: OutputArgs,

        /// Tone frequency in Hz
        #[arg(long, default_value_t = 440.0)]
        frequency: f64,

        #[arg(long, default_value_t = 10.0)]
        seconds: f64,
    },

    /// List output devices on every audio host
    Devices,

    /// Write a preset to the config file
    InitConfig {
        /// 0 = sequential slices, 1 = three octaves, other = silent tones
        #[arg(long, default_value_t = 1)]
        mode: u32,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Output device selection
#[derive(Args)]
pub struct OutputArgs {
    /// Device name as listed by `chordcast devices`
    #[arg(long)]
    pub device: Option<String>,

    /// Audio host of the device (e.g. ALSA, JACK)
    #[arg(long, requires = "device")]
    pub host: Option<String>,

    /// Callback block size in frames
    #[arg(long)]
    pub buffer_frames: Option<u32>,

    #[arg(long)]
    pub sample_rate: Option<u32>,
}

/// Per-run overrides of the engine config
#[derive(Args, Default)]
pub struct EngineOverrides {
    /// Start from a built-in preset instead of the config's tone settings
    #[arg(long, global = true)]
    pub preset: Option<u32>,

    /// Noise seed
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Worker threads in the task pool
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Subunit length as a multiple of the 100ms minimum
    #[arg(long, global = true)]
    pub subunit_ratio: Option<u32>,

    /// Center-bleed attenuation coefficient
    #[arg(long, global = true)]
    pub center_attenuation: Option<f32>,
}

impl EngineOverrides {
    pub fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(preset) = self.preset {
            let preset = EngineConfig::preset(preset);
            config.tone_mode = preset.tone_mode;
            config.major_chord = preset.major_chord;
            config.minor_chord = preset.minor_chord;
        }
        if let Some(seed) = self.seed {
            config.noise.seed = seed;
        }
        if let Some(workers) = self.workers {
            config.worker_threads = workers;
        }
        if let Some(ratio) = self.subunit_ratio {
            config.subunit_ratio = ratio;
        }
        if let Some(coefficient) = self.center_attenuation {
            config.center_attenuation = coefficient;
        }
        config
    }
}
