//! Engine configuration
//!
//! Everything an engine is built from, apart from the device facts which
//! only exist once an output stream is negotiated (see
//! [`DeviceParams`](crate::synth::DeviceParams)).
//!
//! ```ignore
//! use chordcast_core::config::{default_config_path, load_config, EngineConfig};
//!
//! let config: EngineConfig = load_config(&default_config_path());
//! config.validate()?;
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config};
pub use paths::{config_dir, default_config_path, CONFIG_FILE_NAME};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::spatial::ListenerGeometry;
use crate::synth::noise::{DEFAULT_NOISE_AMPLITUDE, DEFAULT_NOISE_SEED};
use crate::synth::{ChordPolicy, ChordSet, ToneMode};
use crate::types::{Vec2, SPEED_OF_SOUND};

/// Middle C, the default base frequency
pub const DEFAULT_BASE_FREQUENCY: f64 = 261.626;

/// Noise layer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Master seed for the per-index generators
    pub seed: u64,
    /// Peak amplitude of the noise layer
    pub max_amplitude: f32,
    /// Regenerate the noise buffer on every major refresh
    /// Unset: decided by the tone mode.
    pub refresh_on_major: Option<bool>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_NOISE_SEED,
            max_amplitude: DEFAULT_NOISE_AMPLITUDE,
            refresh_on_major: None,
        }
    }
}

/// Construction-time engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Subunits are this many times the 100ms minimum
    pub subunit_ratio: u32,
    pub tone_mode: ToneMode,
    pub major_chord: ChordPolicy,
    pub minor_chord: ChordPolicy,
    /// Blend of the center-bleed factor into the noise gain (0 = off)
    pub center_attenuation: f32,
    /// Right ear offset from the head center, metres
    pub ear_offset: Vec2,
    pub speed_of_sound: f32,
    /// Scale applied to the tilt moment before `tanh`
    pub tilt_sensitivity: f32,
    /// Base frequency used by hosts without their own pitch source
    pub base_frequency: f64,
    pub worker_threads: usize,
    pub noise: NoiseConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            subunit_ratio: 1,
            tone_mode: ToneMode::DisjointTermination,
            major_chord: ChordPolicy::SameNoteOver3Octaves,
            minor_chord: ChordPolicy::Silence,
            center_attenuation: 1.0,
            ear_offset: Vec2::new(0.5, 0.0),
            speed_of_sound: SPEED_OF_SOUND,
            tilt_sensitivity: 0.01,
            base_frequency: DEFAULT_BASE_FREQUENCY,
            worker_threads: 4,
            noise: NoiseConfig::default(),
        }
    }
}

impl EngineConfig {
    /// The built-in game modes
    ///
    /// - `0`: sequential slices over the extended harmonic series
    /// - `1`: disjoint termination over three octaves
    /// - anything else: disjoint termination, fully silent tones
    pub fn preset(mode: u32) -> Self {
        let (tone_mode, major_chord) = match mode {
            0 => (ToneMode::SequentialSlice, ChordPolicy::ExtendedConsonantHarmonics),
            1 => (ToneMode::DisjointTermination, ChordPolicy::SameNoteOver3Octaves),
            _ => (ToneMode::DisjointTermination, ChordPolicy::Silence),
        };
        Self {
            tone_mode,
            major_chord,
            minor_chord: ChordPolicy::Silence,
            ..Default::default()
        }
    }

    pub fn chords(&self) -> ChordSet {
        ChordSet::new(self.major_chord.clone(), self.minor_chord.clone())
    }

    /// Whether a major refresh also regenerates the noise buffer
    pub fn refreshes_noise_on_major(&self) -> bool {
        self.noise
            .refresh_on_major
            .unwrap_or_else(|| self.tone_mode.refreshes_noise_by_default())
    }

    /// Listener geometry at the given output rate
    pub fn geometry(&self, sample_rate: u32) -> ListenerGeometry {
        ListenerGeometry {
            right_ear: self.ear_offset,
            speed_of_sound: self.speed_of_sound,
            sample_rate,
            center_attenuation: self.center_attenuation,
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> EngineResult<()> {
        fn invalid(message: String) -> EngineResult<()> {
            Err(EngineError::InvalidConfig(message))
        }

        if self.subunit_ratio == 0 {
            return invalid("subunit_ratio must be at least 1".to_string());
        }
        if self.worker_threads == 0 {
            return invalid("worker_threads must be at least 1".to_string());
        }
        if !(self.speed_of_sound.is_finite() && self.speed_of_sound > 0.0) {
            return invalid(format!("speed_of_sound must be positive, got {}", self.speed_of_sound));
        }
        if !self.center_attenuation.is_finite() {
            return invalid("center_attenuation must be finite".to_string());
        }
        if !(self.ear_offset.x.is_finite() && self.ear_offset.y.is_finite())
            || self.ear_offset.length() == 0.0
        {
            return invalid(format!("ear_offset must be a non-zero vector, got {:?}", self.ear_offset));
        }
        if !self.tilt_sensitivity.is_finite() {
            return invalid("tilt_sensitivity must be finite".to_string());
        }
        if !(self.base_frequency.is_finite() && self.base_frequency > 0.0) {
            return invalid(format!("base_frequency must be positive, got {}", self.base_frequency));
        }
        if !(self.noise.max_amplitude.is_finite() && self.noise.max_amplitude >= 0.0) {
            return invalid(format!(
                "noise.max_amplitude must be non-negative, got {}",
                self.noise.max_amplitude
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.subunit_ratio, 1);
        assert_eq!(config.ear_offset, Vec2::new(0.5, 0.0));
        assert_eq!(config.noise.seed, 1);
    }

    #[test]
    fn test_presets() {
        let sequential = EngineConfig::preset(0);
        assert_eq!(sequential.tone_mode, ToneMode::SequentialSlice);
        assert_eq!(sequential.major_chord, ChordPolicy::ExtendedConsonantHarmonics);
        assert_eq!(sequential.minor_chord, ChordPolicy::Silence);

        let octaves = EngineConfig::preset(1);
        assert_eq!(octaves.tone_mode, ToneMode::DisjointTermination);
        assert_eq!(octaves.major_chord, ChordPolicy::SameNoteOver3Octaves);

        let silent = EngineConfig::preset(7);
        assert_eq!(silent.major_chord, ChordPolicy::Silence);
        assert_eq!(silent.minor_chord, ChordPolicy::Silence);
    }

    #[test]
    fn test_noise_refresh_defaults_per_mode() {
        assert!(EngineConfig::preset(0).refreshes_noise_on_major());
        assert!(!EngineConfig::preset(1).refreshes_noise_on_major());

        let mut forced = EngineConfig::preset(1);
        forced.noise.refresh_on_major = Some(true);
        assert!(forced.refreshes_noise_on_major());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<Box<dyn Fn(&mut EngineConfig)>> = vec![
            Box::new(|c| c.subunit_ratio = 0),
            Box::new(|c| c.worker_threads = 0),
            Box::new(|c| c.speed_of_sound = 0.0),
            Box::new(|c| c.center_attenuation = f32::NAN),
            Box::new(|c| c.ear_offset = Vec2::ZERO),
            Box::new(|c| c.base_frequency = -1.0),
            Box::new(|c| c.noise.max_amplitude = -0.5),
        ];
        for mutate in cases {
            let mut config = EngineConfig::default();
            mutate(&mut config);
            assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "tone_mode: sequential-slice\nnoise:\n  seed: 99\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tone_mode, ToneMode::SequentialSlice);
        assert_eq!(config.noise.seed, 99);
        assert_eq!(config.noise.max_amplitude, DEFAULT_NOISE_AMPLITUDE);
        assert_eq!(config.worker_threads, 4);
    }
}
