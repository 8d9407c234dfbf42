//! Chord policies: base frequency in, voice frequencies out
//!
//! A policy is picked once per engine for each mode (major and minor). The
//! names are mode labels for the game, not a statement about harmony; the
//! "major" slot of a preset may well hold a non-triadic voicing.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Pure mapping from a base frequency to a set of voice frequencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChordPolicy {
    /// Three muted voices
    Silence,
    /// f, 2f, 4f
    #[serde(rename = "same-note-over-3-octaves", alias = "same-note-over3-octaves")]
    SameNoteOver3Octaves,
    /// f, 2f, 3f, 4f, 6f
    ExtendedConsonantHarmonics,
    /// 1 : 5/4 : 3/2
    MajorTriadJustIntonation,
    /// 1 : 5 : 6
    MajorTriadWideJustIntonation,
    /// 1 : 6/5 : 3/2
    MinorTriadJustIntonation,
    /// 1 : 9/8 : 3/2
    Sus2TriadJustIntonation,
    /// 1 : 4/3 : 3/2
    Sus4TriadJustIntonation,
    /// 1 : 6/5 : 45/32
    DiminishedTriadJustIntonation,
    /// 1 : 5/4 : 25/16
    AugmentedTriadJustIntonation,
    /// 1 : 4/3 : 16/9
    QuartalTriadJustIntonation,
    /// Arbitrary ratios against the base frequency
    Ratios(Vec<f64>),
}

impl ChordPolicy {
    /// Frequency ratios relative to the base frequency
    pub fn ratios(&self) -> &[f64] {
        match self {
            ChordPolicy::Silence => &[0.0, 0.0, 0.0],
            ChordPolicy::SameNoteOver3Octaves => &[1.0, 2.0, 4.0],
            ChordPolicy::ExtendedConsonantHarmonics => &[1.0, 2.0, 3.0, 4.0, 6.0],
            ChordPolicy::MajorTriadJustIntonation => &[1.0, 5.0 / 4.0, 3.0 / 2.0],
            ChordPolicy::MajorTriadWideJustIntonation => &[1.0, 5.0, 6.0],
            ChordPolicy::MinorTriadJustIntonation => &[1.0, 6.0 / 5.0, 3.0 / 2.0],
            ChordPolicy::Sus2TriadJustIntonation => &[1.0, 9.0 / 8.0, 3.0 / 2.0],
            ChordPolicy::Sus4TriadJustIntonation => &[1.0, 4.0 / 3.0, 3.0 / 2.0],
            ChordPolicy::DiminishedTriadJustIntonation => &[1.0, 6.0 / 5.0, 45.0 / 32.0],
            ChordPolicy::AugmentedTriadJustIntonation => &[1.0, 5.0 / 4.0, 25.0 / 16.0],
            ChordPolicy::QuartalTriadJustIntonation => &[1.0, 4.0 / 3.0, 16.0 / 9.0],
            ChordPolicy::Ratios(ratios) => ratios,
        }
    }

    /// Voice frequencies for `base_frequency`
    pub fn generate(&self, base_frequency: f64) -> Vec<f64> {
        self.ratios().iter().map(|r| r * base_frequency).collect()
    }

    /// Voice frequencies, checked to cover `voices` voices
    pub fn generate_for(&self, base_frequency: f64, voices: usize) -> EngineResult<Vec<f64>> {
        let notes = self.generate(base_frequency);
        if notes.len() < voices {
            return Err(EngineError::ChordTooShort {
                required: voices,
                actual: notes.len(),
            });
        }
        Ok(notes)
    }
}

/// The pair of policies an engine is built with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSet {
    pub major: ChordPolicy,
    pub minor: ChordPolicy,
}

impl ChordSet {
    pub fn new(major: ChordPolicy, minor: ChordPolicy) -> Self {
        Self { major, minor }
    }

    /// The policy for the requested mode
    pub fn select(&self, use_major: bool) -> &ChordPolicy {
        if use_major {
            &self.major
        } else {
            &self.minor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NUM_VOICES;

    const C4: f64 = 261.626;

    #[test]
    fn test_same_note_over_three_octaves() {
        let notes = ChordPolicy::SameNoteOver3Octaves.generate(C4);
        assert_eq!(notes, vec![C4, 2.0 * C4, 4.0 * C4]);
    }

    #[test]
    fn test_silence_is_all_zero() {
        let notes = ChordPolicy::Silence.generate(C4);
        assert_eq!(notes.len(), NUM_VOICES);
        assert!(notes.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn test_extended_harmonics_has_selector_headroom() {
        let notes = ChordPolicy::ExtendedConsonantHarmonics.generate(100.0);
        assert_eq!(notes, vec![100.0, 200.0, 300.0, 400.0, 600.0]);
    }

    #[test]
    fn test_triads_start_on_base() {
        for policy in [
            ChordPolicy::MajorTriadJustIntonation,
            ChordPolicy::MinorTriadJustIntonation,
            ChordPolicy::Sus2TriadJustIntonation,
            ChordPolicy::Sus4TriadJustIntonation,
            ChordPolicy::DiminishedTriadJustIntonation,
            ChordPolicy::AugmentedTriadJustIntonation,
            ChordPolicy::QuartalTriadJustIntonation,
        ] {
            let notes = policy.generate(C4);
            assert_eq!(notes.len(), 3);
            assert_eq!(notes[0], C4);
            assert!(notes[1] > notes[0] && notes[2] > notes[1]);
        }
    }

    #[test]
    fn test_short_chord_is_precondition_violation() {
        let policy = ChordPolicy::Ratios(vec![1.0, 2.0]);
        assert_eq!(
            policy.generate_for(C4, NUM_VOICES),
            Err(EngineError::ChordTooShort {
                required: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_chord_set_selects_by_mode() {
        let set = ChordSet::new(ChordPolicy::SameNoteOver3Octaves, ChordPolicy::Silence);
        assert_eq!(set.select(true), &ChordPolicy::SameNoteOver3Octaves);
        assert_eq!(set.select(false), &ChordPolicy::Silence);
    }

    #[test]
    fn test_policy_yaml_names() {
        let yaml = serde_yaml::to_string(&ChordPolicy::SameNoteOver3Octaves).unwrap();
        assert_eq!(yaml.trim(), "same-note-over-3-octaves");
        for name in ["same-note-over-3-octaves", "same-note-over3-octaves"] {
            let parsed: ChordPolicy = serde_yaml::from_str(name).unwrap();
            assert_eq!(parsed, ChordPolicy::SameNoteOver3Octaves);
        }
        let parsed: ChordPolicy = serde_yaml::from_str("!ratios [1.0, 1.5, 2.0]").unwrap();
        assert_eq!(parsed, ChordPolicy::Ratios(vec![1.0, 1.5, 2.0]));
    }
}
