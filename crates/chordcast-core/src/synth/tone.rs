//! Tone synthesis: chord voices rendered into the long-lived tone buffer
//!
//! Two strategies share one buffer contract (zero, then write voices):
//!
//! - **Disjoint termination** (5 subunits): every voice starts at sample 0
//!   and rings for `5 - gap` subunits. Voices are rendered into scratch
//!   buffers and summed into the tone buffer by a chain of merge tasks.
//! - **Sequential slice** (7 subunits): voice `v` owns subunit `v`; the gap
//!   selects which chord tone it plays. Regions are disjoint, so the three
//!   voice tasks run unordered.
//!
//! ```text
//! disjoint:   clear ─┬─────────────► merge0 ──► merge1 ──► merge2
//!             gen0 ──┘   gen1 ──────────┘  gen2 ───┘
//!                                 (each merge ──► dispose scratch)
//!
//! sequential: clear ─┬─► voice0 (region 0)
//!                    ├─► voice1 (region 1)
//!                    └─► voice2 (region 2)
//! ```

use std::f64::consts::TAU;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::chord::ChordSet;
use crate::buffer::{partition, Region, SampleBuffer};
use crate::error::{EngineError, EngineResult};
use crate::task::{TaskHandle, TaskPool};
use crate::types::{Sample, NUM_VOICES};

/// Buffer capacity of the disjoint-termination strategy, in subunits
pub const DISJOINT_SUBUNITS: usize = 5;

/// Buffer capacity of the sequential-slice strategy, in subunits
pub const SEQUENTIAL_SUBUNITS: usize = 7;

/// Which tone strategy an engine runs (fixed for its lifetime)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToneMode {
    /// Overlapping voices that stop at different points
    #[default]
    DisjointTermination,
    /// One voice per subunit, chord tone picked by the gap
    SequentialSlice,
}

impl ToneMode {
    /// Tone buffer length in subunits
    pub fn subunits(self) -> usize {
        match self {
            ToneMode::DisjointTermination => DISJOINT_SUBUNITS,
            ToneMode::SequentialSlice => SEQUENTIAL_SUBUNITS,
        }
    }

    /// Whether a major refresh regenerates the noise layer when the
    /// configuration leaves it unspecified
    pub fn refreshes_noise_by_default(self) -> bool {
        match self {
            ToneMode::DisjointTermination => false,
            ToneMode::SequentialSlice => true,
        }
    }
}

/// `sin(2π · frequency · index / sample_rate)`
#[inline]
pub fn sine_sample(frequency: f64, sample_rate: u32, index: usize) -> Sample {
    let t = index as f64 / sample_rate as f64;
    (TAU * frequency * t).sin() as Sample
}

/// Owns the tone buffer and schedules its regeneration
pub struct ToneSynthesizer {
    mode: ToneMode,
    chords: ChordSet,
    sample_rate: u32,
    subunit: usize,
    buffer: Arc<SampleBuffer>,
    /// Per-voice regions for the sequential strategy, validated once
    regions: Vec<Region>,
}

impl ToneSynthesizer {
    pub fn new(
        mode: ToneMode,
        chords: ChordSet,
        sample_rate: u32,
        subunit: usize,
    ) -> EngineResult<Self> {
        let len = subunit * mode.subunits();
        let regions = match mode {
            ToneMode::DisjointTermination => Vec::new(),
            ToneMode::SequentialSlice => partition(len, subunit, NUM_VOICES)?,
        };

        log::debug!(
            "Tone synthesizer: {:?}, {} subunits of {} samples",
            mode,
            mode.subunits(),
            subunit
        );

        Ok(Self {
            mode,
            chords,
            sample_rate,
            subunit,
            buffer: Arc::new(SampleBuffer::silence(len)),
            regions,
        })
    }

    /// The shared tone buffer
    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    /// Per-voice regions (sequential strategy only)
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Audible samples per voice under the disjoint strategy
    pub fn voice_lengths(&self, gaps: [usize; NUM_VOICES]) -> [usize; NUM_VOICES] {
        gaps.map(|gap| self.subunit * DISJOINT_SUBUNITS.saturating_sub(gap))
    }

    /// Zero the tone buffer and schedule all voices for the new game state
    ///
    /// The caller must guarantee nothing else is reading or writing the tone
    /// buffer until the returned handle completes. Preconditions are checked
    /// before anything is scheduled.
    pub fn refresh(
        &self,
        pool: &TaskPool,
        base_frequency: f64,
        use_major: bool,
        gaps: [usize; NUM_VOICES],
    ) -> EngineResult<TaskHandle> {
        let notes = self
            .chords
            .select(use_major)
            .generate_for(base_frequency, NUM_VOICES)?;

        match self.mode {
            ToneMode::DisjointTermination => Ok(self.refresh_disjoint(pool, &notes, gaps)),
            ToneMode::SequentialSlice => self.refresh_sequential(pool, &notes, gaps),
        }
    }

    fn clear(&self, pool: &TaskPool) -> TaskHandle {
        let buffer = Arc::clone(&self.buffer);
        pool.parallel_for(&[], buffer.len(), move |i| buffer.set(i, 0.0))
    }

    fn refresh_disjoint(
        &self,
        pool: &TaskPool,
        notes: &[f64],
        gaps: [usize; NUM_VOICES],
    ) -> TaskHandle {
        let lengths = self.voice_lengths(gaps);
        let sample_rate = self.sample_rate;

        let mut previous = self.clear(pool);
        let mut disposals = Vec::with_capacity(NUM_VOICES);

        for (voice, (&frequency, &len)) in notes.iter().zip(lengths.iter()).enumerate() {
            let scratch = Arc::new(SampleBuffer::silence(len));

            let generate = {
                let scratch = Arc::clone(&scratch);
                pool.parallel_for(&[], len, move |i| {
                    scratch.set(i, sine_sample(frequency, sample_rate, i));
                })
            };

            // Merges share the destination, so each waits for the previous one.
            let merge = {
                let scratch = Arc::clone(&scratch);
                let destination = Arc::clone(&self.buffer);
                pool.parallel_for(&[generate, previous], len, move |i| {
                    destination.cells()[i].add(scratch.get(i));
                })
            };

            disposals.push(pool.schedule(&[merge.clone()], move || drop(scratch)));
            previous = merge;

            log::debug!("Voice {}: {:.3}Hz for {} samples", voice, frequency, len);
        }

        pool.combine(&disposals)
    }

    fn refresh_sequential(
        &self,
        pool: &TaskPool,
        notes: &[f64],
        gaps: [usize; NUM_VOICES],
    ) -> EngineResult<TaskHandle> {
        for &selector in &gaps {
            if selector >= notes.len() {
                return Err(EngineError::OutOfRange {
                    what: "chord selector",
                    index: selector,
                    len: notes.len(),
                });
            }
        }

        let sample_rate = self.sample_rate;
        let clear = self.clear(pool);

        let voices: Vec<TaskHandle> = self
            .regions
            .iter()
            .zip(gaps.iter())
            .map(|(&region, &selector)| {
                let frequency = notes[selector];
                let buffer = Arc::clone(&self.buffer);
                pool.parallel_for(&[clear.clone()], region.len, move |i| {
                    buffer.region(region)[i].set(sine_sample(frequency, sample_rate, i));
                })
            })
            .collect();

        Ok(pool.combine(&voices))
    }
}
