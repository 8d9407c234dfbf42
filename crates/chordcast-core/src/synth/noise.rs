//! Deterministic white-noise layer
//!
//! Each sample index owns a private PCG32 stream, seeded once from a master
//! seed at construction. A refresh advances every stream by exactly one draw,
//! so the result does not depend on how the work is split across workers and
//! two engines built with the same seed stay in lockstep.

use std::sync::{Arc, Mutex, PoisonError};

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg32;
use rayon::prelude::*;

use crate::buffer::SampleBuffer;
use crate::task::{TaskHandle, TaskPool, PARALLEL_BATCH};
use crate::types::Sample;

/// Default peak amplitude of the noise layer
pub const DEFAULT_NOISE_AMPLITUDE: Sample = 0.5;

/// Default master seed
pub const DEFAULT_NOISE_SEED: u64 = 1;

/// Derive one independent stream per sample index from a master seed
pub fn per_index_streams(seed: u64, len: usize) -> Vec<Pcg32> {
    let mut seeder = Pcg32::seed_from_u64(seed);
    (0..len)
        // +1 keeps every derived seed non-zero
        .map(|_| Pcg32::seed_from_u64(seeder.next_u32() as u64 + 1))
        .collect()
}

/// Owns the noise buffer and its per-index generator state
pub struct NoiseSynthesizer {
    buffer: Arc<SampleBuffer>,
    streams: Arc<Mutex<Vec<Pcg32>>>,
    max_amplitude: Sample,
}

impl NoiseSynthesizer {
    pub fn new(len: usize, seed: u64, max_amplitude: Sample) -> Self {
        Self {
            buffer: Arc::new(SampleBuffer::silence(len)),
            streams: Arc::new(Mutex::new(per_index_streams(seed, len))),
            max_amplitude,
        }
    }

    /// The shared noise buffer
    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    pub fn max_amplitude(&self) -> Sample {
        self.max_amplitude
    }

    /// Schedule one draw per index into `[-max_amplitude, max_amplitude]`
    ///
    /// The caller must keep readers of the noise buffer behind the returned
    /// handle.
    pub fn refresh(&self, pool: &TaskPool) -> TaskHandle {
        let buffer = Arc::clone(&self.buffer);
        let streams = Arc::clone(&self.streams);
        let amplitude = self.max_amplitude;

        pool.schedule(&[], move || {
            let mut streams = streams.lock().unwrap_or_else(PoisonError::into_inner);
            streams
                .as_mut_slice()
                .par_iter_mut()
                .zip(buffer.cells().par_iter())
                .with_min_len(PARALLEL_BATCH)
                .for_each(|(rng, cell)| {
                    let noise: Sample = rng.gen_range(-1.0..1.0);
                    cell.set(noise * amplitude);
                });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(seed: u64, len: usize, refreshes: usize) -> Vec<Sample> {
        let pool = TaskPool::new(3).unwrap();
        let noise = NoiseSynthesizer::new(len, seed, DEFAULT_NOISE_AMPLITUDE);
        for _ in 0..refreshes {
            noise.refresh(&pool).wait();
        }
        noise.buffer().to_vec()
    }

    #[test]
    fn test_same_seed_same_noise() {
        assert_eq!(filled(7, 2048, 1), filled(7, 2048, 1));
        assert_eq!(filled(7, 2048, 3), filled(7, 2048, 3));
    }

    #[test]
    fn test_refresh_advances_streams() {
        assert_ne!(filled(7, 512, 1), filled(7, 512, 2));
    }

    #[test]
    fn test_different_seeds_differ() {
        assert_ne!(filled(1, 512, 1), filled(2, 512, 1));
    }

    #[test]
    fn test_amplitude_bounds() {
        let samples = filled(42, 4096, 2);
        assert!(samples.iter().all(|s| s.abs() <= DEFAULT_NOISE_AMPLITUDE));
        // Not degenerate
        assert!(samples.iter().any(|&s| s > 0.1));
        assert!(samples.iter().any(|&s| s < -0.1));
    }

    #[test]
    fn test_unrefreshed_buffer_is_silent() {
        assert!(filled(1, 64, 0).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_streams_independent_of_split() {
        // Index k's first draw only depends on the seed, not on the buffer length.
        let short = filled(9, 100, 1);
        let long = filled(9, 5000, 1);
        assert_eq!(short[..], long[..100]);
    }
}
