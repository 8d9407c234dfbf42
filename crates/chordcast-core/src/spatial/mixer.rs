//! Spatial mixer: tone and noise layers into one stereo output instance
//!
//! Both passes write every index of the target, so they run as a chain:
//!
//! ```text
//! deps ──► clear ──► tone pass (×0.5, centered) ──► noise pass (shift, gain, center)
//! ```
//!
//! The noise pass reads the solver slot when it runs, so it always sees the
//! parameters of the solve it depends on.

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use rayon::prelude::*;

use super::params::SpatializationParams;
use crate::buffer::{SampleBuffer, StereoBuffer};
use crate::error::{EngineError, EngineResult};
use crate::task::{TaskHandle, TaskPool, PARALLEL_BATCH};
use crate::types::Sample;

/// Scale of the unspatialized tone layer
pub const TONE_GAIN: Sample = 0.5;

/// `input[i - shift] * gain`, or silence before the sound has arrived
#[inline]
pub fn delayed(input: &SampleBuffer, index: usize, shift: usize, gain: Sample) -> Sample {
    if index < shift {
        0.0
    } else {
        input.get(index - shift) * gain
    }
}

pub struct SpatialMixer {
    tone: Arc<SampleBuffer>,
    noise: Arc<SampleBuffer>,
    params: Arc<AtomicCell<SpatializationParams>>,
}

impl SpatialMixer {
    pub fn new(
        tone: Arc<SampleBuffer>,
        noise: Arc<SampleBuffer>,
        params: Arc<AtomicCell<SpatializationParams>>,
    ) -> EngineResult<Self> {
        if tone.len() != noise.len() {
            return Err(EngineError::InvalidConfig(format!(
                "tone buffer ({}) and noise buffer ({}) differ in length",
                tone.len(),
                noise.len()
            )));
        }
        Ok(Self {
            tone,
            noise,
            params,
        })
    }

    /// Schedule clear, tone pass and noise pass into `target` after `deps`
    ///
    /// `deps` must cover the tone and noise refreshes and the solve whose
    /// result the noise pass should use.
    pub fn mix(
        &self,
        pool: &TaskPool,
        deps: &[TaskHandle],
        target: &Arc<StereoBuffer>,
    ) -> EngineResult<TaskHandle> {
        if target.len() != self.tone.len() {
            return Err(EngineError::OutOfRange {
                what: "output instance length",
                index: target.len(),
                len: self.tone.len(),
            });
        }

        let clear = {
            let target = Arc::clone(target);
            pool.parallel_for(deps, target.len(), move |i| {
                target.left.set(i, 0.0);
                target.right.set(i, 0.0);
            })
        };

        let tone = {
            let target = Arc::clone(target);
            let input = Arc::clone(&self.tone);
            pool.parallel_for(&[clear], target.len(), move |i| {
                let sample = input.get(i) * TONE_GAIN;
                target.left.cells()[i].add(sample);
                target.right.cells()[i].add(sample);
            })
        };

        let target = Arc::clone(target);
        let input = Arc::clone(&self.noise);
        let params = Arc::clone(&self.params);
        let noise = pool.schedule(&[tone], move || {
            let p = params.load();
            let gain_left = p.gain_left * p.center_gain;
            let gain_right = p.gain_right * p.center_gain;
            (0..target.len())
                .into_par_iter()
                .with_min_len(PARALLEL_BATCH)
                .for_each(|i| {
                    target.left.cells()[i].add(delayed(&input, i, p.shift_left, gain_left));
                    target.right.cells()[i].add(delayed(&input, i, p.shift_right, gain_right));
                });
        });

        Ok(noise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec2;

    const LEN: usize = 1000;

    fn ramp(len: usize, scale: Sample) -> Arc<SampleBuffer> {
        let buffer = SampleBuffer::silence(len);
        for i in 0..len {
            buffer.set(i, (i as Sample + 1.0) * scale);
        }
        Arc::new(buffer)
    }

    fn params(
        shift_left: usize,
        shift_right: usize,
        gain_left: f32,
        gain_right: f32,
        center_gain: f32,
    ) -> SpatializationParams {
        let mut p = SpatializationParams::compute(Vec2::new(0.5, 0.0), Vec2::ZERO, 343.0, 48000, 0.0);
        p.shift_left = shift_left;
        p.shift_right = shift_right;
        p.gain_left = gain_left;
        p.gain_right = gain_right;
        p.center_gain = center_gain;
        p
    }

    #[test]
    fn test_tone_only_is_centered_and_halved() {
        let pool = TaskPool::new(2).unwrap();
        let tone = ramp(LEN, 0.001);
        let noise = Arc::new(SampleBuffer::silence(LEN));
        let slot = Arc::new(AtomicCell::new(params(3, 0, 2.0, 1.0, 1.0)));
        let mixer = SpatialMixer::new(Arc::clone(&tone), noise, slot).unwrap();

        let target = Arc::new(StereoBuffer::silence(LEN));
        mixer.mix(&pool, &[], &target).unwrap().wait();

        for i in 0..LEN {
            assert_eq!(target.left.get(i), tone.get(i) * 0.5);
            assert_eq!(target.right.get(i), target.left.get(i));
        }
    }

    #[test]
    fn test_noise_pass_delays_and_scales_each_ear() {
        let pool = TaskPool::new(2).unwrap();
        let tone = Arc::new(SampleBuffer::silence(LEN));
        let noise = ramp(LEN, 1.0);
        let slot = Arc::new(AtomicCell::new(params(7, 0, 0.5, 2.0, 0.5)));
        let mixer = SpatialMixer::new(tone, Arc::clone(&noise), slot).unwrap();

        let target = Arc::new(StereoBuffer::silence(LEN));
        mixer.mix(&pool, &[], &target).unwrap().wait();

        for i in 0..7 {
            assert_eq!(target.left.get(i), 0.0);
        }
        assert_eq!(target.left.get(7), noise.get(0) * 0.25);
        assert_eq!(target.left.get(500), noise.get(493) * 0.25);
        assert_eq!(target.right.get(0), noise.get(0));
        assert_eq!(target.right.get(999), noise.get(999));
    }

    #[test]
    fn test_mix_clears_previous_contents() {
        let pool = TaskPool::new(2).unwrap();
        let tone = ramp(LEN, 0.001);
        let noise = ramp(LEN, 0.002);
        let slot = Arc::new(AtomicCell::new(params(2, 5, 1.0, 0.5, 0.8)));
        let mixer = SpatialMixer::new(tone, noise, slot).unwrap();

        let target = Arc::new(StereoBuffer::silence(LEN));
        mixer.mix(&pool, &[], &target).unwrap().wait();
        let first = (target.left.to_vec(), target.right.to_vec());

        mixer.mix(&pool, &[], &target).unwrap().wait();
        assert_eq!((target.left.to_vec(), target.right.to_vec()), first);
    }

    #[test]
    fn test_noise_pass_reads_params_when_it_runs() {
        let pool = TaskPool::new(2).unwrap();
        let tone = Arc::new(SampleBuffer::silence(LEN));
        let noise = ramp(LEN, 1.0);
        let slot = Arc::new(AtomicCell::new(params(0, 0, 1.0, 1.0, 1.0)));
        let mixer = SpatialMixer::new(tone, noise, Arc::clone(&slot)).unwrap();

        let update = {
            let slot = Arc::clone(&slot);
            pool.schedule(&[], move || slot.store(params(0, 0, 3.0, 3.0, 1.0)))
        };
        let target = Arc::new(StereoBuffer::silence(LEN));
        mixer.mix(&pool, &[update], &target).unwrap().wait();

        assert_eq!(target.left.get(10), 33.0);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let slot = Arc::new(AtomicCell::new(params(0, 0, 1.0, 1.0, 1.0)));
        assert!(matches!(
            SpatialMixer::new(ramp(10, 1.0), ramp(11, 1.0), Arc::clone(&slot)),
            Err(EngineError::InvalidConfig(_))
        ));

        let pool = TaskPool::new(1).unwrap();
        let mixer = SpatialMixer::new(ramp(10, 1.0), ramp(10, 1.0), slot).unwrap();
        let target = Arc::new(StereoBuffer::silence(12));
        assert!(matches!(
            mixer.mix(&pool, &[], &target),
            Err(EngineError::OutOfRange { .. })
        ));
    }
}
