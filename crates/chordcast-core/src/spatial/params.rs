//! Binaural parameter solver
//!
//! Turns the listener/source geometry into per-ear integer delays, inverse
//! square gains and a center-bleed factor. There is no HRTF and no
//! fractional delay.

use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use serde::{Deserialize, Serialize};

use crate::task::{TaskHandle, TaskPool};
use crate::types::{Vec2, SAMPLE_RATE, SPEED_OF_SOUND};

/// Keeps the inverse-square gain finite when the source sits on an ear
pub const GAIN_EPSILON: f32 = 1e-5;

/// One solved snapshot of the binaural model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatializationParams {
    /// Leading silence on the left channel, in samples
    pub shift_left: usize,
    pub shift_right: usize,
    pub gain_left: f32,
    pub gain_right: f32,
    /// Applied to both ears on top of the per-ear gain
    pub center_gain: f32,

    pub distance_left: f32,
    pub distance_right: f32,
    /// Path difference relative to head width, clamped to [0, 1]
    pub distance_factor: f32,
    pub delay_left: f32,
    pub delay_right: f32,
}

impl SpatializationParams {
    /// Solve the model for one source position
    ///
    /// The left ear mirrors `right_ear` about the origin.
    pub fn compute(
        right_ear: Vec2,
        source: Vec2,
        speed_of_sound: f32,
        sample_rate: u32,
        center_attenuation: f32,
    ) -> Self {
        let left_ear = -right_ear;
        let distance_left = (source - left_ear).length();
        let distance_right = (source - right_ear).length();

        let rate = sample_rate as f32;
        let delay_left = distance_left / speed_of_sound * rate;
        let delay_right = distance_right / speed_of_sound * rate;

        let min_delay = delay_left.min(delay_right);
        let shift_left = (delay_left - min_delay).round() as usize;
        let shift_right = (delay_right - min_delay).round() as usize;

        let gain_left = 1.0 / (distance_left * distance_left + GAIN_EPSILON);
        let gain_right = 1.0 / (distance_right * distance_right + GAIN_EPSILON);

        let path_difference =
            distance_left.max(distance_right) - 0.5 * (distance_left + distance_right);
        let head_diameter = (right_ear - left_ear).length();
        let distance_factor = if head_diameter > 0.0 {
            (path_difference / head_diameter).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let center_gain = lerp(1.0, distance_factor, center_attenuation);

        Self {
            shift_left,
            shift_right,
            gain_left,
            gain_right,
            center_gain,
            distance_left,
            distance_right,
            distance_factor,
            delay_left,
            delay_right,
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Fixed listener setup for one engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ListenerGeometry {
    /// Offset of the right ear from the head center (metres)
    pub right_ear: Vec2,
    pub speed_of_sound: f32,
    pub sample_rate: u32,
    pub center_attenuation: f32,
}

impl Default for ListenerGeometry {
    fn default() -> Self {
        Self {
            right_ear: Vec2::new(0.5, 0.0),
            speed_of_sound: SPEED_OF_SOUND,
            sample_rate: SAMPLE_RATE,
            center_attenuation: 1.0,
        }
    }
}

impl ListenerGeometry {
    pub fn solve(&self, source: Vec2) -> SpatializationParams {
        SpatializationParams::compute(
            self.right_ear,
            source,
            self.speed_of_sound,
            self.sample_rate,
            self.center_attenuation,
        )
    }
}

/// Runs the solver as a task and keeps the latest result
///
/// The slot starts out holding the solution for a source at the origin and
/// is overwritten by every solve, so the last value persists between cycles.
pub struct SpatialSolver {
    geometry: ListenerGeometry,
    latest: Arc<AtomicCell<SpatializationParams>>,
}

impl SpatialSolver {
    pub fn new(geometry: ListenerGeometry) -> Self {
        let initial = geometry.solve(Vec2::ZERO);
        Self {
            geometry,
            latest: Arc::new(AtomicCell::new(initial)),
        }
    }

    pub fn geometry(&self) -> &ListenerGeometry {
        &self.geometry
    }

    /// Shared slot read by the mixer task
    pub fn slot(&self) -> &Arc<AtomicCell<SpatializationParams>> {
        &self.latest
    }

    /// Most recently solved parameters
    pub fn latest(&self) -> SpatializationParams {
        self.latest.load()
    }

    /// Schedule one solve for `source` after `deps`
    pub fn schedule(&self, pool: &TaskPool, deps: &[TaskHandle], source: Vec2) -> TaskHandle {
        let geometry = self.geometry;
        let latest = Arc::clone(&self.latest);
        pool.schedule(deps, move || latest.store(geometry.solve(source)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EAR: Vec2 = Vec2::new(0.5, 0.0);

    fn solve(source: Vec2, center_attenuation: f32) -> SpatializationParams {
        SpatializationParams::compute(EAR, source, SPEED_OF_SOUND, 48000, center_attenuation)
    }

    #[test]
    fn test_centered_source_is_symmetric() {
        let p = solve(Vec2::ZERO, 0.0);
        assert_eq!(p.shift_left, 0);
        assert_eq!(p.shift_right, 0);
        assert_eq!(p.gain_left, p.gain_right);
        assert_eq!(p.distance_factor, 0.0);
        assert_eq!(p.center_gain, 1.0);
    }

    #[test]
    fn test_centered_source_with_attenuation_blends_to_factor() {
        // lerp(1, 0, c) for a centered source
        let p = solve(Vec2::ZERO, 0.25);
        assert!((p.center_gain - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_source_on_the_right() {
        let p = solve(Vec2::new(5.0, 0.0), 1.0);
        assert!(p.distance_right < p.distance_left);
        assert!(p.shift_right < p.shift_left);
        assert_eq!(p.shift_right, 0);
        assert!(p.gain_right > p.gain_left);

        // 1m path difference at 343m/s and 48kHz
        assert_eq!(p.shift_left, (48000.0f32 / 343.0).round() as usize);
        assert!((p.gain_right - 1.0 / (4.5 * 4.5 + GAIN_EPSILON)).abs() < 1e-6);
    }

    #[test]
    fn test_mirrored_sources_swap_ears() {
        let right = solve(Vec2::new(2.0, 1.0), 0.5);
        let left = solve(Vec2::new(-2.0, 1.0), 0.5);
        assert_eq!(right.shift_left, left.shift_right);
        assert_eq!(right.shift_right, left.shift_left);
        assert!((right.gain_right - left.gain_left).abs() < 1e-6);
        assert!((right.center_gain - left.center_gain).abs() < 1e-6);
    }

    #[test]
    fn test_approaching_an_ear_is_monotonic() {
        let mut previous = solve(Vec2::ZERO, 1.0);
        for step in 1..10 {
            let p = solve(Vec2::new(step as f32 * 0.05, 0.0), 1.0);
            assert!(p.gain_right > previous.gain_right);
            assert_eq!(p.shift_right, 0);
            assert!(p.shift_left >= previous.shift_left);
            previous = p;
        }
        assert!(previous.shift_left > 0);
    }

    #[test]
    fn test_distance_factor_on_the_ear_axis() {
        // On the ear line the ears differ by one head width, half of which
        // is the path difference against the mean distance.
        let p = solve(Vec2::new(40.0, 0.0), 1.0);
        assert!((p.distance_factor - 0.5).abs() < 1e-4);
        assert!((p.center_gain - 0.5).abs() < 1e-4);

        for x in [-30.0, -1.0, 0.3, 2.0, 100.0] {
            let p = solve(Vec2::new(x, 0.7), 1.0);
            assert!((0.0..=1.0).contains(&p.distance_factor));
        }
    }

    #[test]
    fn test_source_on_ear_stays_finite() {
        let p = solve(EAR, 1.0);
        assert!(p.gain_right.is_finite());
        assert!((p.gain_right - 1.0 / GAIN_EPSILON).abs() < 1.0);
    }

    #[test]
    fn test_solver_task_updates_slot() {
        let pool = TaskPool::new(1).unwrap();
        let solver = SpatialSolver::new(ListenerGeometry::default());
        assert_eq!(solver.latest().shift_left, 0);

        solver.schedule(&pool, &[], Vec2::new(3.0, 0.0)).wait();
        let p = solver.latest();
        assert!(p.shift_left > 0);
        assert_eq!(p, solver.geometry().solve(Vec2::new(3.0, 0.0)));
    }
}
