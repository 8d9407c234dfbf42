//! Adapters from game-side signals to engine inputs
//!
//! The engine itself only understands gaps, a mode flag and a source
//! position. These helpers map the raw collaborator signals (stack height
//! differences, a tilt moment) onto them.

use crate::types::{Vec2, NUM_VOICES};

/// Gap vector and mode derived from the three stack distances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapInput {
    pub use_major: bool,
    pub gaps: [usize; NUM_VOICES],
}

impl GapInput {
    /// Major iff no stack overshoots (all distances ≥ 0)
    ///
    /// In major mode the lowest stack is normalized to gap 0; in minor mode
    /// every voice plays its full length.
    pub fn from_stack_distances(distances: [i32; NUM_VOICES]) -> Self {
        let use_major = distances.iter().all(|&d| d >= 0);
        let gaps = if use_major {
            let minimum = distances.iter().copied().min().unwrap_or(0);
            distances.map(|d| (d - minimum) as usize)
        } else {
            [0; NUM_VOICES]
        };
        Self { use_major, gaps }
    }
}

/// Map a clockwise tilt moment onto a source position on the ear axis
pub fn tilt_to_source(clockwise_moment: f32, sensitivity: f32) -> Vec2 {
    Vec2::new((clockwise_moment * sensitivity).tanh(), 0.0)
}

/// Everything the control loop hands the engine once per tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInputs {
    pub base_frequency: f64,
    pub use_major: bool,
    pub gaps: [usize; NUM_VOICES],
    pub source_position: Vec2,
    /// Edge: the game state changed and the tone layer must be rebuilt
    pub major_refresh_requested: bool,
}

impl TickInputs {
    pub fn new(base_frequency: f64, gaps: GapInput, source_position: Vec2) -> Self {
        Self {
            base_frequency,
            use_major: gaps.use_major,
            gaps: gaps.gaps,
            source_position,
            major_refresh_requested: false,
        }
    }

    pub fn with_major_refresh(mut self) -> Self {
        self.major_refresh_requested = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_subtracts_minimum() {
        let input = GapInput::from_stack_distances([3, 1, 4]);
        assert!(input.use_major);
        assert_eq!(input.gaps, [2, 0, 3]);
    }

    #[test]
    fn test_any_negative_is_minor_with_full_voices() {
        let input = GapInput::from_stack_distances([3, -1, 4]);
        assert!(!input.use_major);
        assert_eq!(input.gaps, [0, 0, 0]);
    }

    #[test]
    fn test_level_stacks_have_no_gaps() {
        let input = GapInput::from_stack_distances([0, 0, 0]);
        assert!(input.use_major);
        assert_eq!(input.gaps, [0, 0, 0]);
    }

    #[test]
    fn test_tilt_is_bounded_on_ear_axis() {
        assert_eq!(tilt_to_source(0.0, 0.01), Vec2::ZERO);
        let hard_right = tilt_to_source(10_000.0, 0.01);
        assert!(hard_right.x > 0.99 && hard_right.x <= 1.0);
        assert_eq!(hard_right.y, 0.0);
        assert!((tilt_to_source(-50.0, 0.01).x + 0.5f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn test_tick_inputs_builder() {
        let gaps = GapInput::from_stack_distances([2, 2, 5]);
        let inputs = TickInputs::new(261.626, gaps, Vec2::ZERO).with_major_refresh();
        assert!(inputs.major_refresh_requested);
        assert!(inputs.use_major);
        assert_eq!(inputs.gaps, [0, 0, 3]);
    }
}
