//! Scripted stand-in for the game
//!
//! Walks through a fixed list of stack layouts, changing layout every few
//! seconds, while the tray tilts back and forth on a slow sine.

use std::f32::consts::TAU;

use chordcast_core::input::{tilt_to_source, GapInput, TickInputs};

/// Stack distances visited in order; negative entries put the game in minor mode
const LAYOUTS: [[i32; 3]; 6] = [
    [0, 0, 0],
    [1, 0, 2],
    [3, 2, 0],
    [2, -1, 0],
    [0, 4, 1],
    [5, 5, 5],
];

/// Peak clockwise moment of the simulated tilt
const TILT_AMPLITUDE: f32 = 150.0;

/// Period of one full tilt swing, in seconds
const TILT_PERIOD: f32 = 8.0;

pub struct GameSimulator {
    ticks_per_second: f64,
    ticks_per_layout: u64,
    tick: u64,
    base_frequency: f64,
    tilt_sensitivity: f32,
}

impl GameSimulator {
    pub fn new(
        ticks_per_second: f64,
        seconds_per_layout: f64,
        base_frequency: f64,
        tilt_sensitivity: f32,
    ) -> Self {
        Self {
            ticks_per_second,
            ticks_per_layout: (ticks_per_second * seconds_per_layout).round().max(1.0) as u64,
            tick: 0,
            base_frequency,
            tilt_sensitivity,
        }
    }

    /// Inputs for the next control-loop tick
    pub fn step(&mut self) -> TickInputs {
        let layout_index = (self.tick / self.ticks_per_layout) as usize % LAYOUTS.len();
        let layout_changed = self.tick % self.ticks_per_layout == 0;

        let seconds = (self.tick as f64 / self.ticks_per_second) as f32;
        let moment = TILT_AMPLITUDE * (TAU * seconds / TILT_PERIOD).sin();

        let mut inputs = TickInputs::new(
            self.base_frequency,
            GapInput::from_stack_distances(LAYOUTS[layout_index]),
            tilt_to_source(moment, self.tilt_sensitivity),
        );
        inputs.major_refresh_requested = layout_changed;

        self.tick += 1;
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_requests_refresh() {
        let mut sim = GameSimulator::new(60.0, 2.0, 261.626, 0.01);
        let first = sim.step();
        assert!(first.major_refresh_requested);
        assert!(first.use_major);
        assert_eq!(first.gaps, [0, 0, 0]);
        assert!(!sim.step().major_refresh_requested);
    }

    #[test]
    fn test_layout_changes_on_schedule() {
        let mut sim = GameSimulator::new(10.0, 1.0, 261.626, 0.01);
        let ticks: Vec<TickInputs> = (0..40).map(|_| sim.step()).collect();

        let refreshes: Vec<usize> = ticks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.major_refresh_requested)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(refreshes, vec![0, 10, 20, 30]);

        assert_eq!(ticks[10].gaps, [1, 0, 2]);
        // Layout 3 overshoots one stack: minor mode
        assert!(!ticks[30].use_major);
    }

    #[test]
    fn test_tilt_stays_on_ear_axis() {
        let mut sim = GameSimulator::new(60.0, 2.0, 261.626, 0.01);
        for _ in 0..600 {
            let source = sim.step().source_position;
            assert_eq!(source.y, 0.0);
            assert!(source.x.abs() < 1.0);
        }
    }
}
