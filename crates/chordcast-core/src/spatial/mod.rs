//! Binaural spatialization: parameter solver and the stereo mixer

pub mod mixer;
pub mod params;

pub use mixer::{SpatialMixer, TONE_GAIN};
pub use params::{ListenerGeometry, SpatialSolver, SpatializationParams};
