//! Common types for Chordcast
//!
//! This module contains the fundamental audio and geometry types shared by
//! the synthesis, spatialization and output stages.

use serde::{Deserialize, Serialize};

/// Default sample rate used when no device has been negotiated (48kHz)
pub const SAMPLE_RATE: u32 = 48000;

/// Number of independent sine voices in every tone strategy
pub const NUM_VOICES: usize = 3;

/// Speed of sound in air at ~20°C, in metres per second
pub const SPEED_OF_SOUND: f32 = 343.0;

/// Audio sample type (32-bit float throughout the pipeline)
pub type Sample = f32;

/// One stereo frame
///
/// `#[repr(C)]` pins the layout to `[left, right]`, so a slice of frames
/// casts to and from an interleaved `&[f32]` with bytemuck.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Mono downmix: the average of both channels
    #[inline]
    pub fn mono(&self) -> Sample {
        0.5 * (self.left + self.right)
    }

    /// Write this frame into an interleaved device frame of any width
    ///
    /// - 1 channel: mono downmix
    /// - 2 channels: left, right
    /// - 3+ channels: left, right, then silence
    #[inline]
    pub fn fan_out(&self, frame: &mut [Sample]) {
        match frame.len() {
            0 => {}
            1 => frame[0] = self.mono(),
            _ => {
                frame[0] = self.left;
                frame[1] = self.right;
                for ch in frame.iter_mut().skip(2) {
                    *ch = 0.0;
                }
            }
        }
    }
}

/// A point or offset on the listener's horizontal plane (metres)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean length
    #[inline]
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::ops::Neg for Vec2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_mono_averages() {
        let mut frame = [9.0];
        StereoSample::new(0.2, 0.6).fan_out(&mut frame);
        assert!((frame[0] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_fan_out_stereo_passthrough() {
        let mut frame = [0.0; 2];
        StereoSample::new(0.25, -0.5).fan_out(&mut frame);
        assert_eq!(frame, [0.25, -0.5]);
    }

    #[test]
    fn test_fan_out_multichannel_silences_extra() {
        let mut frame = [1.0; 6];
        StereoSample::new(0.1, 0.2).fan_out(&mut frame);
        assert_eq!(frame, [0.1, 0.2, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_vec2_mirror_length() {
        let ear = Vec2::new(0.5, 0.0);
        let source = Vec2::new(5.0, 0.0);
        assert!(((source + ear).length() - 5.5).abs() < 1e-6);
        assert!(((source - ear).length() - 4.5).abs() < 1e-6);
        assert_eq!(-ear, Vec2::new(-0.5, 0.0));
    }
}
