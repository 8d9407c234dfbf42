//! Subunit sizing
//!
//! All engine buffers are measured in whole "subunits": the smallest number
//! of device callback blocks that holds at least 100ms of audio, multiplied
//! by a configured ratio.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Minimum audio duration covered by one subunit at ratio 1
pub const SUBUNIT_MIN_MS: u32 = 100;

/// Facts reported by the output device once its stream is negotiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceParams {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Frames per hardware callback
    pub block_size: u32,
}

impl DeviceParams {
    pub fn new(sample_rate: u32, block_size: u32) -> Self {
        Self {
            sample_rate,
            block_size,
        }
    }

    /// Reject devices that report a zero rate or block size
    pub fn validate(&self) -> EngineResult<()> {
        if self.sample_rate == 0 || self.block_size == 0 {
            return Err(EngineError::InvalidDevice {
                sample_rate: self.sample_rate,
                block_size: self.block_size,
            });
        }
        Ok(())
    }
}

/// `ceil(sample_rate * 0.1 / block_size) * block_size * ratio`
///
/// Computed in integers: `ceil(ceil(r / 10) / b) == ceil(r / (10 b))`.
pub fn subunit_size(device: DeviceParams, ratio: u32) -> EngineResult<usize> {
    device.validate()?;
    if ratio == 0 {
        return Err(EngineError::InvalidConfig(
            "subunit_ratio must be at least 1".to_string(),
        ));
    }

    let block = device.block_size as usize;
    let min_samples = (device.sample_rate as usize * SUBUNIT_MIN_MS as usize).div_ceil(1000);
    let blocks = min_samples.div_ceil(block);

    Ok(blocks * block * ratio as usize)
}
