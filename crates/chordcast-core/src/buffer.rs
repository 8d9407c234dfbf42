//! Shared sample storage for the task graph
//!
//! Buffers are touched from three places: worker tasks that fill them, other
//! worker tasks that read them, and the real-time render thread. Each sample
//! is stored as the bit pattern of an `f32` inside an `AtomicU32`, so every
//! access is data-race free without locks. Cross-sample ordering comes from
//! the task dependency graph (happens-before through task completion) and,
//! for the output pair, from the acquire/release publish flag.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{EngineError, EngineResult};
use crate::types::{Sample, StereoSample};

/// One sample slot, readable and writable through a shared reference
#[repr(transparent)]
#[derive(Debug, Default)]
pub struct SampleCell(AtomicU32);

impl SampleCell {
    #[inline]
    pub fn get(&self) -> Sample {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: Sample) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Accumulate into the slot
    ///
    /// Not a read-modify-write atomic: only one task may write a given
    /// slot at a time, which the dependency graph guarantees.
    #[inline]
    pub fn add(&self, value: Sample) {
        self.set(self.get() + value);
    }
}

/// Fixed-length sample buffer, allocated once and never resized
#[derive(Debug)]
pub struct SampleBuffer {
    cells: Box<[SampleCell]>,
}

impl SampleBuffer {
    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            cells: (0..len).map(|_| SampleCell::default()).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Sample {
        self.cells[index].get()
    }

    #[inline]
    pub fn set(&self, index: usize, value: Sample) {
        self.cells[index].set(value);
    }

    /// All slots, for range-parallel iteration
    #[inline]
    pub fn cells(&self) -> &[SampleCell] {
        &self.cells
    }

    /// The slots of one region of a partition
    #[inline]
    pub fn region(&self, region: Region) -> &[SampleCell] {
        &self.cells[region.offset..region.end()]
    }

    /// Copy the current contents out (tests and diagnostics)
    pub fn to_vec(&self) -> Vec<Sample> {
        self.cells.iter().map(SampleCell::get).collect()
    }
}

/// A left/right pair of equally long buffers
#[derive(Debug)]
pub struct StereoBuffer {
    pub left: SampleBuffer,
    pub right: SampleBuffer,
}

impl StereoBuffer {
    pub fn silence(len: usize) -> Self {
        Self {
            left: SampleBuffer::silence(len),
            right: SampleBuffer::silence(len),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    #[inline]
    pub fn frame(&self, index: usize) -> StereoSample {
        StereoSample::new(self.left.get(index), self.right.get(index))
    }
}

/// A contiguous index range of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: usize,
    pub len: usize,
}

impl Region {
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Split `[0, count * region_len)` of a buffer into `count` back-to-back regions
///
/// Regions are validated once here (in bounds, pairwise disjoint) and then
/// reused for every refresh without re-checking.
pub fn partition(buffer_len: usize, region_len: usize, count: usize) -> EngineResult<Vec<Region>> {
    let regions: Vec<Region> = (0..count)
        .map(|i| Region {
            offset: i * region_len,
            len: region_len,
        })
        .collect();

    for (i, region) in regions.iter().enumerate() {
        if region.end() > buffer_len {
            return Err(EngineError::OutOfRange {
                what: "region end",
                index: region.end(),
                len: buffer_len,
            });
        }
        if let Some(next) = regions.get(i + 1) {
            if next.offset < region.end() {
                return Err(EngineError::InvalidConfig(format!(
                    "regions {} and {} overlap",
                    i,
                    i + 1
                )));
            }
        }
    }

    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_roundtrips_float_bits() {
        let cell = SampleCell::default();
        assert_eq!(cell.get(), 0.0);
        cell.set(-0.375);
        assert_eq!(cell.get(), -0.375);
        cell.add(0.5);
        assert_eq!(cell.get(), 0.125);
    }

    #[test]
    fn test_silence_and_set() {
        let buffer = SampleBuffer::silence(16);
        assert_eq!(buffer.len(), 16);
        assert!(buffer.to_vec().iter().all(|&s| s == 0.0));
        buffer.set(3, 1.0);
        assert_eq!(buffer.get(3), 1.0);
        assert_eq!(buffer.get(4), 0.0);
    }

    #[test]
    fn test_partition_is_disjoint_and_covering() {
        let regions = partition(70, 10, 3).unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0], Region { offset: 0, len: 10 });
        assert_eq!(regions[1], Region { offset: 10, len: 10 });
        assert_eq!(regions[2], Region { offset: 20, len: 10 });
        for pair in regions.windows(2) {
            assert_eq!(pair[0].end(), pair[1].offset);
        }
    }

    #[test]
    fn test_partition_rejects_overflow() {
        let err = partition(25, 10, 3).unwrap_err();
        assert!(matches!(err, EngineError::OutOfRange { what: "region end", .. }));
    }

    #[test]
    fn test_region_view_addresses_buffer() {
        let buffer = SampleBuffer::silence(30);
        let regions = partition(30, 10, 3).unwrap();
        buffer.region(regions[1])[0].set(2.0);
        assert_eq!(buffer.get(10), 2.0);
    }
}
