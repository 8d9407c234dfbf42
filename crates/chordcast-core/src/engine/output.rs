//! Double-buffered stereo output shared with the real-time thread
//!
//! Two equally long instances. One is `stable` and may be read; the writer
//! only ever fills the other one and flips `stable` once the whole mix chain
//! for it has finished.
//!
//! The reader additionally announces which instance it is inside of for the
//! duration of a block (`reading`). Before the writer schedules a chain into
//! the non-stable instance it checks that slot; if the reader is still
//! finishing a block on that instance (it picked it up just before the last
//! flip), the write is deferred to the next tick. All accesses to `stable`
//! and `reading` are `SeqCst`, which makes the announce/re-check on the
//! reader side and the check on the writer side mutually exclusive:
//!
//! ```text
//! reader                                   writer (control thread)
//! ──────                                   ───────────────────────
//! idx = stable                              publish task: stable = S
//! reading = idx                             ... later tick ...
//! if stable != idx: retry                   if reading == 1 - S: defer
//! read block from idx                       else: clear + mix into 1 - S
//! reading = NONE
//! ```
//!
//! The reader never locks, allocates or waits on a task.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::buffer::StereoBuffer;
use crate::types::{Sample, StereoSample};

const NOT_READING: usize = usize::MAX;

/// The two output instances and the flags shared between writer and reader
pub struct StereoOutputPair {
    instances: [Arc<StereoBuffer>; 2],
    stable: AtomicUsize,
    reading: AtomicUsize,
    /// Raised by the reader when its cursor wraps
    refresh_requested: AtomicBool,
    /// Raised by the writer to send the reader back to index 0
    rewind: AtomicBool,
    published: AtomicU64,
}

impl StereoOutputPair {
    /// Two silent instances of `len` frames; instance 0 starts out stable
    pub fn new(len: usize) -> Self {
        Self {
            instances: [
                Arc::new(StereoBuffer::silence(len)),
                Arc::new(StereoBuffer::silence(len)),
            ],
            stable: AtomicUsize::new(0),
            reading: AtomicUsize::new(NOT_READING),
            refresh_requested: AtomicBool::new(false),
            rewind: AtomicBool::new(false),
            published: AtomicU64::new(0),
        }
    }

    /// Frames per instance
    pub fn len(&self) -> usize {
        self.instances[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances[0].is_empty()
    }

    pub fn instance(&self, index: usize) -> &Arc<StereoBuffer> {
        &self.instances[index & 1]
    }

    pub fn stable_index(&self) -> usize {
        self.stable.load(Ordering::SeqCst)
    }

    /// The instance the writer may fill next, unless the reader is still in it
    pub fn writable_index(&self) -> Option<usize> {
        let target = 1 - self.stable.load(Ordering::SeqCst);
        if self.reading.load(Ordering::SeqCst) == target {
            None
        } else {
            Some(target)
        }
    }

    /// Make `index` the readable instance
    ///
    /// Called from the last task of a mix chain.
    pub fn publish(&self, index: usize) {
        self.stable.store(index & 1, Ordering::SeqCst);
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of completed publishes
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Mark a major refresh as wanted; the next tick consumes it
    pub fn request_refresh(&self) {
        self.refresh_requested.store(true, Ordering::Release);
    }

    /// A refresh was requested (reader wrap or host) and not consumed yet
    pub fn refresh_pending(&self) -> bool {
        self.refresh_requested.load(Ordering::Acquire)
    }

    /// Consume a pending refresh request
    pub fn take_refresh_request(&self) -> bool {
        self.refresh_requested.swap(false, Ordering::AcqRel)
    }

    /// Ask the reader to restart from index 0 at its next block
    pub fn request_rewind(&self) {
        self.rewind.store(true, Ordering::Release);
    }
}

/// Real-time side of the output pair
///
/// Owned by the audio callback. Holds its own read cursor.
pub struct OutputReader {
    pair: Arc<StereoOutputPair>,
    cursor: usize,
}

impl OutputReader {
    pub fn new(pair: Arc<StereoOutputPair>) -> Self {
        Self { pair, cursor: 0 }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Fill an interleaved device block of `channels` channels
    pub fn render(&mut self, data: &mut [Sample], channels: usize) {
        if channels == 0 {
            return;
        }
        let index = self.enter();
        let instance = self.pair.instance(index);
        let len = instance.len();
        let mut cursor = self.cursor;
        let mut wrapped = false;
        for frame in data.chunks_mut(channels) {
            instance.frame(cursor).fan_out(frame);
            cursor += 1;
            if cursor >= len {
                cursor = 0;
                wrapped = true;
            }
        }
        self.cursor = cursor;
        if wrapped {
            self.pair.request_refresh();
        }
        self.leave();
    }

    /// Read a single stereo frame and advance the cursor
    pub fn read_frame(&mut self) -> StereoSample {
        let index = self.enter();
        let frame = self.pair.instance(index).frame(self.cursor);
        self.cursor += 1;
        if self.cursor >= self.pair.len() {
            self.cursor = 0;
            self.pair.request_refresh();
        }
        self.leave();
        frame
    }

    /// Announce and return the instance this block will read
    fn enter(&mut self) -> usize {
        if self.pair.rewind.swap(false, Ordering::AcqRel) {
            self.cursor = 0;
        }
        loop {
            let index = self.pair.stable.load(Ordering::SeqCst);
            self.pair.reading.store(index, Ordering::SeqCst);
            if self.pair.stable.load(Ordering::SeqCst) == index {
                return index;
            }
        }
    }

    fn leave(&self) {
        self.pair.reading.store(NOT_READING, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_with(len: usize, left: [Sample; 2], right: [Sample; 2]) -> Arc<StereoOutputPair> {
        let pair = Arc::new(StereoOutputPair::new(len));
        for which in 0..2 {
            let instance = pair.instance(which);
            for i in 0..len {
                instance.left.set(i, left[which]);
                instance.right.set(i, right[which]);
            }
        }
        pair
    }

    #[test]
    fn test_reads_only_stable_instance() {
        let pair = pair_with(8, [0.1, 0.2], [-0.1, -0.2]);
        let mut reader = OutputReader::new(Arc::clone(&pair));

        assert_eq!(reader.read_frame(), StereoSample::new(0.1, -0.1));
        pair.publish(1);
        assert_eq!(reader.read_frame(), StereoSample::new(0.2, -0.2));
        assert_eq!(pair.published(), 1);
    }

    #[test]
    fn test_channel_fan_out() {
        let pair = pair_with(64, [0.5, 0.0], [0.25, 0.0]);

        let mut reader = OutputReader::new(Arc::clone(&pair));
        let mut mono = [0.0; 4];
        reader.render(&mut mono, 1);
        assert!(mono.iter().all(|&s| s == 0.375));

        let mut stereo = [0.0; 4];
        reader.render(&mut stereo, 2);
        assert_eq!(stereo, [0.5, 0.25, 0.5, 0.25]);

        let mut surround = [9.0; 8];
        reader.render(&mut surround, 4);
        assert_eq!(surround, [0.5, 0.25, 0.0, 0.0, 0.5, 0.25, 0.0, 0.0]);
    }

    #[test]
    fn test_wrap_raises_refresh_request() {
        let pair = Arc::new(StereoOutputPair::new(10));
        let mut reader = OutputReader::new(Arc::clone(&pair));
        let mut block = [0.0; 2 * 6];

        reader.render(&mut block, 2);
        assert!(!pair.take_refresh_request());
        assert_eq!(reader.cursor(), 6);

        reader.render(&mut block, 2);
        assert_eq!(reader.cursor(), 2);
        assert!(pair.take_refresh_request());
        // Consumed
        assert!(!pair.take_refresh_request());
    }

    #[test]
    fn test_rewind_applies_at_next_block() {
        let pair = Arc::new(StereoOutputPair::new(100));
        let mut reader = OutputReader::new(Arc::clone(&pair));
        let mut block = [0.0; 2 * 30];
        reader.render(&mut block, 2);
        assert_eq!(reader.cursor(), 30);

        pair.request_rewind();
        reader.render(&mut block, 2);
        assert_eq!(reader.cursor(), 30);
    }

    #[test]
    fn test_writer_defers_while_reader_holds_target() {
        let pair = Arc::new(StereoOutputPair::new(4));
        assert_eq!(pair.writable_index(), Some(1));

        // Reader caught instance 0 just before the writer published 1
        pair.reading.store(0, Ordering::SeqCst);
        pair.publish(1);
        assert_eq!(pair.writable_index(), None);

        pair.reading.store(NOT_READING, Ordering::SeqCst);
        assert_eq!(pair.writable_index(), Some(0));
    }

    #[test]
    fn test_reader_releases_after_block() {
        let pair = Arc::new(StereoOutputPair::new(4));
        let mut reader = OutputReader::new(Arc::clone(&pair));
        let mut block = [0.0; 2];
        reader.render(&mut block, 2);
        assert_eq!(pair.reading.load(Ordering::SeqCst), NOT_READING);
        assert_eq!(pair.writable_index(), Some(1));
    }
}
