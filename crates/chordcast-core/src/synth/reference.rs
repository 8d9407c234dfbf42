//! Reference tone for calibrating output level and latency
//!
//! A plain phase-continuous sine, produced ahead of the reader in fixed
//! chunks and handed to the audio callback through a lock-free SPSC ring.
//!
//! ```text
//! ┌──────────────────┐  push() chunks  ┌──────────────────┐  pop() per frame
//! │ ReferenceFeeder  │────────────────►│   rtrb ring      │────────────────► ReferenceReader
//! │ (control loop)   │                 │ lead × 1024 smp  │                  (audio thread)
//! └──────────────────┘                 └──────────────────┘
//! ```
//!
//! The reader plays silence on underrun instead of waiting for the feeder.

use std::f64::consts::TAU;

use crate::types::Sample;

/// Samples generated per feeder step
pub const SAMPLES_PER_CHUNK: usize = 1024;

/// Chunks kept queued ahead of the reader by default
pub const DEFAULT_LEAD_CHUNKS: usize = 10;

/// Phase-continuous sine generator
#[derive(Debug, Clone)]
pub struct ReferenceTone {
    frequency: f64,
    sample_rate: u32,
    /// Index of the next sample to generate
    time_offset: u64,
}

impl ReferenceTone {
    pub fn new(frequency: f64, sample_rate: u32) -> Self {
        Self {
            frequency,
            sample_rate,
            time_offset: 0,
        }
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Fill `out` and advance the time origin by its length
    pub fn fill(&mut self, out: &mut [Sample]) {
        let rate = self.sample_rate as f64;
        for (i, sample) in out.iter_mut().enumerate() {
            let t = (self.time_offset + i as u64) as f64 / rate;
            *sample = (TAU * self.frequency * t).sin() as Sample;
        }
        self.time_offset += out.len() as u64;
    }
}

/// Create a feeder/reader pair holding up to `lead_chunks` chunks in flight
pub fn reference_channel(tone: ReferenceTone, lead_chunks: usize) -> (ReferenceFeeder, ReferenceReader) {
    let capacity = lead_chunks.max(1) * SAMPLES_PER_CHUNK;
    let (producer, consumer) = rtrb::RingBuffer::<Sample>::new(capacity);
    log::debug!(
        "Reference tone ring created: {:.1}Hz, capacity {} samples",
        tone.frequency(),
        capacity
    );
    (
        ReferenceFeeder {
            tone,
            producer,
            chunk: vec![0.0; SAMPLES_PER_CHUNK],
        },
        ReferenceReader { consumer },
    )
}

/// Control-loop side: keeps the ring topped up
pub struct ReferenceFeeder {
    tone: ReferenceTone,
    producer: rtrb::Producer<Sample>,
    chunk: Vec<Sample>,
}

impl ReferenceFeeder {
    /// Generate whole chunks while the ring has room; returns chunks pushed
    pub fn pump(&mut self) -> usize {
        let mut pushed = 0;
        while self.producer.slots() >= SAMPLES_PER_CHUNK {
            self.tone.fill(&mut self.chunk);
            for &sample in &self.chunk {
                if self.producer.push(sample).is_err() {
                    break;
                }
            }
            pushed += 1;
        }
        pushed
    }
}

/// Audio-thread side: one sample per frame, duplicated to every channel
pub struct ReferenceReader {
    consumer: rtrb::Consumer<Sample>,
}

impl ReferenceReader {
    pub fn render(&mut self, data: &mut [Sample], channels: usize) {
        for frame in data.chunks_mut(channels.max(1)) {
            let sample = self.consumer.pop().unwrap_or(0.0);
            frame.fill(sample);
        }
    }

    /// Samples queued and ready for the callback
    pub fn available(&self) -> usize {
        self.consumer.slots()
    }
}
