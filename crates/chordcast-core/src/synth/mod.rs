//! Sound sources: buffer sizing, chord policies, the tone and noise layers
//! and the calibration reference tone

pub mod chord;
pub mod noise;
pub mod reference;
pub mod sizing;
pub mod tone;

pub use chord::{ChordPolicy, ChordSet};
pub use noise::{NoiseSynthesizer, DEFAULT_NOISE_AMPLITUDE, DEFAULT_NOISE_SEED};
pub use reference::{
    reference_channel, ReferenceFeeder, ReferenceReader, ReferenceTone, DEFAULT_LEAD_CHUNKS,
    SAMPLES_PER_CHUNK,
};
pub use sizing::{subunit_size, DeviceParams};
pub use tone::{ToneMode, ToneSynthesizer};
