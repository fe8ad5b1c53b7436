// src/audio/mod.rs

pub mod decoder;
pub mod encoder;
pub mod envelope;
pub mod mixer;
pub mod position;
pub mod sample_math;
pub mod segment;
pub mod sync;
pub mod transcoder;
pub mod types;

// Re-export commonly used items
pub use decoder::{decode_wav, normalize_format};
pub use encoder::{encode_wav, encode_wav_bytes};
pub use envelope::{db_to_linear, ratio_to_db, Fade, SILENCE_DB};
pub use mixer::DEFAULT_CROSSFADE_MS;
pub use position::{frame_count_for, resolve};
pub use segment::Segment;
pub use sync::sync;
pub use transcoder::{DefaultTranscoder, Transcoder};
pub use types::{ExportOptions, PcmSpec, Position, SpecOverrides};
