use thiserror::Error;

/// All possible errors that can occur while building, editing, decoding
/// or exporting audio segments
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to open or read the audio file from disk
    #[error("Failed to open audio file '{path}': {source}")]
    FileOpen {
        path: String,
        source: std::io::Error,
    },

    /// Raw buffer length is not a whole number of frames
    #[error("Malformed PCM buffer: {len} bytes is not a multiple of the frame width ({frame_width})")]
    MalformedInput { len: usize, frame_width: usize },

    /// Sample width outside the supported 1..=4 bytes
    #[error("Unsupported sample width: {0} bytes")]
    UnsupportedSampleWidth(u16),

    /// Channel count or frame rate of zero
    #[error("Invalid PCM format: {0}")]
    InvalidFormat(String),

    /// Slice padding needed more silence than rounding can explain
    #[error("Slice is missing {missing} frames, at most {allowed} (2 ms) may be filled with silence")]
    TooManyMissingFrames { missing: usize, allowed: usize },

    /// A negative fade duration was requested
    #[error("Fade duration must be a positive number of milliseconds, got {0}")]
    InvalidDuration(i64),

    /// start, end and duration were all given to a fade
    #[error("Only two of the three fade arguments \"start\", \"end\" and \"duration\" may be specified")]
    InvalidFadeArguments,

    /// Only mono <-> stereo conversions are supported
    #[error("Unsupported channel conversion: {from} -> {to} channels")]
    UnsupportedChannelConversion { from: u16, to: u16 },

    /// Crossfade window longer than one of the appended segments
    #[error("Crossfade of {crossfade}ms is longer than the segment ({available}ms)")]
    CrossfadeTooLong { crossfade: i64, available: i64 },

    /// Export tags were not a mapping of scalar values
    #[error("Invalid tags: {0}")]
    InvalidTag(String),

    /// ID3v2 version not accepted by the mp3 encoder
    #[error("id3v2_version '{version}' not allowed, allowed versions: {allowed:?}")]
    InvalidTagVersion {
        version: String,
        allowed: &'static [&'static str],
    },

    /// The audio format is not supported by symphonia
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Error occurred while decoding the audio data
    #[error("Audio decoding failed: {0}")]
    DecodeFailed(String),

    /// Error occurred while encoding the output
    #[error("Audio encoding failed: {0}")]
    EncodeFailed(String),

    /// Error from the rubato resampler
    #[error("Resampling failed: {0}")]
    Resample(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from hound WAV reader/writer
    #[error("Hound WAV error: {0}")]
    Hound(#[from] hound::Error),
}

/// Convenient Result type that uses our AudioError
pub type Result<T> = std::result::Result<T, AudioError>;
