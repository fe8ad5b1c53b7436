// src/audio/transcoder.rs
//! Conversion between encoded audio and segments

use std::path::Path;

use tracing::debug;

use crate::audio::decoder::{decode_wav, decode_with_symphonia, is_wav_data, normalize_format};
use crate::audio::encoder::{converter_args, encode_wav_bytes, run_converter};
use crate::audio::segment::Segment;
use crate::audio::types::ExportOptions;
use crate::config::TranscoderConfig;
use crate::error::{AudioError, Result};

/// Turns encoded audio into segments and back
pub trait Transcoder {
    /// Decode `input` into a segment; `format_hint` is a file extension
    /// such as "mp3" (auto-detected when `None`)
    fn decode(&self, input: &[u8], format_hint: Option<&str>) -> Result<Segment>;

    /// Encode `segment` as `format` (e.g., "wav", "mp3", "ogg")
    fn encode(&self, segment: &Segment, format: &str, options: &ExportOptions) -> Result<Vec<u8>>;

    /// Read and decode a file, using its extension as the hint
    fn decode_file(&self, path: &Path, format_hint: Option<&str>) -> Result<Segment> {
        let input = std::fs::read(path).map_err(|e| AudioError::FileOpen {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let extension = path.extension().and_then(|e| e.to_str());
        self.decode(&input, format_hint.or(extension))
    }

    /// Encode a segment and write it to `path`
    fn export_file(&self, segment: &Segment, path: &Path, format: &str, options: &ExportOptions) -> Result<()> {
        let output = self.encode(segment, format, options)?;
        std::fs::write(path, output)?;
        Ok(())
    }
}

/// WAV through hound, other inputs through symphonia, other outputs
/// through an ffmpeg-compatible converter process
///
/// # Example
/// ```
/// use audioseg_lib::audio::{DefaultTranscoder, ExportOptions, PcmSpec, Segment, Transcoder};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transcoder = DefaultTranscoder::default();
/// let audio = Segment::new(vec![0; 800], PcmSpec::new(1, 2, 8000))?;
///
/// let wav = transcoder.encode(&audio, "wav", &ExportOptions::default())?;
/// let decoded = transcoder.decode(&wav, None)?;
/// assert_eq!(decoded, audio);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DefaultTranscoder {
    config: TranscoderConfig,
}

impl DefaultTranscoder {
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }
}

impl Transcoder for DefaultTranscoder {
    fn decode(&self, input: &[u8], format_hint: Option<&str>) -> Result<Segment> {
        let format = format_hint.map(normalize_format);

        match format.as_deref() {
            Some("wav") => decode_wav(input),
            None if is_wav_data(input) => decode_wav(input),
            other => decode_with_symphonia(input.to_vec(), other),
        }
    }

    fn encode(&self, segment: &Segment, format: &str, options: &ExportOptions) -> Result<Vec<u8>> {
        let format = normalize_format(format);

        // wav needs no converter
        if format == "wav" {
            return encode_wav_bytes(segment);
        }

        let args = converter_args(&format, options)?;
        let wav = encode_wav_bytes(segment)?;

        debug!("Exporting {}ms as {} via {}", segment.len_ms(), format, self.config.converter);
        run_converter(&self.config.converter, &args, wav)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::PcmSpec;

    fn test_segment() -> Segment {
        let data = (0..1600i16).flat_map(|v| v.to_le_bytes()).collect();
        Segment::new(data, PcmSpec::new(2, 2, 8000)).unwrap()
    }

    #[test]
    fn test_wav_round_trip_with_and_without_hint() {
        let transcoder = DefaultTranscoder::default();
        let segment = test_segment();

        let wav = transcoder.encode(&segment, "WAV", &ExportOptions::default()).unwrap();
        assert_eq!(transcoder.decode(&wav, None).unwrap(), segment);
        assert_eq!(transcoder.decode(&wav, Some("wav")).unwrap(), segment);
    }

    #[test]
    fn test_file_round_trip() {
        let transcoder = DefaultTranscoder::default();
        let segment = test_segment();
        let path = std::env::temp_dir().join("audioseg_transcoder_round_trip.wav");

        transcoder
            .export_file(&segment, &path, "wav", &ExportOptions::default())
            .unwrap();
        let decoded = transcoder.decode_file(&path, None).unwrap();
        assert_eq!(decoded, segment);
        assert_eq!(decoded.spec(), segment.spec());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file() {
        let transcoder = DefaultTranscoder::default();
        let result = transcoder.decode_file(Path::new("/nonexistent/audioseg.mp3"), None);
        assert!(matches!(result, Err(AudioError::FileOpen { .. })));
    }

    #[test]
    fn test_invalid_tags_fail_before_converting() {
        let transcoder = DefaultTranscoder::new(TranscoderConfig {
            converter: "audioseg-no-such-converter".to_string(),
        });
        let options = ExportOptions {
            tags: Some(serde_json::json!(42)),
            ..Default::default()
        };
        let result = transcoder.encode(&test_segment(), "mp3", &options);
        assert!(matches!(result, Err(AudioError::InvalidTag(_))));
    }

    #[test]
    fn test_undecodable_input() {
        let transcoder = DefaultTranscoder::default();
        assert!(transcoder.decode(b"\x00\x01\x02 not audio", Some("mp3")).is_err());
    }
}
