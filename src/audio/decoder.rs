// src/audio/decoder.rs

use dasp::sample::Sample;
use hound::{SampleFormat, WavReader};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::audio::segment::Segment;
use crate::audio::types::PcmSpec;
use crate::error::{AudioError, Result};

/// File extensions that name the same container under another name
const FORMAT_ALIASES: &[(&str, &str)] = &[("m4a", "mp4")];

/// Lowercase a format name and resolve known aliases
pub fn normalize_format(format: &str) -> String {
    let format = format.trim_start_matches('.').to_ascii_lowercase();
    FORMAT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == format)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(format)
}

/// Check for a RIFF/WAVE header
pub fn is_wav_data(input: &[u8]) -> bool {
    input.len() >= 12 && &input[..4] == b"RIFF" && &input[8..12] == b"WAVE"
}

/// Decode a WAV file held in memory, keeping its integer sample width
///
/// 8, 16, 24 and 32-bit integer WAVs keep their width. 32-bit float WAVs
/// are converted to 32-bit integers.
pub fn decode_wav(input: &[u8]) -> Result<Segment> {
    let mut reader = WavReader::new(Cursor::new(input))
        .map_err(|e| AudioError::DecodeFailed(format!("Failed to open WAV: {}", e)))?;

    let spec = reader.spec();
    let mut data = Vec::with_capacity(input.len());

    let sample_width = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => {
            for sample in reader.samples::<i8>() {
                data.push(sample? as u8);
            }
            1
        }
        (SampleFormat::Int, 16) => {
            for sample in reader.samples::<i16>() {
                data.extend_from_slice(&sample?.to_le_bytes());
            }
            2
        }
        (SampleFormat::Int, 24) => {
            for sample in reader.samples::<i32>() {
                data.extend_from_slice(&sample?.to_le_bytes()[..3]);
            }
            3
        }
        (SampleFormat::Int, 32) => {
            for sample in reader.samples::<i32>() {
                data.extend_from_slice(&sample?.to_le_bytes());
            }
            4
        }
        (SampleFormat::Float, 32) => {
            for sample in reader.samples::<f32>() {
                let sample = sample?.clamp(-1.0, 1.0);
                data.extend_from_slice(&sample.to_sample::<i32>().to_le_bytes());
            }
            4
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{}-bit {:?} WAV",
                bits, format
            )))
        }
    };

    debug!(
        "Decoded WAV: {} channels, {} bytes/sample, {}Hz",
        spec.channels, sample_width, spec.sample_rate
    );

    Segment::new(data, PcmSpec::new(spec.channels, sample_width, spec.sample_rate))
}

/// Decode any container/codec symphonia understands into integer PCM
///
/// Codecs with more than 16 bits per sample decode to 32-bit samples,
/// everything else (including lossy codecs) to 16-bit.
pub fn decode_with_symphonia(input: Vec<u8>, format_hint: Option<&str>) -> Result<Segment> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(input)), Default::default());

    // Create a hint to help symphonia detect the format
    let mut hint = Hint::new();
    if let Some(extension) = format_hint {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    // Find the default audio track (skip video/subtitle tracks)
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::DecodeFailed("No audio track found".to_string()))?;

    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::DecodeFailed("Sample rate not found".to_string()))?;

    let wide = track
        .codec_params
        .bits_per_sample
        .map(|bits| bits > 16)
        .unwrap_or(false);

    // Channels may be missing from the metadata of some MP3s
    let mut channels_opt = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeFailed(format!("Failed to create decoder: {}", e)))?;

    let mut data = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(_) => break, // End of stream
        };

        // Skip packets from other tracks (e.g., video, album art)
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| AudioError::DecodeFailed(format!("Decode error: {}", e)))?;

        let spec = *decoded.spec();
        channels_opt.get_or_insert(spec.channels.count() as u16);

        if wide {
            let mut buf = SampleBuffer::<i32>::new(decoded.capacity() as u64, spec);
            buf.copy_interleaved_ref(decoded);
            for sample in buf.samples() {
                data.extend_from_slice(&sample.to_le_bytes());
            }
        } else {
            let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
            buf.copy_interleaved_ref(decoded);
            for sample in buf.samples() {
                data.extend_from_slice(&sample.to_le_bytes());
            }
        }
    }

    let channels = channels_opt
        .ok_or_else(|| AudioError::DecodeFailed("Could not determine channel count".to_string()))?;
    let sample_width = if wide { 4 } else { 2 };

    debug!(
        "Decoded {:?}: {} channels, {} bytes/sample, {}Hz",
        format_hint, channels, sample_width, sample_rate
    );

    Segment::new(data, PcmSpec::new(channels, sample_width, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{WavSpec, WavWriter};

    fn wav_bytes<S: hound::Sample + Copy>(spec: WavSpec, samples: &[S]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for &sample in samples {
                writer.write_sample(sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_normalize_format() {
        assert_eq!(normalize_format("M4A"), "mp4");
        assert_eq!(normalize_format(".mp3"), "mp3");
        assert_eq!(normalize_format("wav"), "wav");
    }

    #[test]
    fn test_decode_16_bit_wav() {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[1i16, -1, 300, -300]);
        assert!(is_wav_data(&bytes));

        let segment = decode_wav(&bytes).unwrap();
        assert_eq!(segment.channels(), 2);
        assert_eq!(segment.sample_width(), 2);
        assert_eq!(segment.frame_rate(), 8000);
        assert_eq!(segment.frame_count(), 2);
        assert_eq!(&segment.data()[..4], &[1, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn test_decode_8_and_24_bit_wav() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 8,
            sample_format: SampleFormat::Int,
        };
        let segment = decode_wav(&wav_bytes(spec, &[-5i8, 5])).unwrap();
        assert_eq!(segment.sample_width(), 1);
        assert_eq!(segment.data(), &[0xFB, 5]);

        let spec = WavSpec {
            bits_per_sample: 24,
            ..spec
        };
        let segment = decode_wav(&wav_bytes(spec, &[-2i32, 0x123456])).unwrap();
        assert_eq!(segment.sample_width(), 3);
        assert_eq!(segment.data(), &[0xFE, 0xFF, 0xFF, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_decode_float_wav_as_32_bit() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let segment = decode_wav(&wav_bytes(spec, &[0.0f32, 0.5, -0.5])).unwrap();
        assert_eq!(segment.sample_width(), 4);
        assert_eq!(segment.frame_count(), 3);
        assert!(segment.max() > 1 << 29);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(decode_wav(b"definitely not audio").is_err());
        assert!(decode_with_symphonia(b"definitely not audio".to_vec(), None).is_err());
    }

    #[test]
    fn test_symphonia_decodes_wav() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let samples: Vec<i16> = (0..800).map(|i| (i * 10) as i16).collect();
        let segment = decode_with_symphonia(wav_bytes(spec, &samples), Some("wav")).unwrap();

        assert_eq!(segment.sample_width(), 2);
        assert_eq!(segment.frame_rate(), 8000);
        assert_eq!(segment.len_ms(), 100);
    }
}
