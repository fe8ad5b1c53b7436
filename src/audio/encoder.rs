// src/audio/encoder.rs

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, warn};

use crate::audio::segment::Segment;
use crate::audio::types::{ExportOptions, ID3V2_ALLOWED_VERSIONS};
use crate::error::{AudioError, Result};

fn wav_spec(segment: &Segment) -> WavSpec {
    WavSpec {
        channels: segment.channels(),
        sample_rate: segment.frame_rate(),
        bits_per_sample: segment.sample_width() * 8,
        sample_format: SampleFormat::Int,
    }
}

fn write_samples<W: Write + Seek>(writer: &mut WavWriter<W>, segment: &Segment) -> Result<()> {
    let width = segment.sample_width() as usize;

    for sample in segment.data().chunks_exact(width) {
        match width {
            1 => writer.write_sample(sample[0] as i8)?,
            2 => writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?,
            3 => writer.write_sample(i32::from_le_bytes([0, sample[0], sample[1], sample[2]]) >> 8)?,
            _ => writer.write_sample(i32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]))?,
        }
    }

    Ok(())
}

/// Encode a segment to a WAV file on disk
///
/// The WAV keeps the segment's channel count, rate and integer sample width.
///
/// # Example
/// ```
/// use audioseg_lib::audio::{encode_wav, PcmSpec, Segment};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let audio = Segment::new(vec![0, 0, 0x10, 0, 0xF0, 0xFF], PcmSpec::new(1, 2, 44100))?;
///
/// # let temp_dir = std::env::temp_dir();
/// # let output_path = temp_dir.join("doc_encode_wav.wav");
/// encode_wav(&audio, &output_path)?;
/// # std::fs::remove_file(&output_path).ok();
/// # Ok(())
/// # }
/// ```
pub fn encode_wav<P: AsRef<Path>>(segment: &Segment, output_path: P) -> Result<()> {
    let mut writer = WavWriter::create(output_path, wav_spec(segment))?;
    write_samples(&mut writer, segment)?;

    // Finalize the file (writes headers, etc.)
    writer.finalize()?;

    Ok(())
}

/// Encode a segment to WAV bytes in memory
pub fn encode_wav_bytes(segment: &Segment) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::with_capacity(segment.data().len() + 44));
    {
        let mut writer = WavWriter::new(&mut cursor, wav_spec(segment))?;
        write_samples(&mut writer, segment)?;
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Build the converter arguments that turn WAV on stdin into `format` on stdout
///
/// Arguments follow ffmpeg conventions. Tags are validated here, before
/// anything runs.
pub fn converter_args(format: &str, options: &ExportOptions) -> Result<Vec<String>> {
    let mut args: Vec<String> = ["-y", "-f", "wav", "-i", "pipe:0"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if format == "ogg" && options.codec.is_none() {
        args.extend(["-acodec".to_string(), "libvorbis".to_string()]);
    }

    if let Some(codec) = &options.codec {
        // force audio encoder
        args.extend(["-acodec".to_string(), codec.clone()]);
    }

    if let Some(bitrate) = &options.bitrate {
        args.extend(["-b:a".to_string(), bitrate.clone()]);
    }

    args.extend(options.parameters.iter().cloned());

    if let Some(tags) = options.tag_map()? {
        for (key, value) in tags {
            args.extend(["-metadata".to_string(), format!("{}={}", key, value)]);
        }

        if format == "mp3" {
            if !ID3V2_ALLOWED_VERSIONS.contains(&options.id3v2_version.as_str()) {
                return Err(AudioError::InvalidTagVersion {
                    version: options.id3v2_version.clone(),
                    allowed: ID3V2_ALLOWED_VERSIONS,
                });
            }
            args.extend(["-id3v2_version".to_string(), options.id3v2_version.clone()]);
        }
    }

    args.extend(["-f".to_string(), format.to_string(), "pipe:1".to_string()]);

    Ok(args)
}

/// Run the external converter, feeding `input` on stdin and collecting stdout
pub fn run_converter(converter: &str, args: &[String], input: Vec<u8>) -> Result<Vec<u8>> {
    debug!("Running {} {}", converter, args.join(" "));

    let mut child = Command::new(converter)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| AudioError::EncodeFailed(format!("Failed to start '{}': {}", converter, e)))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| AudioError::EncodeFailed("Converter stdin unavailable".to_string()))?;

    // feed stdin from another thread so a full stdout pipe can't deadlock us
    let feeder = thread::spawn(move || stdin.write_all(&input));

    let output = child.wait_with_output()?;
    let fed = feeder
        .join()
        .map_err(|_| AudioError::EncodeFailed("Converter input thread panicked".to_string()))?;

    if !output.status.success() {
        warn!("{} exited with {}", converter, output.status);
        return Err(AudioError::EncodeFailed(format!(
            "'{}' exited with {}",
            converter, output.status
        )));
    }
    fed?;

    Ok(output.stdout)
}
