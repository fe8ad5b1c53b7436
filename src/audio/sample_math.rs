// src/audio/sample_math.rs
//! Sample arithmetic on raw PCM byte buffers
//!
//! Every function takes interleaved, frame-aligned buffers of signed
//! little-endian samples tagged with their width in bytes (1..=4).
//! Arithmetic saturates at the limits of the sample width.

use dasp::sample::{Sample, I24};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

use crate::audio::position::duration_ms;
use crate::error::{AudioError, Result};

/// Smallest and largest value a sample of `width` bytes can hold
pub fn sample_bounds(width: u16) -> (i64, i64) {
    let bits = width as u32 * 8;
    (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
}

/// Read the sample starting at `bytes[0]`
fn read_sample(bytes: &[u8], width: usize) -> i64 {
    match width {
        1 => bytes[0] as i8 as i64,
        2 => i16::from_le_bytes([bytes[0], bytes[1]]) as i64,
        3 => {
            // sign-extend from bit 23
            let raw = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]);
            (raw >> 8) as i64
        }
        _ => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as i64,
    }
}

/// Append `value` to `out` using `width` bytes; `value` must be in range
fn write_sample(out: &mut Vec<u8>, value: i64, width: usize) {
    let le = (value as i32).to_le_bytes();
    out.extend_from_slice(&le[..width]);
}

fn samples(buf: &[u8], width: u16) -> impl Iterator<Item = i64> + '_ {
    let width = width as usize;
    buf.chunks_exact(width).map(move |s| read_sample(s, width))
}

/// Multiply every sample by `factor`, truncating toward zero
pub fn scalar_multiply(buf: &[u8], width: u16, factor: f64) -> Vec<u8> {
    let (min, max) = sample_bounds(width);
    let mut out = Vec::with_capacity(buf.len());

    for sample in samples(buf, width) {
        let scaled = (sample as f64 * factor).clamp(min as f64, max as f64);
        write_sample(&mut out, scaled as i64, width as usize);
    }

    out
}

/// Add two buffers sample by sample
///
/// The result is as long as the shorter input.
pub fn additive_mix(a: &[u8], b: &[u8], width: u16) -> Vec<u8> {
    let (min, max) = sample_bounds(width);
    let mut out = Vec::with_capacity(a.len().min(b.len()));

    for (x, y) in samples(a, width).zip(samples(b, width)) {
        write_sample(&mut out, (x + y).clamp(min, max), width as usize);
    }

    out
}

/// Convert between mono and stereo
///
/// Mono -> stereo copies each sample to both channels. Stereo -> mono sums
/// the two channels (saturating). Any other pair is rejected.
pub fn channel_convert(buf: &[u8], width: u16, from: u16, to: u16) -> Result<Vec<u8>> {
    let w = width as usize;

    match (from, to) {
        (a, b) if a == b => Ok(buf.to_vec()),
        (1, 2) => {
            let mut out = Vec::with_capacity(buf.len() * 2);
            for sample in buf.chunks_exact(w) {
                out.extend_from_slice(sample);
                out.extend_from_slice(sample);
            }
            Ok(out)
        }
        (2, 1) => {
            let (min, max) = sample_bounds(width);
            let mut out = Vec::with_capacity(buf.len() / 2);
            for frame in buf.chunks_exact(w * 2) {
                let left = read_sample(&frame[..w], w);
                let right = read_sample(&frame[w..], w);
                write_sample(&mut out, (left + right).clamp(min, max), w);
            }
            Ok(out)
        }
        _ => Err(AudioError::UnsupportedChannelConversion { from, to }),
    }
}

/// Change the sample width, keeping each sample's level relative to full scale
pub fn convert_width(buf: &[u8], from: u16, to: u16) -> Vec<u8> {
    if from == to {
        return buf.to_vec();
    }

    let shift = (to as i32 - from as i32) * 8;
    let mut out = Vec::with_capacity(buf.len() / from as usize * to as usize);

    for sample in samples(buf, from) {
        let value = if shift > 0 { sample << shift } else { sample >> -shift };
        write_sample(&mut out, value, to as usize);
    }

    out
}

/// Largest absolute sample value
pub fn peak(buf: &[u8], width: u16) -> i64 {
    samples(buf, width).map(|s| s.abs()).max().unwrap_or(0)
}

/// Root mean square of all samples, truncated to an integer
pub fn rms(buf: &[u8], width: u16) -> i64 {
    let count = buf.len() / width as usize;
    if count == 0 {
        return 0;
    }

    let sum: f64 = samples(buf, width).map(|s| (s as f64) * (s as f64)).sum();
    (sum / count as f64).sqrt() as i64
}

/// Reverse the order of frames, keeping each frame's bytes intact
pub fn reverse_frames(buf: &[u8], frame_width: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(buf.len());
    for frame in buf.chunks_exact(frame_width).rev() {
        out.extend_from_slice(frame);
    }
    out
}

/// Frame count at `to_rate` with the same millisecond duration as
/// `frames` at `from_rate`
///
/// The proportional count is moved into the range of counts whose rounded
/// duration equals the source's. Below 1kHz that range can be empty and
/// the proportional count is kept.
pub fn resampled_frame_count(frames: usize, from_rate: u32, to_rate: u32) -> usize {
    let exact = frames as u128 * to_rate as u128;
    // round half up
    let proportional = (2 * exact + from_rate as u128) / (2 * from_rate as u128);

    // duration_ms(f, rate) == ms  <=>  rate * (2ms - 1) <= 2000f < rate * (2ms + 1)
    let ms = duration_ms(frames, from_rate) as u128;
    let rate = to_rate as u128;
    let lowest = if ms == 0 { 0 } else { (rate * (2 * ms - 1)).div_ceil(2000) };
    let highest = (rate * (2 * ms + 1)).div_ceil(2000).saturating_sub(1);

    if lowest > highest {
        return proportional as usize;
    }
    proportional.clamp(lowest, highest) as usize
}

/// Convert the frame rate of an interleaved buffer
///
/// Uses rubato's polynomial interpolator. The output always holds exactly
/// `resampled_frame_count(frames, from_rate, to_rate)` frames: the
/// resampler delay is skipped and any shortfall at the tail is filled by
/// repeating the last frame.
pub fn resample(
    buf: &[u8],
    width: u16,
    channels: u16,
    from_rate: u32,
    to_rate: u32,
) -> Result<Vec<u8>> {
    let num_channels = channels as usize;
    let frame_width = width as usize * num_channels;
    let input_frames = buf.len() / frame_width;

    if from_rate == to_rate || input_frames == 0 {
        return Ok(buf.to_vec());
    }

    let target_frames = resampled_frame_count(input_frames, from_rate, to_rate);

    debug!(
        "Resampling {} frames from {}Hz to {}Hz ({} channels) -> {} frames",
        input_frames, from_rate, to_rate, channels, target_frames
    );

    let planar_input = deinterleave(buf, width, channels);

    let mut resampler = FastFixedIn::<f32>::new(
        to_rate as f64 / from_rate as f64,
        1.0,
        PolynomialDegree::Cubic,
        input_frames,
        num_channels,
    )
    .map_err(|e| AudioError::Resample(format!("Failed to create resampler: {}", e)))?;

    let delay = resampler.output_delay();

    let mut planar_output = resampler
        .process(&planar_input, None)
        .map_err(|e| AudioError::Resample(e.to_string()))?;

    // flush the samples still held back by the interpolator
    let tail = resampler
        .process_partial(None::<&[Vec<f32>]>, None)
        .map_err(|e| AudioError::Resample(e.to_string()))?;
    for (channel, rest) in planar_output.iter_mut().zip(tail) {
        channel.extend(rest);
    }

    for channel in planar_output.iter_mut() {
        let skip = delay.min(channel.len());
        channel.drain(..skip);
        let last = channel.last().copied().unwrap_or(0.0);
        channel.resize(target_frames, last);
    }

    Ok(interleave(&planar_output, width))
}

/// Split interleaved PCM into one f32 plane per channel
fn deinterleave(buf: &[u8], width: u16, channels: u16) -> Vec<Vec<f32>> {
    let num_channels = channels as usize;
    let num_frames = buf.len() / (width as usize * num_channels);
    let mut planar = vec![Vec::with_capacity(num_frames); num_channels];

    for (idx, sample) in samples(buf, width).enumerate() {
        planar[idx % num_channels].push(to_f32(sample, width));
    }

    planar
}

/// Join f32 planes back into interleaved PCM of the given width
fn interleave(planar: &[Vec<f32>], width: u16) -> Vec<u8> {
    if planar.is_empty() {
        return Vec::new();
    }

    let num_frames = planar[0].len();
    let mut out = Vec::with_capacity(num_frames * planar.len() * width as usize);

    for frame_idx in 0..num_frames {
        for plane in planar {
            write_sample(&mut out, from_f32(plane[frame_idx], width), width as usize);
        }
    }

    out
}

fn to_f32(sample: i64, width: u16) -> f32 {
    match width {
        1 => (sample as i8).to_sample::<f32>(),
        2 => (sample as i16).to_sample::<f32>(),
        3 => I24::new_unchecked(sample as i32).to_sample::<f32>(),
        _ => (sample as i32).to_sample::<f32>(),
    }
}

fn from_f32(sample: f32, width: u16) -> i64 {
    let sample = sample.clamp(-1.0, 1.0);
    match width {
        1 => sample.to_sample::<i8>() as i64,
        2 => sample.to_sample::<i16>() as i64,
        3 => sample.to_sample::<I24>().inner() as i64,
        _ => sample.to_sample::<i32>() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm16(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn read16(buf: &[u8]) -> Vec<i16> {
        buf.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn test_scalar_multiply_saturates() {
        let buf = pcm16(&[1000, -1000, 30000]);
        let out = scalar_multiply(&buf, 2, 2.0);
        assert_eq!(read16(&out), vec![2000, -2000, i16::MAX]);
    }

    #[test]
    fn test_scalar_multiply_by_zero_is_silence() {
        let buf = pcm16(&[1234, -4321]);
        assert_eq!(read16(&scalar_multiply(&buf, 2, 0.0)), vec![0, 0]);
    }

    #[test]
    fn test_additive_mix_clamps_and_truncates() {
        let a = pcm16(&[100, 30000, -30000]);
        let b = pcm16(&[50, 10000]);
        assert_eq!(read16(&additive_mix(&a, &b, 2)), vec![150, i16::MAX]);
    }

    #[test]
    fn test_24_bit_samples_keep_their_sign() {
        let buf = vec![0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x40];
        assert_eq!(peak(&buf, 3), 0x400000);
        let doubled = scalar_multiply(&buf, 3, 2.0);
        assert_eq!(&doubled[..3], &[0xFE, 0xFF, 0xFF]);
    }

    #[test]
    fn test_channel_convert_mono_stereo() {
        let mono = pcm16(&[1, 2, 3]);
        let stereo = channel_convert(&mono, 2, 1, 2).unwrap();
        assert_eq!(read16(&stereo), vec![1, 1, 2, 2, 3, 3]);

        let back = channel_convert(&stereo, 2, 2, 1).unwrap();
        assert_eq!(read16(&back), vec![2, 4, 6]);
    }

    #[test]
    fn test_channel_convert_rejects_surround() {
        let result = channel_convert(&[0; 12], 2, 6, 2);
        assert!(matches!(
            result,
            Err(AudioError::UnsupportedChannelConversion { from: 6, to: 2 })
        ));
    }

    #[test]
    fn test_convert_width() {
        let buf = pcm16(&[256, -256, i16::MAX]);
        let narrow = convert_width(&buf, 2, 1);
        assert_eq!(narrow, vec![1, 0xFF, 0x7F]);

        let wide = convert_width(&narrow, 1, 2);
        assert_eq!(read16(&wide), vec![256, -256, 0x7F00]);
    }

    #[test]
    fn test_rms_and_peak() {
        let buf = pcm16(&[3, -4, 3, -4]);
        assert_eq!(peak(&buf, 2), 4);
        assert_eq!(rms(&buf, 2), 3);
        assert_eq!(rms(&[], 2), 0);
    }

    #[test]
    fn test_reverse_frames_keeps_frame_bytes() {
        let stereo = pcm16(&[1, 2, 3, 4]);
        assert_eq!(read16(&reverse_frames(&stereo, 4)), vec![3, 4, 1, 2]);
    }

    #[test]
    fn test_resample_produces_exact_frame_count() {
        let input = pcm16(&vec![1000; 800]);
        let out = resample(&input, 2, 1, 8000, 44100).unwrap();
        assert_eq!(out.len() / 2, resampled_frame_count(800, 8000, 44100));
        assert_eq!(out.len() / 2, 4410);

        let stereo = pcm16(&vec![0; 2 * 441]);
        let down = resample(&stereo, 2, 2, 44100, 8000).unwrap();
        assert_eq!(down.len() / 4, 80);
    }

    #[test]
    fn test_resampled_frame_count_keeps_rounded_duration() {
        // 0.5ms rounds up to 1ms; 22 frames at 44.1kHz would round down to 0
        assert_eq!(resampled_frame_count(4, 8000, 44100), 23);
        assert_eq!(duration_ms(23, 44100), 1);
        assert_eq!(resampled_frame_count(3, 8000, 44100), 17);
        assert_eq!(resampled_frame_count(0, 8000, 44100), 0);
    }

    #[test]
    fn test_resample_constant_signal_stays_close() {
        let input = pcm16(&vec![8000; 1600]);
        let out = resample(&input, 2, 1, 8000, 16000).unwrap();
        let middle = read16(&out)[1600];
        assert!((middle as i32 - 8000).abs() < 200, "got {}", middle);
    }
}
