// src/audio/envelope.rs
//! Fade envelopes
//!
//! A fade splits the segment into a flat head at `from_gain`, a linear
//! ramp in amplitude space, and a flat tail at `to_gain`. Ramps longer
//! than 100ms step once per millisecond; shorter ones step once per frame
//! to avoid audible zipper noise.

use tracing::debug;

use crate::audio::position::{frame_count_for, resolve};
use crate::audio::sample_math;
use crate::audio::segment::Segment;
use crate::audio::types::{Position, SpecOverrides};
use crate::error::{AudioError, Result};

/// Ramps longer than this (in ms) use one gain step per millisecond
pub const COARSE_FADE_THRESHOLD_MS: i64 = 100;

/// Gain used for "silent" ends of fades and crossfades
pub const SILENCE_DB: f64 = -120.0;

/// Convert decibels to a linear amplitude ratio
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Convert a linear amplitude ratio to decibels
pub fn ratio_to_db(ratio: f64) -> f64 {
    20.0 * ratio.log10()
}

/// Parameters of a volume fade
///
/// At most two of `start`, `end` and `duration` may be given; the third is
/// derived. Omitted bounds default to the start and end of the segment.
///
/// # Example
/// ```
/// use audioseg_lib::audio::{Fade, PcmSpec, Position, Segment};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let audio = Segment::new(vec![0x10; 16000], PcmSpec::new(1, 2, 8000))?;
///
/// // Duck the last half second by 12dB over 200ms
/// let ducked = audio.fade(
///     Fade::new()
///         .to_gain(-12.0)
///         .end(Position::Unbounded)
///         .duration(200),
/// )?;
/// assert_eq!(ducked.len_ms(), audio.len_ms());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fade {
    /// Volume change at the end of the ramp, in dB
    pub to_gain: f64,

    /// Volume change at the start of the ramp, in dB
    pub from_gain: f64,

    pub start: Option<Position>,
    pub end: Option<Position>,

    /// Ramp length in milliseconds
    pub duration: Option<i64>,
}

impl Fade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_gain(mut self, db: f64) -> Self {
        self.to_gain = db;
        self
    }

    pub fn from_gain(mut self, db: f64) -> Self {
        self.from_gain = db;
        self
    }

    pub fn start(mut self, position: impl Into<Position>) -> Self {
        self.start = Some(position.into());
        self
    }

    pub fn end(mut self, position: impl Into<Position>) -> Self {
        self.end = Some(position.into());
        self
    }

    pub fn duration(mut self, ms: i64) -> Self {
        self.duration = Some(ms);
        self
    }
}

impl Segment {
    /// Apply a volume fade
    ///
    /// The result always has exactly as many frames as this segment.
    /// A fade from 0dB to 0dB returns this segment unchanged.
    pub fn fade(&self, fade: Fade) -> Result<Segment> {
        if fade.start.is_some() && fade.end.is_some() && fade.duration.is_some() {
            return Err(AudioError::InvalidFadeArguments);
        }

        // no fade == the same audio
        if fade.to_gain == 0.0 && fade.from_gain == 0.0 {
            return Ok(self.clone());
        }

        if let Some(duration) = fade.duration {
            if duration < 0 {
                return Err(AudioError::InvalidDuration(duration));
            }
        }

        let (start, end) = self.fade_window(&fade);
        let duration = end - start;

        let frame_width = self.frame_width();
        let frame_count = self.frame_count();
        let sample_width = self.sample_width();

        let start_frame = (resolve(self.clamp_to_len(Position::At(start)), self).max(0) as usize).min(frame_count);
        let end_frame = (resolve(self.clamp_to_len(Position::At(end)), self).max(0) as usize).clamp(start_frame, frame_count);

        let data = self.data();
        let mut output = Vec::with_capacity(data.len());

        let from_power = db_to_linear(fade.from_gain);
        let to_power = db_to_linear(fade.to_gain);
        let gain_delta = to_power - from_power;

        // original data up until the fade, at the starting volume
        let before_fade = &data[..start_frame * frame_width];
        if fade.from_gain != 0.0 {
            output.extend(sample_math::scalar_multiply(before_fade, sample_width, from_power));
        } else {
            output.extend_from_slice(before_fade);
        }

        if duration > COARSE_FADE_THRESHOLD_MS {
            debug!("Coarse fade over {}ms", duration);

            let scale_step = gain_delta / duration as f64;
            let rate = self.frame_rate();

            for i in 0..duration {
                let volume_change = from_power + scale_step * i as f64;

                let chunk_start = (frame_count_for(start + i, rate) as usize).clamp(start_frame, end_frame);
                let chunk_end = if i == duration - 1 {
                    end_frame
                } else {
                    (frame_count_for(start + i + 1, rate) as usize).clamp(chunk_start, end_frame)
                };

                let chunk = &data[chunk_start * frame_width..chunk_end * frame_width];
                output.extend(sample_math::scalar_multiply(chunk, sample_width, volume_change));
            }
        } else {
            let fade_frames = end_frame - start_frame;
            debug!("Precise fade over {}ms ({} frames)", duration, fade_frames);

            if fade_frames > 0 {
                let scale_step = gain_delta / fade_frames as f64;

                for i in 0..fade_frames {
                    let volume_change = from_power + scale_step * i as f64;
                    let frame = self.get_frame(start_frame + i);
                    output.extend(sample_math::scalar_multiply(frame, sample_width, volume_change));
                }
            }
        }

        // original data after the fade, at the new volume
        let after_fade = &data[end_frame * frame_width..];
        if fade.to_gain != 0.0 {
            output.extend(sample_math::scalar_multiply(after_fade, sample_width, to_power));
        } else {
            output.extend_from_slice(after_fade);
        }

        Ok(self.spawn(output, SpecOverrides::default()))
    }

    /// Fade to silence over the last `duration` milliseconds
    pub fn fade_out(&self, duration: i64) -> Result<Segment> {
        self.fade(
            Fade::new()
                .to_gain(SILENCE_DB)
                .duration(duration)
                .end(Position::Unbounded),
        )
    }

    /// Fade up from silence over the first `duration` milliseconds
    pub fn fade_in(&self, duration: i64) -> Result<Segment> {
        self.fade(Fade::new().from_gain(SILENCE_DB).duration(duration).start(0))
    }

    /// Resolve the fade bounds to `[start, end]` milliseconds within the segment
    fn fade_window(&self, fade: &Fade) -> (i64, i64) {
        let len = self.len_ms();
        let to_ms = |position: Position| match position {
            Position::Unbounded => len,
            Position::At(ms) => {
                let ms = ms.min(len);
                if ms < 0 {
                    ms + len
                } else {
                    ms
                }
            }
        };

        let start = fade.start.map(to_ms);
        let end = fade.end.map(to_ms);

        let (start, end) = match fade.duration {
            Some(duration) => match (start, end) {
                (Some(start), _) => (start, start.saturating_add(duration)),
                (None, Some(end)) => (end.saturating_sub(duration), end),
                (None, None) => (0, duration),
            },
            None => (start.unwrap_or(0), end.unwrap_or(len)),
        };

        let start = start.clamp(0, len);
        (start, end.clamp(start, len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::PcmSpec;

    /// 16-bit mono segment where every sample is `value`
    fn create_constant(duration_ms: usize, value: i16, frame_rate: u32) -> Segment {
        let frames = duration_ms * frame_rate as usize / 1000;
        let data = value.to_le_bytes().repeat(frames);
        Segment::new(data, PcmSpec::new(1, 2, frame_rate)).unwrap()
    }

    fn samples(seg: &Segment) -> Vec<i16> {
        seg.data()
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn test_db_conversions() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
        assert!((db_to_linear(-120.0) - 1e-6).abs() < 1e-12);
        assert!((ratio_to_db(0.5) + 6.0206).abs() < 1e-4);
    }

    #[test]
    fn test_zero_fade_is_identity() {
        let seg = create_constant(100, 1000, 8000);
        let faded = seg.fade(Fade::new()).unwrap();
        assert_eq!(faded, seg);
        assert!(faded.shares_buffer_with(&seg));
    }

    #[test]
    fn test_all_three_bounds_is_an_error() {
        let seg = create_constant(100, 1000, 8000);
        let result = seg.fade(Fade::new().to_gain(-6.0).start(0).end(50).duration(50));
        assert!(matches!(result, Err(AudioError::InvalidFadeArguments)));
    }

    #[test]
    fn test_negative_duration_is_an_error() {
        let seg = create_constant(100, 1000, 8000);
        assert!(matches!(
            seg.fade_in(-5),
            Err(AudioError::InvalidDuration(-5))
        ));
    }

    #[test]
    fn test_fade_in_silent_segment_uses_precise_steps() {
        let seg = create_constant(1000, 0, 8000);
        let faded = seg.fade_in(50).unwrap();
        assert_eq!(faded.len_ms(), 1000);
        assert_eq!(faded.frame_count(), seg.frame_count());
    }

    #[test]
    fn test_precise_fade_in_ramps_per_frame() {
        let seg = create_constant(1000, 10000, 8000);
        let faded = samples(&seg.fade_in(50).unwrap());

        // first frame at -120dB of the original amplitude
        assert_eq!(faded[0], 0);
        // 50ms at 8kHz: 400 distinct steps, strictly rising after the first few
        assert!(faded[1..400].windows(2).all(|w| w[0] <= w[1]));
        assert!(faded[200] > 4900 && faded[200] < 5100);
        assert!(faded[399] < 10000);
        assert!(faded[400..].iter().all(|&s| s == 10000));
    }

    #[test]
    fn test_coarse_fade_out_steps_per_millisecond() {
        let seg = create_constant(1000, 10000, 8000);
        let faded = samples(&seg.fade_out(200).unwrap());

        assert_eq!(faded.len(), 8000);
        assert!(faded[..6400].iter().all(|&s| s == 10000));

        // every frame inside one millisecond shares the same gain
        for ms in 0..200 {
            let chunk = &faded[6400 + ms * 8..6400 + (ms + 1) * 8];
            assert!(chunk.iter().all(|&s| s == chunk[0]), "ms {}", ms);
        }
        assert!(faded[6408] < faded[6400]);
        assert!(faded[7999] < 100);
    }

    #[test]
    fn test_flat_regions_take_their_gain() {
        let seg = create_constant(1000, 10000, 8000);
        let faded = samples(
            &seg.fade(Fade::new().from_gain(-6.0).to_gain(-12.0).start(100).end(300))
                .unwrap(),
        );

        let head = (10000.0 * db_to_linear(-6.0)) as i16;
        let tail = (10000.0 * db_to_linear(-12.0)) as i16;
        assert!(faded[..800].iter().all(|&s| s == head));
        assert!(faded[2400..].iter().all(|&s| s == tail));
    }

    #[test]
    fn test_window_derivation() {
        let seg = create_constant(1000, 0, 8000);

        assert_eq!(seg.fade_window(&Fade::new().start(100).duration(50)), (100, 150));
        assert_eq!(seg.fade_window(&Fade::new().end(-100).duration(50)), (850, 900));
        assert_eq!(seg.fade_window(&Fade::new().end(Position::Unbounded).duration(300)), (700, 1000));
        assert_eq!(seg.fade_window(&Fade::new().start(-200)), (800, 1000));
        assert_eq!(seg.fade_window(&Fade::new()), (0, 1000));
        // windows never leave the segment
        assert_eq!(seg.fade_window(&Fade::new().start(900).duration(500)), (900, 1000));
        assert_eq!(seg.fade_window(&Fade::new().end(100).duration(500)), (0, 100));
    }

    #[test]
    fn test_fade_keeps_frame_count_at_odd_rates() {
        let seg = create_constant(777, 1000, 44100);
        for fade in [
            Fade::new().from_gain(SILENCE_DB).start(0).end(Position::Unbounded),
            Fade::new().to_gain(-3.0).start(10).duration(90),
            Fade::new().to_gain(-3.0).start(-300),
        ] {
            let faded = seg.fade(fade).unwrap();
            assert_eq!(faded.frame_count(), seg.frame_count());
        }
    }
}
