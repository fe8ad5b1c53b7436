// src/audio/sync.rs
//! Bringing two segments to a common format
//!
//! Binary operations (overlay, append) need both operands at the same
//! channel count and frame rate. Conversions never change a segment's
//! length in milliseconds.

use tracing::debug;

use crate::audio::sample_math;
use crate::audio::segment::Segment;
use crate::audio::types::SpecOverrides;
use crate::error::Result;

impl Segment {
    /// Convert to `channels` channels
    ///
    /// Only mono <-> stereo is supported, except for empty segments where
    /// only the metadata changes. Asking for the current channel count
    /// returns this segment without copying.
    pub fn set_channels(&self, channels: u16) -> Result<Segment> {
        if channels == self.channels() {
            return Ok(self.clone());
        }

        let overrides = SpecOverrides {
            channels: Some(channels),
            ..Default::default()
        };
        self.spec().with(overrides).validate()?;

        // no samples to rearrange, any layout will do
        if self.is_empty() {
            return Ok(self.spawn(Vec::new(), overrides));
        }

        debug!("Converting {} -> {} channels", self.channels(), channels);

        let converted = sample_math::channel_convert(self.data(), self.sample_width(), self.channels(), channels)?;

        Ok(self.spawn(converted, overrides))
    }

    /// Resample to `frame_rate` Hz, keeping the duration in milliseconds
    ///
    /// Asking for the current rate returns this segment without copying.
    pub fn set_frame_rate(&self, frame_rate: u32) -> Result<Segment> {
        if frame_rate == self.frame_rate() {
            return Ok(self.clone());
        }

        let converted = if self.is_empty() {
            Vec::new()
        } else {
            sample_math::resample(
                self.data(),
                self.sample_width(),
                self.channels(),
                self.frame_rate(),
                frame_rate,
            )?
        };

        Ok(self.spawn(
            converted,
            SpecOverrides {
                frame_rate: Some(frame_rate),
                ..Default::default()
            },
        ))
    }

    /// Convert to `sample_width` bytes per sample
    pub fn set_sample_width(&self, sample_width: u16) -> Result<Segment> {
        if sample_width == self.sample_width() {
            return Ok(self.clone());
        }

        let spec = self.spec().with(SpecOverrides {
            sample_width: Some(sample_width),
            ..Default::default()
        });
        spec.validate()?;

        debug!("Converting sample width {} -> {} bytes", self.sample_width(), sample_width);

        let converted = sample_math::convert_width(self.data(), self.sample_width(), sample_width);

        Ok(self.spawn(
            converted,
            SpecOverrides {
                sample_width: Some(sample_width),
                ..Default::default()
            },
        ))
    }
}

/// Convert both segments to the larger channel count, frame rate and
/// sample width
///
/// Channels are matched first so resampling always runs on the final
/// channel layout.
pub fn sync(seg1: &Segment, seg2: &Segment) -> Result<(Segment, Segment)> {
    let (s1_len, s2_len) = (seg1.len_ms(), seg2.len_ms());

    let channels = seg1.channels().max(seg2.channels());
    let seg1 = seg1.set_channels(channels)?;
    let seg2 = seg2.set_channels(channels)?;

    let frame_rate = seg1.frame_rate().max(seg2.frame_rate());
    let seg1 = seg1.set_frame_rate(frame_rate)?;
    let seg2 = seg2.set_frame_rate(frame_rate)?;

    let sample_width = seg1.sample_width().max(seg2.sample_width());
    let seg1 = seg1.set_sample_width(sample_width)?;
    let seg2 = seg2.set_sample_width(sample_width)?;

    // durations are only guaranteed to survive at 1kHz and above
    debug_assert!(frame_rate < 1000 || seg1.len_ms() == s1_len);
    debug_assert!(frame_rate < 1000 || seg2.len_ms() == s2_len);

    Ok((seg1, seg2))
}
