// src/audio/mixer.rs
//! Overlay and crossfaded append

use tracing::debug;

use crate::audio::envelope::{Fade, SILENCE_DB};
use crate::audio::sample_math;
use crate::audio::segment::Segment;
use crate::audio::sync::sync;
use crate::audio::types::{Position, SpecOverrides};
use crate::error::{AudioError, Result};

/// Crossfade used by [`Segment::append`] callers that have no preference
pub const DEFAULT_CROSSFADE_MS: i64 = 100;

impl Segment {
    /// Mix `other` into this segment starting at `position` milliseconds
    ///
    /// The result always has this segment's length. `other` is cut off at
    /// the end of this segment; with `looped` it is repeated until the end
    /// is reached, the last repetition cut short.
    ///
    /// # Example
    /// ```
    /// use audioseg_lib::audio::{PcmSpec, Segment};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let speech = Segment::new(vec![0; 16000], PcmSpec::new(1, 2, 8000))?;
    /// let beep = Segment::new(vec![0x20; 800], PcmSpec::new(1, 2, 8000))?;
    ///
    /// let with_beep = speech.overlay(&beep, 250, false)?;
    /// assert_eq!(with_beep.len_ms(), speech.len_ms());
    /// # Ok(())
    /// # }
    /// ```
    pub fn overlay(&self, other: &Segment, position: i64, looped: bool) -> Result<Segment> {
        let times = if looped { None } else { Some(1) };
        self.overlay_repeated(other, position, times)
    }

    /// Like [`overlay`](Segment::overlay), repeating `other` at most `times` times
    ///
    /// `times == 0` returns this segment unchanged.
    pub fn overlay_times(&self, other: &Segment, position: i64, times: usize) -> Result<Segment> {
        if times == 0 {
            return Ok(self.clone());
        }
        self.overlay_repeated(other, position, Some(times))
    }

    /// `times == None` loops until the base is covered
    fn overlay_repeated(&self, other: &Segment, position: i64, times: Option<usize>) -> Result<Segment> {
        let (seg1, seg2) = sync(self, other)?;
        let sample_width = seg1.sample_width();

        let mut output = seg1.slice(..position)?.data().to_vec();

        // drop down to the raw data
        let base = seg1.slice(position..)?;
        let base = base.data();
        let mut overlay = seg2.data();
        let mut times_left = times;
        let mut pos = 0;

        loop {
            let remaining = base.len().saturating_sub(pos);
            let mut last_pass = false;

            if overlay.len() >= remaining {
                overlay = &overlay[..remaining];
                last_pass = true;
            }

            output.extend(sample_math::additive_mix(
                &base[pos..pos + overlay.len()],
                overlay,
                sample_width,
            ));
            pos += overlay.len();

            if let Some(n) = times_left.as_mut() {
                *n -= 1;
                last_pass |= *n == 0;
            }

            // an empty overlay would never reach the end
            if last_pass || overlay.is_empty() {
                break;
            }
        }

        output.extend_from_slice(&base[pos..]);

        Ok(seg1.spawn(output, SpecOverrides::default()))
    }

    /// Concatenate `other` after this segment, crossfading `crossfade` ms
    ///
    /// With a crossfade of 0 the raw data is simply joined. Otherwise the
    /// tail of this segment fades out while the head of `other` fades in
    /// over the same window, so the result is `crossfade` ms shorter than
    /// the two lengths combined.
    ///
    /// # Example
    /// ```
    /// use audioseg_lib::audio::{PcmSpec, Segment};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let intro = Segment::new(vec![0x10; 8000], PcmSpec::new(1, 2, 8000))?;
    /// let song = Segment::new(vec![0x20; 16000], PcmSpec::new(1, 2, 8000))?;
    ///
    /// let joined = intro.append(&song, 100)?;
    /// assert_eq!(joined.len_ms(), 500 + 1000 - 100);
    /// # Ok(())
    /// # }
    /// ```
    pub fn append(&self, other: &Segment, crossfade: i64) -> Result<Segment> {
        let (seg1, seg2) = sync(self, other)?;

        if crossfade == 0 {
            let mut data = Vec::with_capacity(seg1.data().len() + seg2.data().len());
            data.extend_from_slice(seg1.data());
            data.extend_from_slice(seg2.data());
            return Ok(seg1.spawn(data, SpecOverrides::default()));
        }

        if crossfade < 0 {
            return Err(AudioError::InvalidDuration(crossfade));
        }

        for seg in [&seg1, &seg2] {
            if crossfade > seg.len_ms() {
                return Err(AudioError::CrossfadeTooLong {
                    crossfade,
                    available: seg.len_ms(),
                });
            }
        }

        debug!("Appending with a {}ms crossfade", crossfade);

        // both sides end at the frame of their rounded length, so leftover
        // frames past the last whole millisecond can't add up
        let (len1, len2) = (seg1.len_ms(), seg2.len_ms());
        let split1 = seg1.frame_count_for(len1 - crossfade) as usize;
        let end1 = seg1.frame_count_for(len1) as usize;
        let split2 = seg2.frame_count_for(crossfade) as usize;
        let end2 = seg2.frame_count_for(len2) as usize;

        let fade_out = seg1.frames_between(split1, end1)?.fade(
            Fade::new()
                .to_gain(SILENCE_DB)
                .start(0)
                .end(Position::Unbounded),
        )?;
        let fade_in = seg2.frames_between(0, split2)?.fade(
            Fade::new()
                .from_gain(SILENCE_DB)
                .start(0)
                .end(Position::Unbounded),
        )?;
        let xf = fade_out.overlay(&fade_in, 0, false)?;

        let head = seg1.frames_between(0, split1)?;
        let tail = seg2.frames_between(split2, end2)?;

        let mut data = Vec::with_capacity(head.data().len() + xf.data().len() + tail.data().len());
        data.extend_from_slice(head.data());
        data.extend_from_slice(xf.data());
        data.extend_from_slice(tail.data());

        Ok(seg1.spawn(data, SpecOverrides::default()))
    }
}
