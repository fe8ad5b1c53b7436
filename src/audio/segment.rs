// src/audio/segment.rs

use std::fmt;
use std::ops::{Add, Bound, Mul, RangeBounds, Sub};
use std::sync::Arc;

use crate::audio::envelope::{db_to_linear, ratio_to_db};
use crate::audio::position::{duration_ms, frame_count_for, resolve};
use crate::audio::sample_math;
use crate::audio::types::{PcmSpec, Position, SpecOverrides};
use crate::error::{AudioError, Result};

/// An immutable slice of PCM audio
///
/// Holds interleaved raw sample bytes plus their format. Every editing
/// operation returns a new `Segment`; the byte buffer is shared read-only,
/// so cloning is cheap and no-op edits hand back the same buffer.
///
/// Positions and lengths are in milliseconds unless a method says frames.
///
/// # Example
/// ```
/// use audioseg_lib::audio::{PcmSpec, Segment};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // One second of 16-bit mono silence at 8kHz
/// let audio = Segment::new(vec![0; 16000], PcmSpec::new(1, 2, 8000))?;
///
/// let first_half = audio.slice(..500)?;
/// let last_100ms = audio.slice(-100..)?;
///
/// assert_eq!(audio.len_ms(), 1000);
/// assert_eq!(first_half.len_ms(), 500);
/// assert_eq!(last_100ms.len_ms(), 100);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Segment {
    data: Arc<[u8]>,
    spec: PcmSpec,
}

impl Segment {
    /// Build a segment from raw PCM bytes
    ///
    /// Fails if the spec is unusable or the buffer is not a whole number
    /// of frames.
    pub fn new(data: Vec<u8>, spec: PcmSpec) -> Result<Self> {
        spec.validate()?;

        let frame_width = spec.frame_width();
        if data.len() % frame_width != 0 {
            return Err(AudioError::MalformedInput {
                len: data.len(),
                frame_width,
            });
        }

        Ok(Self {
            data: data.into(),
            spec,
        })
    }

    /// Zero-length segment, the identity for concatenation
    pub fn empty() -> Self {
        Self {
            data: Arc::from(Vec::<u8>::new()),
            spec: PcmSpec::new(1, 1, 1),
        }
    }

    /// 16-bit mono silence of the given duration
    pub fn silent(duration_ms: i64, frame_rate: u32) -> Result<Self> {
        let spec = PcmSpec::new(1, 2, frame_rate);
        spec.validate()?;

        let frames = frame_count_for(duration_ms.max(0), frame_rate) as usize;
        Self::new(vec![0; frames * spec.frame_width()], spec)
    }

    /// Derive a segment from this one's metadata and new data
    ///
    /// `data` must already be frame-aligned for the overridden spec.
    pub(crate) fn spawn(&self, data: Vec<u8>, overrides: SpecOverrides) -> Segment {
        let spec = self.spec.with(overrides);
        debug_assert_eq!(data.len() % spec.frame_width(), 0);

        Segment {
            data: data.into(),
            spec,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn spec(&self) -> PcmSpec {
        self.spec
    }

    pub fn channels(&self) -> u16 {
        self.spec.channels
    }

    pub fn sample_width(&self) -> u16 {
        self.spec.sample_width
    }

    pub fn frame_rate(&self) -> u32 {
        self.spec.frame_rate
    }

    pub fn frame_width(&self) -> usize {
        self.spec.frame_width()
    }

    /// Whether both segments share the very same byte buffer
    pub fn shares_buffer_with(&self, other: &Segment) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Length in milliseconds, rounded to the nearest millisecond
    pub fn len_ms(&self) -> i64 {
        duration_ms(self.frame_count(), self.spec.frame_rate)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of whole frames in the buffer
    pub fn frame_count(&self) -> usize {
        self.data.len() / self.frame_width()
    }

    /// Number of frames in `ms` milliseconds at this segment's rate
    pub fn frame_count_for(&self, ms: i64) -> i64 {
        frame_count_for(ms, self.spec.frame_rate)
    }

    /// Length in seconds, without millisecond rounding
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.spec.frame_rate as f64
    }

    /// Raw bytes of one frame; empty when `index` is past the end
    pub fn get_frame(&self, index: usize) -> &[u8] {
        let frame_width = self.frame_width();
        let start = index.saturating_mul(frame_width).min(self.data.len());
        let end = start.saturating_add(frame_width).min(self.data.len());
        &self.data[start..end]
    }

    /// Slice by a half-open millisecond range
    ///
    /// Negative bounds count back from the end, omitted bounds default to
    /// the start and end of the segment, and bounds past the end are
    /// clamped to it.
    pub fn slice<R: RangeBounds<i64>>(&self, range: R) -> Result<Segment> {
        let start = match range.start_bound() {
            Bound::Included(&ms) => ms,
            Bound::Excluded(&ms) => ms.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&ms) => Position::At(ms.saturating_add(1)),
            Bound::Excluded(&ms) => Position::At(ms),
            Bound::Unbounded => Position::Unbounded,
        };

        self.slice_between(Position::At(start), end)
    }

    /// The single millisecond starting at `ms`
    ///
    /// A negative `ms` counts back from the end, so `at(-1)` is the last
    /// millisecond.
    pub fn at(&self, ms: i64) -> Result<Segment> {
        let ms = if ms < 0 { self.len_ms() + ms } else { ms };
        self.slice_between(Position::At(ms), Position::At(ms.saturating_add(1)))
    }

    /// Iterate over the segment one millisecond at a time
    pub fn iter_ms(&self) -> impl Iterator<Item = Result<Segment>> + '_ {
        (0..self.len_ms()).map(move |ms| self.at(ms))
    }

    fn slice_between(&self, start: Position, end: Position) -> Result<Segment> {
        let start_frame = resolve(self.clamp_to_len(start), self).max(0);
        let end_frame = resolve(self.clamp_to_len(end), self).max(start_frame);

        let data = self.read_frames(start_frame as usize, end_frame as usize)?;
        Ok(self.spawn(data, SpecOverrides::default()))
    }

    /// Positions at or past the end resolve to the real end of the buffer
    pub(crate) fn clamp_to_len(&self, position: Position) -> Position {
        match position {
            Position::At(ms) if ms > 0 && ms >= self.len_ms() => Position::Unbounded,
            other => other,
        }
    }

    /// Copy frames `[start_frame, end_frame)`, padding a short tail
    ///
    /// Rounding can leave the requested range a little past the buffer;
    /// the gap is filled with the last frame attenuated to silence. More
    /// than 2ms of missing frames means the positions were resolved
    /// inconsistently and is an error.
    pub(crate) fn read_frames(&self, start_frame: usize, end_frame: usize) -> Result<Vec<u8>> {
        let frame_width = self.frame_width();
        let frame_count = self.frame_count();

        let available_start = start_frame.min(frame_count);
        let available_end = end_frame.min(frame_count).max(available_start);
        let mut data = self.data[available_start * frame_width..available_end * frame_width].to_vec();

        let expected = end_frame.saturating_sub(start_frame);
        let missing = expected - (available_end - available_start);

        if missing > 0 {
            let allowed = self.frame_count_for(2) as usize;
            if missing > allowed {
                return Err(AudioError::TooManyMissingFrames { missing, allowed });
            }

            let silence = match data.len().checked_sub(frame_width) {
                Some(last) => sample_math::scalar_multiply(&data[last..], self.sample_width(), 0.0),
                None => vec![0; frame_width],
            };
            for _ in 0..missing {
                data.extend_from_slice(&silence);
            }
        }

        Ok(data)
    }

    /// Frames `[start_frame, end_frame)` as a segment, padded like [`read_frames`](Segment::read_frames)
    pub(crate) fn frames_between(&self, start_frame: usize, end_frame: usize) -> Result<Segment> {
        let data = self.read_frames(start_frame, end_frame.max(start_frame))?;
        Ok(self.spawn(data, SpecOverrides::default()))
    }

    /// Slice by frame index instead of milliseconds
    ///
    /// Indices are clamped to `[0, frame_count]`; this never pads or fails.
    pub fn get_sample_slice(&self, start_sample: Option<i64>, end_sample: Option<i64>) -> Segment {
        let max_val = self.frame_count() as i64;
        let bounded = |val: Option<i64>, default: i64| val.unwrap_or(default).clamp(0, max_val) as usize;

        let frame_width = self.frame_width();
        let start = bounded(start_sample, 0) * frame_width;
        let end = (bounded(end_sample, max_val) * frame_width).max(start);

        self.spawn(self.data[start..end].to_vec(), SpecOverrides::default())
    }

    /// The whole buffer repeated `times` times back to back
    pub fn repeat(&self, times: usize) -> Segment {
        self.spawn(self.data.repeat(times), SpecOverrides::default())
    }

    /// Change the volume by `volume_change` decibels
    pub fn apply_gain(&self, volume_change: f64) -> Segment {
        let data = sample_math::scalar_multiply(&self.data, self.sample_width(), db_to_linear(volume_change));
        self.spawn(data, SpecOverrides::default())
    }

    /// Play backwards: frame order is reversed, each frame stays intact
    pub fn reverse(&self) -> Segment {
        let data = sample_math::reverse_frames(&self.data, self.frame_width());
        self.spawn(data, SpecOverrides::default())
    }

    /// Root mean square amplitude over all samples
    pub fn rms(&self) -> i64 {
        sample_math::rms(&self.data, self.sample_width())
    }

    /// Largest absolute sample value
    pub fn max(&self) -> i64 {
        sample_math::peak(&self.data, self.sample_width())
    }

    /// Half the range of the sample width (e.g., 32768 for 16-bit)
    pub fn max_possible_amplitude(&self) -> f64 {
        let bits = self.sample_width() as i32 * 8;
        2f64.powi(bits) / 2.0
    }

    /// Loudness relative to full scale; negative infinity for silence
    pub fn dbfs(&self) -> f64 {
        let rms = self.rms();
        if rms == 0 {
            return f64::NEG_INFINITY;
        }
        ratio_to_db(rms as f64 / self.max_possible_amplitude())
    }
}

impl PartialEq for Segment {
    /// Segments are equal when their raw bytes are; metadata is ignored
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Segment {}

/// `&audio + 6.0` is `audio.apply_gain(6.0)`
impl Add<f64> for &Segment {
    type Output = Segment;

    fn add(self, db: f64) -> Segment {
        self.apply_gain(db)
    }
}

/// `&audio - 6.0` is `audio.apply_gain(-6.0)`
impl Sub<f64> for &Segment {
    type Output = Segment;

    fn sub(self, db: f64) -> Segment {
        self.apply_gain(-db)
    }
}

/// `&audio * 3` is `audio.repeat(3)`
impl Mul<usize> for &Segment {
    type Output = Segment;

    fn mul(self, times: usize) -> Segment {
        self.repeat(times)
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("channels", &self.spec.channels)
            .field("sample_width", &self.spec.sample_width)
            .field("frame_rate", &self.spec.frame_rate)
            .field("frames", &self.frame_count())
            .field("len_ms", &self.len_ms())
            .finish()
    }
}
