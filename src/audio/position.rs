// src/audio/position.rs
//! Millisecond positions to frame indices
//!
//! All conversions use integer arithmetic so the same millisecond always
//! lands on the same frame, whichever operation asks.

use crate::audio::segment::Segment;
use crate::audio::types::Position;

/// Number of frames covered by `ms` milliseconds at `frame_rate`
///
/// Truncates toward zero and saturates at the limits of `i64`.
pub fn frame_count_for(ms: i64, frame_rate: u32) -> i64 {
    let frames = ms as i128 * frame_rate as i128 / 1000;
    frames.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Duration of `frames` frames in milliseconds, rounded half up
pub fn duration_ms(frames: usize, frame_rate: u32) -> i64 {
    let rate = frame_rate as u128;
    ((2000 * frames as u128 + rate) / (2 * rate)) as i64
}

/// Resolve a position to a frame index inside `segment`
///
/// Negative offsets are measured back from the end and `Unbounded` maps
/// to the frame count of the full duration, i.e. one past the last frame.
/// The result is not clamped: it may be negative or past the last frame.
pub fn resolve(position: Position, segment: &Segment) -> i64 {
    let ms = match position {
        Position::Unbounded => return segment.frame_count() as i64,
        Position::At(ms) if ms < 0 => segment.len_ms().saturating_add(ms),
        Position::At(ms) => ms,
    };
    frame_count_for(ms, segment.frame_rate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::PcmSpec;

    fn segment(frames: usize, frame_rate: u32) -> Segment {
        Segment::new(vec![0; frames * 2], PcmSpec::new(1, 2, frame_rate)).unwrap()
    }

    #[test]
    fn test_frame_count_for_truncates() {
        assert_eq!(frame_count_for(1, 44100), 44);
        assert_eq!(frame_count_for(10, 44100), 441);
        assert_eq!(frame_count_for(1000, 8000), 8000);
        assert_eq!(frame_count_for(0, 8000), 0);
    }

    #[test]
    fn test_duration_rounds_half_up() {
        assert_eq!(duration_ms(8000, 8000), 1000);
        assert_eq!(duration_ms(4, 8000), 1); // 0.5ms
        assert_eq!(duration_ms(3, 8000), 0);
        assert_eq!(duration_ms(0, 1), 0);
    }

    #[test]
    fn test_negative_positions_count_from_end() {
        let seg = segment(8000, 8000);
        assert_eq!(resolve(Position::At(-250), &seg), 6000);
        assert_eq!(resolve(Position::At(250), &seg), 2000);
    }

    #[test]
    fn test_unbounded_is_full_duration() {
        let seg = segment(8000, 8000);
        assert_eq!(resolve(Position::Unbounded, &seg), 8000);
    }

    #[test]
    fn test_unbounded_covers_rounding_remainder() {
        // 4 frames at 8kHz round up to 1ms, but only 4 frames exist
        let seg = segment(4, 8000);
        assert_eq!(seg.len_ms(), 1);
        assert_eq!(resolve(Position::Unbounded, &seg), 4);
        assert_eq!(resolve(Position::At(1), &seg), 8);
    }

    #[test]
    fn test_extreme_positions_saturate() {
        let seg = segment(800, 8000);
        assert_eq!(frame_count_for(i64::MAX, 44100), i64::MAX);
        assert_eq!(frame_count_for(i64::MIN, 44100), i64::MIN);
        assert!(resolve(Position::At(i64::MIN), &seg) < 0);
        assert_eq!(resolve(Position::At(i64::MAX), &seg), i64::MAX);
    }

    #[test]
    fn test_positions_are_not_clamped() {
        let seg = segment(800, 8000);
        assert_eq!(resolve(Position::At(-200), &seg), -800);
        assert_eq!(resolve(Position::At(200), &seg), 1600);
    }
}
