use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Result};

/// Format metadata of a raw PCM buffer
///
/// Samples are signed little-endian integers, interleaved by channel:
/// [L, R, L, R, ...] for stereo. The frame width is always derived from
/// `channels * sample_width` and is never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmSpec {
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Bytes per sample per channel (1, 2, 3 or 4)
    pub sample_width: u16,

    /// Frames per second in Hz (e.g., 8000, 44100)
    pub frame_rate: u32,
}

impl PcmSpec {
    pub fn new(channels: u16, sample_width: u16, frame_rate: u32) -> Self {
        Self {
            channels,
            sample_width,
            frame_rate,
        }
    }

    /// Bytes per frame (one sample for every channel)
    pub fn frame_width(&self) -> usize {
        self.channels as usize * self.sample_width as usize
    }

    /// Check that the spec describes a buffer SampleMath can operate on
    pub fn validate(&self) -> Result<()> {
        if !(1..=4).contains(&self.sample_width) {
            return Err(AudioError::UnsupportedSampleWidth(self.sample_width));
        }
        if self.channels == 0 {
            return Err(AudioError::InvalidFormat(
                "channel count must be at least 1".to_string(),
            ));
        }
        if self.frame_rate == 0 {
            return Err(AudioError::InvalidFormat(
                "frame rate must be at least 1 Hz".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply a set of overrides, producing a new spec
    pub fn with(self, overrides: SpecOverrides) -> Self {
        Self {
            channels: overrides.channels.unwrap_or(self.channels),
            sample_width: overrides.sample_width.unwrap_or(self.sample_width),
            frame_rate: overrides.frame_rate.unwrap_or(self.frame_rate),
        }
    }
}

/// Metadata changes applied when spawning a derived segment
///
/// Built fresh by every caller; `SpecOverrides::default()` keeps the
/// operand's metadata as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpecOverrides {
    pub channels: Option<u16>,
    pub sample_width: Option<u16>,
    pub frame_rate: Option<u32>,
}

/// A point in time inside a segment, in milliseconds
///
/// Negative offsets count backward from the end of the segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Offset in milliseconds
    At(i64),

    /// The very end of the segment, whatever its length
    Unbounded,
}

impl From<i64> for Position {
    fn from(ms: i64) -> Self {
        Position::At(ms)
    }
}

impl From<i32> for Position {
    fn from(ms: i32) -> Self {
        Position::At(ms as i64)
    }
}

/// ID3v2 versions accepted when tagging mp3 output
pub const ID3V2_ALLOWED_VERSIONS: &[&str] = &["3", "4"];

/// Options for exporting a segment through a [`Transcoder`](crate::audio::Transcoder)
///
/// Deserializable so the CLI can load it from a JSON file:
///
/// ```
/// use audioseg_lib::audio::ExportOptions;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let options: ExportOptions = serde_json::from_str(
///     r#"{ "bitrate": "192k", "tags": { "artist": "Various" }, "id3v2_version": "3" }"#,
/// )?;
/// assert_eq!(options.bitrate.as_deref(), Some("192k"));
/// assert_eq!(options.tag_map()?.unwrap()["artist"], "Various");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Force a specific encoder (e.g., "libmp3lame")
    pub codec: Option<String>,

    /// Target bitrate (e.g., "128k")
    pub bitrate: Option<String>,

    /// Extra arguments passed to the converter as is
    pub parameters: Vec<String>,

    /// Metadata tags; must be an object mapping names to scalar values
    pub tags: Option<serde_json::Value>,

    /// ID3v2 tag version for mp3 output
    pub id3v2_version: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            codec: None,
            bitrate: None,
            parameters: Vec::new(),
            tags: None,
            id3v2_version: "4".to_string(),
        }
    }
}

impl ExportOptions {
    /// Validate and flatten the tags into key/value strings
    pub fn tag_map(&self) -> Result<Option<BTreeMap<String, String>>> {
        let Some(tags) = &self.tags else {
            return Ok(None);
        };

        let object = tags
            .as_object()
            .ok_or_else(|| AudioError::InvalidTag("Tags must be a dictionary.".to_string()))?;

        let mut map = BTreeMap::new();
        for (key, value) in object {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(AudioError::InvalidTag(format!(
                        "Tag '{}' must be a scalar value, got {}",
                        key, other
                    )))
                }
            };
            map.insert(key.clone(), value);
        }

        Ok(Some(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_width_follows_channels() {
        let spec = PcmSpec::new(2, 2, 44100);
        assert_eq!(spec.frame_width(), 4);

        let mono = spec.with(SpecOverrides {
            channels: Some(1),
            ..Default::default()
        });
        assert_eq!(mono.frame_width(), 2);
        assert_eq!(mono.frame_rate, 44100);
    }

    #[test]
    fn test_validate_rejects_bad_specs() {
        assert!(PcmSpec::new(1, 2, 8000).validate().is_ok());
        assert!(matches!(
            PcmSpec::new(1, 5, 8000).validate(),
            Err(AudioError::UnsupportedSampleWidth(5))
        ));
        assert!(PcmSpec::new(0, 2, 8000).validate().is_err());
        assert!(PcmSpec::new(1, 2, 0).validate().is_err());
    }

    #[test]
    fn test_tags_must_be_a_mapping() {
        let options = ExportOptions {
            tags: Some(serde_json::json!(["title", "Song"])),
            ..Default::default()
        };
        assert!(matches!(options.tag_map(), Err(AudioError::InvalidTag(_))));

        let options = ExportOptions {
            tags: Some(serde_json::json!({ "title": "Song", "track": 3 })),
            ..Default::default()
        };
        let tags = options.tag_map().unwrap().unwrap();
        assert_eq!(tags["title"], "Song");
        assert_eq!(tags["track"], "3");
    }

    #[test]
    fn test_nested_tag_values_are_rejected() {
        let options = ExportOptions {
            tags: Some(serde_json::json!({ "title": { "nested": true } })),
            ..Default::default()
        };
        assert!(options.tag_map().is_err());
    }

    #[test]
    fn test_default_options_deserialize() {
        let options: ExportOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ExportOptions::default());
        assert_eq!(options.id3v2_version, "4");
    }
}
