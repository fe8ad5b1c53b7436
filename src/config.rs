use serde::{Deserialize, Serialize};

/// Environment variable naming the converter binary used for export
pub const CONVERTER_ENV: &str = "AUDIOSEG_CONVERTER";

/// Converter used when nothing else is configured
pub const DEFAULT_CONVERTER: &str = "ffmpeg";

/// Settings for the default transcoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// ffmpeg-compatible binary (e.g., "ffmpeg", "avconv", or a full path)
    pub converter: String,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            converter: DEFAULT_CONVERTER.to_string(),
        }
    }
}

impl TranscoderConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let converter = lookup(CONVERTER_ENV)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_CONVERTER.to_string());

        Self { converter }
    }
}
