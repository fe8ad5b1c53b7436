pub mod audio;
pub mod config;
pub mod error;

// Re-export for convenience
pub use audio::*;
pub use config::TranscoderConfig;
pub use error::{AudioError, Result};
