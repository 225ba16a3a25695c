//! Player configuration.
//!
//! Configuration is an optional JSON file. Every key has a default, so an
//! empty object (or no file at all) yields a working setup.

use crate::error::{AudioError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming the JSON configuration file.
pub const CONFIG_ENV_VAR: &str = "INTROPLAY_CONFIG";

/// Default realtime render block, in frames.
pub const DEFAULT_BLOCK_FRAMES: usize = 1024;

/// Default pre-render work unit, in frames.
pub const DEFAULT_PRERENDER_CHUNK_FRAMES: usize = 4096;

/// Upper bound for `block_frames` and `prerender_chunk_frames`.
pub const MAX_FRAMES: usize = 1 << 20;

/// Tunables for the player library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Overrides the logical processor count reported by the host.
    /// Thread counts for both player variants are derived from this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processors: Option<usize>,

    /// Frames rendered per realtime block.
    /// Smaller = lower latency but more scheduling overhead per frame.
    pub block_frames: usize,

    /// Frames handed to one render thread at a time while pre-rendering.
    pub prerender_chunk_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            processors: None,
            block_frames: DEFAULT_BLOCK_FRAMES,
            prerender_chunk_frames: DEFAULT_PRERENDER_CHUNK_FRAMES,
        }
    }
}

impl AudioConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: AudioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// Loads the file named by [`CONFIG_ENV_VAR`], falling back to defaults.
    ///
    /// A missing variable is not an error. A file that fails to load is
    /// logged and ignored.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                tracing::debug!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring configuration {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Serializes the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        for (name, frames) in [
            ("block_frames", self.block_frames),
            ("prerender_chunk_frames", self.prerender_chunk_frames),
        ] {
            if frames == 0 || frames > MAX_FRAMES {
                return Err(AudioError::Config(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_FRAMES, frames
                )));
            }
        }
        if self.processors == Some(0) {
            return Err(AudioError::Config("processors must be non-zero".into()));
        }
        Ok(())
    }
}
