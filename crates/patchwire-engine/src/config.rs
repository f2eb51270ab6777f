//! Engine configuration.
//!
//! Loaded from TOML; every field has a default so a partial file (or none at
//! all) is valid.
//!
//! ```toml
//! sample_rate = 44100.0
//! max_block_frames = 256
//! channels = 2
//! poll_interval_blocks = 8
//! debug_snapshot_polls = 32
//! report_capacity = 256
//! ```

use std::path::{Path, PathBuf};

use patchwire_core::MAX_CHANNELS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML.
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field is outside its valid range.
    #[error("invalid config value '{field}': {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// Why the value is rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Engine-wide settings fixed for the engine's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Largest block `render` accepts; every port buffer has this capacity.
    pub max_block_frames: usize,
    /// Channel count of every port buffer and of the host output.
    pub channels: usize,
    /// Blocks between sequencer position polls.
    pub poll_interval_blocks: u32,
    /// Polls between debug snapshots.
    pub debug_snapshot_polls: u32,
    /// Capacity of the report channel.
    pub report_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_block_frames: 128,
            channels: 2,
            poll_interval_blocks: 8,
            debug_snapshot_polls: 32,
            report_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Loads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Parses and validates a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks every field against its valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sample_rate.is_finite() || !(8000.0..=384_000.0).contains(&self.sample_rate) {
            return Err(ConfigError::invalid(
                "sample_rate",
                format!("{} is outside 8000..=384000", self.sample_rate),
            ));
        }
        if !(1..=8192).contains(&self.max_block_frames) {
            return Err(ConfigError::invalid(
                "max_block_frames",
                format!("{} is outside 1..=8192", self.max_block_frames),
            ));
        }
        if !(1..=MAX_CHANNELS).contains(&self.channels) {
            return Err(ConfigError::invalid(
                "channels",
                format!("{} is outside 1..={MAX_CHANNELS}", self.channels),
            ));
        }
        if self.poll_interval_blocks == 0 {
            return Err(ConfigError::invalid("poll_interval_blocks", "must be at least 1"));
        }
        if self.debug_snapshot_polls == 0 {
            return Err(ConfigError::invalid("debug_snapshot_polls", "must be at least 1"));
        }
        if self.report_capacity == 0 {
            return Err(ConfigError::invalid("report_capacity", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval_blocks, 8);
        assert_eq!(config.channels, 2);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = EngineConfig::from_toml("sample_rate = 44100.0\nchannels = 1\n").unwrap();
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.channels, 1);
        assert_eq!(config.max_block_frames, 128);
    }

    #[test]
    fn rejects_out_of_range() {
        for toml_str in [
            "channels = 0",
            "channels = 9",
            "max_block_frames = 0",
            "sample_rate = 10.0",
            "poll_interval_blocks = 0",
        ] {
            assert!(
                matches!(
                    EngineConfig::from_toml(toml_str),
                    Err(ConfigError::Invalid { .. })
                ),
                "{toml_str}"
            );
        }
        assert!(matches!(
            EngineConfig::from_toml("channels = \"two\""),
            Err(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.toml");
        let config = EngineConfig {
            max_block_frames: 512,
            ..EngineConfig::default()
        };
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            EngineConfig::load(&missing),
            Err(ConfigError::ReadFile { .. })
        ));
    }
}
