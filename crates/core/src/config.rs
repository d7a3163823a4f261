//! Configuration structures for the ntd-reader system.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Archive layout configuration.
    pub archive: ArchiveConfig,
    /// Decoder behaviour.
    pub decode: DecodeConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse a configuration from JSON text. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        let a = &self.archive;
        if a.tick_dir.is_empty() || a.minute_dir.is_empty() {
            return Err(Error::config("archive sub-directory names must not be empty"));
        }
        if a.tick_dir == a.minute_dir {
            return Err(Error::config("tick_dir and minute_dir must differ"));
        }
        if a.ncd_extension.is_empty() || a.ntd_extension.is_empty() {
            return Err(Error::config("file extensions must not be empty"));
        }
        if a.date_format.is_empty() {
            return Err(Error::config("date_format must not be empty"));
        }
        Ok(())
    }
}

/// Archive directory layout: `{root}/{tick_dir|minute_dir}/{instrument}/{date}.{ext}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Root of the historical database.
    pub root: PathBuf,
    /// Sub-directory holding tick files.
    pub tick_dir: String,
    /// Sub-directory holding minute files.
    pub minute_dir: String,
    /// Extension of the newer format.
    pub ncd_extension: String,
    /// Extension of the legacy format.
    pub ntd_extension: String,
    /// chrono format of file stems.
    pub date_format: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("db"),
            tick_dir: "tick".to_string(),
            minute_dir: "minute".to_string(),
            ncd_extension: "ncd".to_string(),
            ntd_extension: "ntd".to_string(),
            date_format: "%Y%m%d".to_string(),
        }
    }
}

/// Decoder behaviour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Legacy files: fail when the buffer ends before the header's record count.
    pub strict_record_count: bool,
    /// Legacy files: warn when bytes remain after the last counted record.
    pub warn_on_trailing_bytes: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            strict_record_count: true,
            warn_on_trailing_bytes: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
