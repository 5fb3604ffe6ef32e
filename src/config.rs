//! Application configuration.
//!
//! Loaded from a JSON file; every field falls back to its default so a
//! partial (or missing) file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::audio::{DecodeMode, WavFormat};
use crate::denoiser::ModelVariant;
use crate::transcode::DEFAULT_FFMPEG_BINARY;

/// Directory name used under the platform data dir
pub const APP_DIR_NAME: &str = "denoise-demo";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioConfig {
    pub format: WavFormat,
    pub decode_mode: DecodeMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TranscoderConfig {
    pub binary_path: PathBuf,
    pub extra_args: Vec<String>,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            binary_path: PathBuf::from(DEFAULT_FFMPEG_BINARY),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DenoiserConfig {
    pub model: ModelVariant,
    pub model_dir: PathBuf,
}

impl Default for DenoiserConfig {
    fn default() -> Self {
        Self {
            model: ModelVariant::default(),
            model_dir: PathBuf::from("models"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Level override ("trace" .. "error"); build default when unset
    pub level: Option<String>,
    /// Also write to `<outputDir>/<fileName>.log`
    pub to_file: bool,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            to_file: false,
            file_name: APP_DIR_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub transcoder: TranscoderConfig,
    pub denoiser: DenoiserConfig,
    /// Where input copies, transcoded audio and denoised output land
    pub output_dir: PathBuf,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            transcoder: TranscoderConfig::default(),
            denoiser: DenoiserConfig::default(),
            output_dir: default_output_dir(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load config from a JSON file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            crate::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(contents)?)
    }
}

/// Platform-local data directory for outputs, or a relative fallback
pub fn default_output_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR_NAME))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
