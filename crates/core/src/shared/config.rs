use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::timestamp::DEFAULT_TIMESTAMP_EPSILON;

/// Frames allowed between acceptance and result before new ones are dropped.
pub const DEFAULT_MAX_FRAMES_WAITING: usize = 1;
pub const DEFAULT_WORKER_THREAD_NAME: &str = "detector-worker";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Options handed to the detector factory when the worker opens a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub detect_all_emotions: bool,
    pub detect_all_expressions: bool,
    pub license_path: Option<PathBuf>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            detect_all_emotions: true,
            detect_all_expressions: true,
            license_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub max_frames_waiting: usize,
    pub timestamp_epsilon: f64,
    pub worker_thread_name: String,
    pub detector: DetectorSettings,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_frames_waiting: DEFAULT_MAX_FRAMES_WAITING,
            timestamp_epsilon: DEFAULT_TIMESTAMP_EPSILON,
            worker_thread_name: DEFAULT_WORKER_THREAD_NAME.to_string(),
            detector: DetectorSettings::default(),
        }
    }
}

impl DispatcherConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("framedetect").join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the per-user config file, falling back to defaults when it is
    /// missing. A present but broken file is still an error.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frames_waiting == 0 {
            return Err(ConfigError::Invalid(
                "max_frames_waiting must be at least 1".into(),
            ));
        }
        if !self.timestamp_epsilon.is_finite() || self.timestamp_epsilon < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "timestamp_epsilon must be a non-negative number, got {}",
                self.timestamp_epsilon
            )));
        }
        if self.worker_thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "worker_thread_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}
