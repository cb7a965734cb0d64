//! Tracker configuration, loaded from YAML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::Calibration;
use crate::storage;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Directory holding the persisted blobs (sessions, exercises).
    pub data_dir: PathBuf,
    /// Optional `{"exercises": [...]}` file used to seed an empty catalog.
    pub bundled_exercises: Option<PathBuf>,
    /// Metric scaling multipliers.
    pub calibration: Calibration,
    pub log: LogConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("orofacial-data"),
            bundled_exercises: None,
            calibration: Calibration::default(),
            log: LogConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        storage::load_yaml(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        storage::save_yaml(path, self)
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_bundled_exercises(mut self, path: impl Into<PathBuf>) -> Self {
        self.bundled_exercises = Some(path.into());
        self
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info").
    pub level: String,
    /// Write a daily-rotated log file here in addition to stderr.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}
