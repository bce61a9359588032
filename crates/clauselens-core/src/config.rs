//! Analysis thresholds and category tables.
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```json
//! { "deviation_threshold": 0.8, "max_concurrency": 4 }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::taxonomy::Taxonomy;

pub const DEFAULT_LOW_CONFIDENCE_THRESHOLD: f32 = 0.40;
pub const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_DEVIATION_THRESHOLD: f32 = 0.75;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunable parameters for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Best label similarity below this is classified as "Other".
    pub low_confidence_threshold: f32,
    /// Minimum classification confidence for a category to count as present.
    pub presence_threshold: f32,
    /// Template similarity strictly below this flags a deviation.
    pub deviation_threshold: f32,
    /// Maximum in-flight model calls during risk scoring (1 = sequential).
    pub max_concurrency: usize,
    pub taxonomy: Taxonomy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            low_confidence_threshold: DEFAULT_LOW_CONFIDENCE_THRESHOLD,
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
            deviation_threshold: DEFAULT_DEVIATION_THRESHOLD,
            max_concurrency: 1,
            taxonomy: Taxonomy::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), "loaded analysis config");
        Ok(config)
    }

    /// Parse and validate a JSON config string.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("low_confidence_threshold", self.low_confidence_threshold),
            ("presence_threshold", self.presence_threshold),
            ("deviation_threshold", self.deviation_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be at least 1".into(),
            ));
        }
        self.taxonomy.validate()
    }
}
