//! Evaluation configuration.
//!
//! Loaded from YAML (or JSON); command-line flags override file values.
//!
//! ```yaml
//! concurrency: 8
//! modes: [strict, loose]
//! output_dir: out/
//! validate_schema: true
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::Mode;

/// Errors loading or validating a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn default_concurrency() -> usize {
    4
}

fn default_modes() -> Vec<Mode> {
    vec![Mode::Strict, Mode::Loose]
}

fn default_true() -> bool {
    true
}

/// Batch evaluation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    /// Examples evaluated concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Modes to evaluate, in output order
    #[serde(default = "default_modes")]
    pub modes: Vec<Mode>,

    /// Where result files are written
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Validate input records against the embedded schema
    #[serde(default = "default_true")]
    pub validate_schema: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            modes: default_modes(),
            output_dir: None,
            validate_schema: true,
        }
    }
}

impl EvalConfig {
    /// Parse from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: EvalConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EvalConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject settings the batch runner cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.modes.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one mode is required".to_string(),
            ));
        }
        Ok(())
    }
}
