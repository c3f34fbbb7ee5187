//! # Evaluation Configuration
//!
//! Knobs that change how a strategy is evaluated without changing what it
//! means. Loaded from YAML or JSON; every field has a default, so an empty
//! document is a valid configuration.
//!
//! ```yaml
//! domain_policy: clamp     # reject (default) | clamp
//! parallel: true           # evaluate samples of a session concurrently
//! max_threads: 4           # worker cap for parallel sessions
//! symmetry_tolerance: 1e-9 # used by the transform self-check
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cytogate_transform::symmetry::DEFAULT_TOLERANCE;
use cytogate_transform::DomainPolicy;

/// Error loading an [`EvaluationConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read configuration '{path}': {reason}")]
    Io {
        /// File path.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// The document is not valid YAML or JSON for this schema.
    #[error("invalid {format} configuration: {reason}")]
    Parse {
        /// `yaml` or `json`.
        format: &'static str,
        /// Parser message.
        reason: String,
    },

    /// A field has an unusable value.
    #[error("invalid configuration field '{field}': {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong.
        reason: String,
    },
}

/// Evaluation options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluationConfig {
    /// Handling of out-of-domain transform input.
    pub domain_policy: DomainPolicy,
    /// Evaluate the samples of a session on a rayon pool.
    pub parallel: bool,
    /// Worker thread cap for parallel sessions; the global pool when unset.
    pub max_threads: Option<usize>,
    /// Relative tolerance of the transform symmetry self-check.
    pub symmetry_tolerance: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            domain_policy: DomainPolicy::Reject,
            parallel: false,
            max_threads: None,
            symmetry_tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl EvaluationConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse {
            format: "yaml",
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| ConfigError::Parse {
            format: "json",
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, choosing the format by extension (`.json` is JSON,
    /// anything else is read as YAML).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Check field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_threads",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.symmetry_tolerance.is_finite() && self.symmetry_tolerance > 0.0) {
            return Err(ConfigError::Invalid {
                field: "symmetry_tolerance",
                reason: format!("must be positive, got {}", self.symmetry_tolerance),
            });
        }
        Ok(())
    }
}
