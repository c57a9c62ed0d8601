//! Run configuration - fixed before the loop starts, read-only afterwards.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Open, domain-specific configuration mapping.
pub type DomainConfig = serde_json::Map<String, serde_json::Value>;

/// Model used for both roles when none is given.
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4-20250514";

/// Errors raised when a configuration cannot be used for a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// max_iterations must be positive
    #[error("max_iterations must be at least 1")]
    NoIterations,

    /// A required text field is empty
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Process-wide configuration for one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// What the artifact depicts or is about
    pub subject: String,

    /// Rubric the judge compares against
    pub rubric_text: String,

    /// Domain identifier (selects the plugin)
    pub domain: String,

    /// Domain-specific settings
    #[serde(default)]
    pub domain_config: DomainConfig,

    /// Number of challenger iterations after the seed
    pub max_iterations: usize,

    /// Cross-check every verdict under both presentation orders
    pub order_bias_mitigation: bool,

    /// Model identifier for the proposer role
    pub proposer_model: String,

    /// Model identifier for the evaluator role
    pub evaluator_model: String,

    /// Show the rubric to the seed proposal (false = scratch seeding)
    pub informed_init: bool,

    /// Where run directories are created
    pub output_dir: PathBuf,
}

impl RunConfig {
    /// Create a configuration with defaults for everything but subject and rubric.
    pub fn new(subject: impl Into<String>, rubric_text: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            rubric_text: rubric_text.into(),
            domain: "svg".to_string(),
            domain_config: DomainConfig::new(),
            max_iterations: 20,
            order_bias_mitigation: true,
            proposer_model: DEFAULT_MODEL.to_string(),
            evaluator_model: DEFAULT_MODEL.to_string(),
            informed_init: true,
            output_dir: PathBuf::from("runs"),
        }
    }

    /// Check the invariants the loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if self.subject.trim().is_empty() {
            return Err(ConfigError::Empty("subject"));
        }
        if self.rubric_text.trim().is_empty() {
            return Err(ConfigError::Empty("rubric_text"));
        }
        if self.proposer_model.trim().is_empty() {
            return Err(ConfigError::Empty("proposer_model"));
        }
        if self.evaluator_model.trim().is_empty() {
            return Err(ConfigError::Empty("evaluator_model"));
        }
        Ok(())
    }

    /// Look up a string value in the domain configuration.
    pub fn domain_str(&self, key: &str) -> Option<&str> {
        self.domain_config.get(key).and_then(|v| v.as_str())
    }

    /// Look up an unsigned integer in the domain configuration.
    pub fn domain_u32(&self, key: &str, default: u32) -> u32 {
        self.domain_config
            .get(key)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default)
    }
}
