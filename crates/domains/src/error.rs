//! Domain setup errors.

use crate::ConfigKind;
use std::path::PathBuf;

/// Errors raised while selecting a domain or assembling its configuration.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// No plugin is registered under this name
    #[error("Unknown domain '{name}'. Available: {available:?}")]
    UnknownDomain {
        /// Requested name
        name: String,
        /// Registered names
        available: Vec<String>,
    },

    /// Named subject/rubric file does not exist
    #[error("{kind} '{name}' not found. Available: {available:?}")]
    ConfigNotFound {
        /// Kind of config file
        kind: ConfigKind,
        /// Requested name
        name: String,
        /// Names that do exist
        available: Vec<String>,
    },

    /// A config file is malformed or lacks a required key
    #[error("invalid config {}: {message}", path.display())]
    InvalidConfig {
        /// Offending file
        path: PathBuf,
        /// What is wrong
        message: String,
    },

    /// Rasteriser name not recognised
    #[error("Unknown renderer '{name}'. Choose from: {available:?}")]
    UnknownRenderer {
        /// Requested name
        name: String,
        /// Supported names
        available: Vec<&'static str>,
    },

    /// The assembled run configuration is unusable
    #[error(transparent)]
    Config(#[from] descent_core::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
