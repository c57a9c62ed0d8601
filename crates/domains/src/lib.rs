//! Content domains for Feedback Descent.
//!
//! A domain turns a [`descent_core::RunConfig`] into the proposer, evaluator
//! and artifact renderer the engine drives, and serves the named subject and
//! rubric files a run is assembled from.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod plugin;
pub mod registry;
pub mod store;
pub mod svg;

pub use error::DomainError;
pub use loader::{build_run_config, RunRequest};
pub use plugin::{ConfigKind, DomainPlugin};
pub use registry::DomainRegistry;
pub use store::ConfigStore;
