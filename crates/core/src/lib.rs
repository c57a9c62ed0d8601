//! Feedback Descent core data models.
//!
//! This crate defines the data that flows through an optimization run:
//! candidates, pairwise evaluations, accumulated feedback and the
//! read-only run configuration. It performs no I/O.

#![warn(missing_docs)]

// Artifacts and verdicts
mod candidate;
mod evaluation;

// Run configuration and bookkeeping
mod config;
mod outcome;

// Re-exports
pub use candidate::{Candidate, CandidateId, Metadata};
pub use evaluation::{Evaluation, FeedbackEntry};
pub use config::{ConfigError, DomainConfig, RunConfig, DEFAULT_MODEL};
pub use outcome::{FeedbackLogEntry, IterationOutcome, Phase, RunSummary};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
