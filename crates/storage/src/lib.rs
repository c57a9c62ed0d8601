//! Run persistence for Feedback Descent.
//!
//! [`RunTracker`] is a [`descent_engine::RunObserver`] that mirrors a run into
//! a directory of text, JSON and rendered artifacts. [`generate_trajectory_html`]
//! turns such a directory into a self-contained report.

#![warn(missing_docs)]

pub mod error;
pub mod report;
pub mod tracker;

pub use error::{Result, StorageError};
pub use report::generate_trajectory_html;
pub use tracker::{EvaluationRecord, RunTracker, SummaryRecord};
