//! Capability contracts consumed by the loop.
//!
//! The loop only ever talks to these traits. What a candidate contains and
//! how it is judged belongs to the domain that implements them.

use crate::error::{EvaluationError, ProposalError};
use async_trait::async_trait;
use descent_core::{Candidate, Evaluation, FeedbackEntry};
use std::sync::Arc;

/// Produces candidates.
#[async_trait]
pub trait Proposer: Send + Sync {
    /// Propose a candidate for `iteration`.
    ///
    /// `champion` is `None` only for the seed (iteration 0), together with an
    /// empty `feedback_history`. Returns `ProposalError::Rejected` when no
    /// valid content could be produced within the proposer's own retry budget.
    async fn propose(
        &self,
        champion: Option<&Arc<Candidate>>,
        feedback_history: &[FeedbackEntry],
        iteration: usize,
    ) -> Result<Candidate, ProposalError>;
}

/// Judges a challenger against the champion.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Compare `challenger` with `champion`. `Evaluation::preferred` is true
    /// when the challenger wins.
    async fn evaluate(
        &self,
        challenger: &Arc<Candidate>,
        champion: &Arc<Candidate>,
    ) -> Result<Evaluation, EvaluationError>;
}

/// Converts a candidate into a displayable binary form for audit.
#[async_trait]
pub trait ArtifactRenderer: Send + Sync {
    /// Media type of rendered artifacts, e.g. `image/png`.
    fn media_type(&self) -> &str;

    /// File extension of rendered artifacts, e.g. `png`.
    fn extension(&self) -> &str;

    /// Render a candidate. `Ok(None)` means there is no visual form for it.
    async fn render(&self, candidate: &Candidate) -> anyhow::Result<Option<Vec<u8>>>;
}

/// The capabilities a domain contributes to a run.
#[derive(Clone)]
pub struct DomainComponents {
    /// Candidate producer
    pub proposer: Arc<dyn Proposer>,
    /// Pairwise judge
    pub evaluator: Arc<dyn Evaluator>,
    /// Optional renderer for persisted artifacts
    pub artifact_renderer: Option<Arc<dyn ArtifactRenderer>>,
}
