//! Feedback Descent engine.
//!
//! Drives the champion/challenger loop:
//! ```text
//! Seed → Propose → Evaluate (both orderings) → Promote or Accumulate → ... → Finalize
//! ```
//! The engine knows nothing about what a candidate contains. Domains plug in
//! through the [`Proposer`], [`Evaluator`] and [`ArtifactRenderer`] contracts,
//! and everything that happens is reported to a [`RunObserver`].

#![warn(missing_docs)]

pub mod contracts;
pub mod engine;
pub mod error;
pub mod observer;
pub mod protocol;
pub mod retry;

pub use contracts::{ArtifactRenderer, DomainComponents, Evaluator, Proposer};
pub use engine::{FeedbackDescent, LoopConfig, RunReport};
pub use error::{ConsistencyError, DescentError, EvaluationError, FatalError, ProposalError};
pub use observer::{NoopObserver, RunObserver};
pub use protocol::{BiasMitigatedEvaluator, PairwiseJudge, Presentation, DEFAULT_MAX_ATTEMPTS};
pub use retry::{retry_with_budget, Attempt, RetryOutcome};
