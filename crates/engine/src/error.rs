//! Error taxonomy for the loop and its collaborators.
//!
//! Proposal and evaluation failures come in two flavours: a recoverable
//! variant the loop turns into a discarded iteration, and a `Fatal` variant
//! that aborts the run. Nothing below the loop boundary catches a
//! recoverable error.

use descent_core::ConfigError;
use thiserror::Error;

/// Errors that must abort the run.
#[derive(Debug, Error)]
pub enum FatalError {
    /// A capability returned a value that breaks its contract
    #[error("contract violation by {role}: {detail}")]
    ContractViolation {
        /// Role that misbehaved (proposer, evaluator, ...)
        role: &'static str,
        /// What was wrong
        detail: String,
    },

    /// External cancellation while suspended in a capability call
    #[error("run cancelled")]
    Cancelled,

    /// Any other failure (transport, I/O, ...)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FatalError {
    /// Build a contract violation.
    pub fn contract(role: &'static str, detail: impl Into<String>) -> Self {
        Self::ContractViolation {
            role,
            detail: detail.into(),
        }
    }
}

/// Errors a Proposer can return.
#[derive(Debug, Error)]
pub enum ProposalError {
    /// No valid content after the proposer's own retry budget (recoverable)
    #[error("{0}")]
    Rejected(String),

    /// Abort the run
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

/// Order-bias mitigation never saw both orderings agree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("order bias mitigation: inconsistent results across orderings after {attempts} attempts")]
pub struct ConsistencyError {
    /// Paired comparisons that were run
    pub attempts: usize,
}

/// Errors an Evaluator can return.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The judge answered, but no verdict could be read from it (recoverable)
    #[error("Could not parse judge response: {0}")]
    Unparseable(String),

    /// A candidate could not be brought into comparable form (recoverable)
    #[error("candidate could not be judged: {0}")]
    Rejected(String),

    /// Verdicts disagreed across presentation orders (recoverable)
    #[error(transparent)]
    Inconsistent(#[from] ConsistencyError),

    /// Abort the run
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl EvaluationError {
    /// Whether the loop may skip the iteration and continue.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EvaluationError::Fatal(_))
    }
}

impl ProposalError {
    /// Whether the loop may skip the iteration and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProposalError::Rejected(_))
    }
}

/// Errors returned by [`crate::FeedbackDescent::run`].
#[derive(Debug, Error)]
pub enum DescentError {
    /// The configuration cannot drive a run
    #[error("invalid run configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A capability failed fatally
    #[error("iteration {iteration} aborted: {source}")]
    Fatal {
        /// Iteration in progress
        iteration: usize,
        /// Underlying failure
        #[source]
        source: FatalError,
    },

    /// The observer could not record an event
    #[error("observer failed at iteration {iteration}: {source}")]
    Observer {
        /// Iteration in progress
        iteration: usize,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },
}

impl DescentError {
    /// Whether the run ended because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            DescentError::Fatal {
                source: FatalError::Cancelled,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(ProposalError::Rejected("no svg".into()).is_recoverable());
        assert!(!ProposalError::Fatal(FatalError::Cancelled).is_recoverable());

        assert!(EvaluationError::Unparseable("??".into()).is_recoverable());
        assert!(EvaluationError::Inconsistent(ConsistencyError { attempts: 3 }).is_recoverable());
        assert!(!EvaluationError::Fatal(FatalError::contract("evaluator", "x")).is_recoverable());
    }

    #[test]
    fn test_consistency_error_message() {
        let err = EvaluationError::from(ConsistencyError { attempts: 3 });
        assert_eq!(
            err.to_string(),
            "order bias mitigation: inconsistent results across orderings after 3 attempts"
        );
    }

    #[test]
    fn test_cancelled_detection() {
        let err = DescentError::Fatal {
            iteration: 2,
            source: FatalError::Cancelled,
        };
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "iteration 2 aborted: run cancelled");
    }
}
