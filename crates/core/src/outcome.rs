//! Iteration outcomes and run-level bookkeeping.

use serde::{Deserialize, Serialize};

/// The step of an iteration that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Producing the challenger
    Proposal,
    /// Judging challenger against champion
    Evaluation,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Proposal => write!(f, "proposal"),
            Phase::Evaluation => write!(f, "evaluation"),
        }
    }
}

/// What happened in a single iteration. Every iteration in `1..=max_iterations`
/// ends in exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The challenger won and became champion
    ChampionUpdated,
    /// The champion won
    ChampionRetained,
    /// The iteration was skipped after a recoverable failure
    Discarded {
        /// Where it failed
        phase: Phase,
        /// Why
        reason: String,
    },
}

/// One line of the persisted feedback log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeedbackLogEntry {
    /// Challenger preferred
    ChallengerWins {
        /// Iteration number
        iteration: usize,
        /// Judge rationale
        #[serde(default)]
        rationale: String,
        /// Actionable feedback
        #[serde(default)]
        feedback: String,
        /// Iteration of the champion that lost
        champion_iteration: usize,
        /// Iteration of the challenger
        challenger_iteration: usize,
    },
    /// Champion preferred
    ChampionRetained {
        /// Iteration number
        iteration: usize,
        /// Judge rationale
        #[serde(default)]
        rationale: String,
        /// Actionable feedback
        #[serde(default)]
        feedback: String,
        /// Iteration of the champion that held
        champion_iteration: usize,
        /// Iteration of the challenger
        challenger_iteration: usize,
    },
    /// Iteration skipped
    Discarded {
        /// Iteration number
        iteration: usize,
        /// Failure reason
        reason: String,
        /// Failed phase
        phase: Phase,
    },
}

impl FeedbackLogEntry {
    /// Iteration the entry belongs to.
    pub fn iteration(&self) -> usize {
        match self {
            FeedbackLogEntry::ChallengerWins { iteration, .. }
            | FeedbackLogEntry::ChampionRetained { iteration, .. }
            | FeedbackLogEntry::Discarded { iteration, .. } => *iteration,
        }
    }
}

/// Summary statistics of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Iterations configured for the run (seed excluded)
    pub total_iterations: usize,
    /// Number of times a champion was established, seed included
    pub champion_updates: usize,
    /// Iterations at which the champion changed, seed (0) first
    pub champion_update_iterations: Vec<usize>,
    /// Iteration that produced the final champion
    pub final_champion_iteration: usize,
    /// Iterations skipped after a recoverable failure
    pub discarded_iterations: Vec<usize>,
}

impl RunSummary {
    /// Create an empty summary for a run of `total_iterations`.
    pub fn new(total_iterations: usize) -> Self {
        Self {
            total_iterations,
            ..Default::default()
        }
    }

    /// Record that a champion was established at `iteration`.
    pub fn record_champion(&mut self, iteration: usize) {
        self.champion_update_iterations.push(iteration);
        self.champion_updates = self.champion_update_iterations.len();
        self.final_champion_iteration = iteration;
    }

    /// Record that `iteration` was discarded.
    pub fn record_discard(&mut self, iteration: usize) {
        self.discarded_iterations.push(iteration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Proposal.to_string(), "proposal");
        assert_eq!(Phase::Evaluation.to_string(), "evaluation");
    }

    #[test]
    fn test_feedback_log_entry_tagging() {
        let entry = FeedbackLogEntry::Discarded {
            iteration: 4,
            reason: "No valid SVG found in LLM response".to_string(),
            phase: Phase::Proposal,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["outcome"], "discarded");
        assert_eq!(json["phase"], "proposal");
        assert_eq!(entry.iteration(), 4);

        let win: FeedbackLogEntry = serde_json::from_value(serde_json::json!({
            "outcome": "challenger_wins",
            "iteration": 2,
            "rationale": "cleaner lines",
            "champion_iteration": 0,
            "challenger_iteration": 2,
        }))
        .unwrap();
        assert!(matches!(win, FeedbackLogEntry::ChallengerWins { ref feedback, .. } if feedback.is_empty()));
    }

    #[test]
    fn test_summary_records_champions() {
        let mut summary = RunSummary::new(5);
        summary.record_champion(0);
        summary.record_champion(3);
        summary.record_discard(4);

        assert_eq!(summary.champion_updates, 2);
        assert_eq!(summary.champion_update_iterations, vec![0, 3]);
        assert_eq!(summary.final_champion_iteration, 3);
        assert_eq!(summary.discarded_iterations, vec![4]);
    }
}
