//! Evaluation model - pairwise verdicts and the feedback they leave behind.

use crate::candidate::Candidate;
use std::sync::Arc;

/// The verdict of comparing a challenger against the champion.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// True if the challenger is preferred over the champion
    pub preferred: bool,

    /// Human-readable explanation of the verdict
    pub rationale: String,

    /// Actionable guidance for the next proposal
    pub feedback: String,

    /// The candidate that challenged
    pub challenger: Arc<Candidate>,

    /// The champion it was compared against
    pub champion: Arc<Candidate>,

    /// Raw judge output, kept for audit
    pub raw_response: String,
}

impl Evaluation {
    /// Whether this evaluation refers to exactly the given pair.
    pub fn refers_to(&self, challenger: &Candidate, champion: &Candidate) -> bool {
        self.challenger.id == challenger.id && self.champion.id == champion.id
    }
}

/// One piece of actionable feedback, tied to the challenger that earned it.
#[derive(Debug, Clone)]
pub struct FeedbackEntry {
    /// The challenger the feedback was produced for
    pub candidate: Arc<Candidate>,

    /// Actionable feedback text
    pub feedback: String,

    /// Iteration at which it was produced
    pub iteration: usize,
}

impl FeedbackEntry {
    /// Create a new feedback entry.
    pub fn new(candidate: Arc<Candidate>, feedback: impl Into<String>, iteration: usize) -> Self {
        Self {
            candidate,
            feedback: feedback.into(),
            iteration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_refers_to_pair() {
        let champion = Arc::new(Candidate::new("a", 0));
        let challenger = Arc::new(Candidate::new("b", 1));
        let stranger = Candidate::new("c", 1);

        let evaluation = Evaluation {
            preferred: true,
            rationale: "b is better".to_string(),
            feedback: "keep going".to_string(),
            challenger: challenger.clone(),
            champion: champion.clone(),
            raw_response: String::new(),
        };

        assert!(evaluation.refers_to(&challenger, &champion));
        assert!(!evaluation.refers_to(&stranger, &champion));
        assert!(!evaluation.refers_to(&champion, &challenger));
    }
}
