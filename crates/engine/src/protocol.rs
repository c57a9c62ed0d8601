//! Pairwise evaluation with order-bias mitigation.
//!
//! A judge may favour whichever candidate it sees first. With mitigation
//! enabled every verdict is asked for twice, once per presentation order,
//! and only accepted when both orders agree. Disagreement retries the whole
//! pair with fresh judge calls up to `max_attempts` times.

use crate::contracts::Evaluator;
use crate::error::{ConsistencyError, EvaluationError};
use crate::retry::{retry_with_budget, Attempt, RetryOutcome};
use async_trait::async_trait;
use descent_core::{Candidate, Evaluation};
use std::sync::Arc;
use tracing::{debug, warn};

/// Paired comparisons tried before giving up on consistency.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Order in which the two candidates are shown to the judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Challenger shown first ("A"), champion second ("B")
    ChallengerFirst,
    /// Champion shown first ("A"), challenger second ("B")
    ChampionFirst,
}

impl std::fmt::Display for Presentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Presentation::ChallengerFirst => write!(f, "A-B"),
            Presentation::ChampionFirst => write!(f, "B-A"),
        }
    }
}

/// A single pairwise judge call.
#[async_trait]
pub trait PairwiseJudge: Send + Sync {
    /// Comparable form of a candidate (a rendered image, extracted text, ...).
    type Exhibit: Send + Sync;

    /// Prepare a candidate for comparison. Called once per candidate per evaluation.
    async fn exhibit(&self, candidate: &Candidate) -> Result<Self::Exhibit, EvaluationError>;

    /// Compare once in the given presentation order.
    ///
    /// The returned `preferred` must already mean "challenger preferred",
    /// whatever position the challenger was shown in.
    async fn compare(
        &self,
        challenger: &Arc<Candidate>,
        challenger_exhibit: &Self::Exhibit,
        champion: &Arc<Candidate>,
        champion_exhibit: &Self::Exhibit,
        presentation: Presentation,
    ) -> Result<Evaluation, EvaluationError>;
}

/// [`Evaluator`] that cross-checks a [`PairwiseJudge`] under both presentation orders.
pub struct BiasMitigatedEvaluator<J> {
    judge: J,
    order_bias_mitigation: bool,
    max_attempts: usize,
}

impl<J: PairwiseJudge> BiasMitigatedEvaluator<J> {
    /// Create an evaluator around `judge`.
    pub fn new(judge: J, order_bias_mitigation: bool) -> Self {
        Self {
            judge,
            order_bias_mitigation,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Set the number of paired comparisons tried before giving up.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// The wrapped judge.
    pub fn judge(&self) -> &J {
        &self.judge
    }
}

/// Merge two agreeing sub-evaluations. Feedback comes from the A-B ordering.
fn combine(ab: Evaluation, ba: Evaluation) -> Evaluation {
    Evaluation {
        preferred: ab.preferred,
        rationale: format!("[A-B ordering]: {}\n[B-A ordering]: {}", ab.rationale, ba.rationale),
        feedback: ab.feedback,
        challenger: ab.challenger,
        champion: ab.champion,
        raw_response: format!("AB: {}\nBA: {}", ab.raw_response, ba.raw_response),
    }
}

#[async_trait]
impl<J: PairwiseJudge> Evaluator for BiasMitigatedEvaluator<J> {
    async fn evaluate(
        &self,
        challenger: &Arc<Candidate>,
        champion: &Arc<Candidate>,
    ) -> Result<Evaluation, EvaluationError> {
        let challenger_exhibit = self.judge.exhibit(challenger).await?;
        let champion_exhibit = self.judge.exhibit(champion).await?;

        if !self.order_bias_mitigation {
            return self
                .judge
                .compare(
                    challenger,
                    &challenger_exhibit,
                    champion,
                    &champion_exhibit,
                    Presentation::ChallengerFirst,
                )
                .await;
        }

        let judge = &self.judge;
        let (challenger_exhibit, champion_exhibit) = (&challenger_exhibit, &champion_exhibit);

        let outcome = retry_with_budget::<_, _, EvaluationError, _, _>(self.max_attempts, |attempt| async move {
            debug!(attempt = attempt + 1, "Running paired comparison");

            let (ab, ba) = tokio::join!(
                judge.compare(
                    challenger,
                    challenger_exhibit,
                    champion,
                    champion_exhibit,
                    Presentation::ChallengerFirst,
                ),
                judge.compare(
                    challenger,
                    challenger_exhibit,
                    champion,
                    champion_exhibit,
                    Presentation::ChampionFirst,
                ),
            );
            let (ab, ba) = (ab?, ba?);

            if ab.preferred == ba.preferred {
                Ok(Attempt::Done(combine(ab, ba)))
            } else {
                warn!(
                    attempt = attempt + 1,
                    ab = ab.preferred,
                    ba = ba.preferred,
                    "Orderings disagree"
                );
                Ok(Attempt::Retry((ab.preferred, ba.preferred)))
            }
        })
        .await?;

        match outcome {
            RetryOutcome::Succeeded { value, attempts } => {
                debug!(attempts, preferred = value.preferred, "Orderings agree");
                Ok(value)
            }
            RetryOutcome::Exhausted { attempts, .. } => Err(ConsistencyError { attempts }.into()),
        }
    }
}
