//! The optimization loop - champion/challenger descent over feedback.

use crate::contracts::{DomainComponents, Evaluator, Proposer};
use crate::error::{DescentError, EvaluationError, FatalError, ProposalError};
use crate::observer::RunObserver;
use descent_core::{Candidate, ConfigError, FeedbackEntry, IterationOutcome, Phase, RunConfig, RunSummary};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Configuration for the loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Challenger iterations after the seed
    pub max_iterations: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self { max_iterations: 20 }
    }
}

impl From<&RunConfig> for LoopConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Final champion
    pub champion: Arc<Candidate>,
    /// Summary statistics
    pub summary: RunSummary,
    /// Outcome of iterations `1..=max_iterations`, in order
    pub outcomes: Vec<IterationOutcome>,
}

/// State owned by the loop between iterations.
#[derive(Debug)]
struct Frontier {
    champion: Arc<Candidate>,
    feedback: Vec<FeedbackEntry>,
}

enum LoopState {
    Seeding,
    Iterating { iteration: usize, frontier: Frontier },
    Terminal(Frontier),
}

/// Feedback Descent.
///
/// Runs the loop:
/// ```text
/// Seed → (Propose → Evaluate → Promote or Accumulate) × max_iterations → Finalize
/// ```
pub struct FeedbackDescent {
    proposer: Arc<dyn Proposer>,
    evaluator: Arc<dyn Evaluator>,
    config: LoopConfig,
    cancellation: Option<watch::Receiver<bool>>,
}

impl FeedbackDescent {
    /// Create a loop over the given capabilities.
    pub fn new(proposer: Arc<dyn Proposer>, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            proposer,
            evaluator,
            config: LoopConfig::default(),
            cancellation: None,
        }
    }

    /// Create a loop over a domain's components.
    pub fn from_components(components: &DomainComponents) -> Self {
        Self::new(components.proposer.clone(), components.evaluator.clone())
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Abort the run once `signal` becomes true.
    pub fn with_cancellation(mut self, signal: watch::Receiver<bool>) -> Self {
        self.cancellation = Some(signal);
        self
    }

    /// Run to completion and return the final champion.
    pub async fn run<O>(&self, observer: &mut O) -> Result<RunReport, DescentError>
    where
        O: RunObserver + ?Sized,
    {
        let max_iterations = self.config.max_iterations;
        if max_iterations == 0 {
            return Err(ConfigError::NoIterations.into());
        }

        let mut summary = RunSummary::new(max_iterations);
        let mut outcomes = Vec::with_capacity(max_iterations);
        let mut state = LoopState::Seeding;

        let frontier = loop {
            state = match state {
                LoopState::Seeding => {
                    let frontier = self.seed(observer).await?;
                    summary.record_champion(0);
                    LoopState::Iterating { iteration: 1, frontier }
                }
                LoopState::Iterating { iteration, frontier } if iteration > max_iterations => {
                    LoopState::Terminal(frontier)
                }
                LoopState::Iterating { iteration, mut frontier } => {
                    info!("Iteration {}/{}", iteration, max_iterations);

                    let outcome = self.step(iteration, &mut frontier, observer).await?;
                    match &outcome {
                        IterationOutcome::ChampionUpdated => summary.record_champion(iteration),
                        IterationOutcome::ChampionRetained => {}
                        IterationOutcome::Discarded { .. } => summary.record_discard(iteration),
                    }
                    outcomes.push(outcome);

                    LoopState::Iterating {
                        iteration: iteration + 1,
                        frontier,
                    }
                }
                LoopState::Terminal(frontier) => break frontier,
            };
        };

        info!(
            "Run complete: {} champion updates, final champion from iteration {}",
            summary.champion_updates, summary.final_champion_iteration
        );

        observer
            .on_finalized(&frontier.champion, &summary)
            .await
            .map_err(|source| DescentError::Observer {
                iteration: max_iterations,
                source,
            })?;

        Ok(RunReport {
            champion: frontier.champion,
            summary,
            outcomes,
        })
    }

    /// Iteration 0: the seed becomes champion unconditionally.
    async fn seed<O>(&self, observer: &mut O) -> Result<Frontier, DescentError>
    where
        O: RunObserver + ?Sized,
    {
        info!("Generating seed candidate");

        let seed = self
            .guard(self.proposer.propose(None, &[], 0))
            .await
            .map_err(|e| match e {
                ProposalError::Fatal(source) => fatal(0, source),
                // Without a seed there is nothing to iterate on
                ProposalError::Rejected(reason) => fatal(
                    0,
                    FatalError::Other(anyhow::anyhow!("seed proposal failed: {}", reason)),
                ),
            })?;

        if !seed.is_seed() {
            return Err(fatal(
                0,
                FatalError::contract(
                    "proposer",
                    format!("seed carries iteration {}, expected 0", seed.iteration),
                ),
            ));
        }

        let champion = Arc::new(seed);
        observer
            .on_seed(&champion)
            .await
            .map_err(|source| DescentError::Observer { iteration: 0, source })?;

        Ok(Frontier {
            champion,
            feedback: Vec::new(),
        })
    }

    /// One challenger iteration. `frontier` is touched only when the
    /// evaluation succeeds.
    async fn step<O>(
        &self,
        iteration: usize,
        frontier: &mut Frontier,
        observer: &mut O,
    ) -> Result<IterationOutcome, DescentError>
    where
        O: RunObserver + ?Sized,
    {
        let observed = |source| DescentError::Observer { iteration, source };

        // 1. Propose
        let proposal = self
            .guard(
                self.proposer
                    .propose(Some(&frontier.champion), &frontier.feedback, iteration),
            )
            .await;

        let challenger = match proposal {
            Ok(candidate) => candidate,
            Err(ProposalError::Rejected(reason)) => {
                return self.discard(iteration, Phase::Proposal, reason, observer).await;
            }
            Err(ProposalError::Fatal(source)) => return Err(fatal(iteration, source)),
        };

        if challenger.iteration != iteration {
            return Err(fatal(
                iteration,
                FatalError::contract(
                    "proposer",
                    format!(
                        "challenger carries iteration {}, expected {}",
                        challenger.iteration, iteration
                    ),
                ),
            ));
        }

        let challenger = Arc::new(challenger);
        observer.on_challenger(iteration, &challenger).await.map_err(observed)?;

        // 2. Evaluate
        let evaluation = match self
            .guard(self.evaluator.evaluate(&challenger, &frontier.champion))
            .await
        {
            Ok(evaluation) => evaluation,
            Err(EvaluationError::Fatal(source)) => return Err(fatal(iteration, source)),
            Err(e) => {
                return self.discard(iteration, Phase::Evaluation, e.to_string(), observer).await;
            }
        };

        if !evaluation.refers_to(&challenger, &frontier.champion) {
            return Err(fatal(
                iteration,
                FatalError::contract("evaluator", "evaluation refers to a different candidate pair"),
            ));
        }

        observer.on_evaluation(iteration, &evaluation).await.map_err(observed)?;

        // 3. Accumulate feedback, win or lose
        frontier.feedback.push(FeedbackEntry::new(
            challenger.clone(),
            evaluation.feedback.clone(),
            iteration,
        ));

        // 4. Promote or retain
        if evaluation.preferred {
            info!(
                "Champion updated at iteration {}: {}",
                iteration,
                truncate(&evaluation.rationale, 120)
            );
            frontier.champion = challenger;
            frontier.feedback.clear();
            observer
                .on_champion_updated(iteration, &frontier.champion)
                .await
                .map_err(observed)?;
            Ok(IterationOutcome::ChampionUpdated)
        } else {
            info!(
                "Champion retained at iteration {}: {}",
                iteration,
                truncate(&evaluation.rationale, 120)
            );
            debug!(feedback_entries = frontier.feedback.len(), "Feedback accumulated");
            observer
                .on_champion_retained(iteration, &frontier.champion)
                .await
                .map_err(observed)?;
            Ok(IterationOutcome::ChampionRetained)
        }
    }

    async fn discard<O>(
        &self,
        iteration: usize,
        phase: Phase,
        reason: String,
        observer: &mut O,
    ) -> Result<IterationOutcome, DescentError>
    where
        O: RunObserver + ?Sized,
    {
        warn!(iteration, %phase, "Iteration discarded: {}", reason);
        observer
            .on_discarded(iteration, phase, &reason)
            .await
            .map_err(|source| DescentError::Observer { iteration, source })?;
        Ok(IterationOutcome::Discarded { phase, reason })
    }

    /// Race a capability call against the cancellation signal.
    async fn guard<T, E, F>(&self, call: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<FatalError>,
    {
        let Some(mut signal) = self.cancellation.clone() else {
            return call.await;
        };

        if *signal.borrow_and_update() {
            return Err(FatalError::Cancelled.into());
        }

        tokio::select! {
            result = call => result,
            _ = cancelled(&mut signal) => Err(FatalError::Cancelled.into()),
        }
    }
}

/// Resolves once the signal turns true. Never resolves if the sender is gone.
async fn cancelled(signal: &mut watch::Receiver<bool>) {
    loop {
        if signal.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        if *signal.borrow_and_update() {
            return;
        }
    }
}

fn fatal(iteration: usize, source: FatalError) -> DescentError {
    DescentError::Fatal { iteration, source }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
