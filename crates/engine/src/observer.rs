//! Reporting surface of the loop.
//!
//! The loop calls these hooks at fixed points and never reads anything back.
//! Each event fires once. An error returned from a hook aborts the run.

use async_trait::async_trait;
use descent_core::{Candidate, Evaluation, Phase, RunSummary};
use std::sync::Arc;

/// Receives run events in the order they happen.
#[async_trait]
pub trait RunObserver: Send {
    /// The seed became the first champion (iteration 0).
    async fn on_seed(&mut self, _seed: &Arc<Candidate>) -> anyhow::Result<()> {
        Ok(())
    }

    /// A challenger was proposed.
    async fn on_challenger(&mut self, _iteration: usize, _challenger: &Arc<Candidate>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The challenger was judged.
    async fn on_evaluation(&mut self, _iteration: usize, _evaluation: &Evaluation) -> anyhow::Result<()> {
        Ok(())
    }

    /// The challenger won and is now champion.
    async fn on_champion_updated(&mut self, _iteration: usize, _champion: &Arc<Candidate>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The champion won.
    async fn on_champion_retained(&mut self, _iteration: usize, _champion: &Arc<Candidate>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The iteration was skipped after a recoverable failure.
    async fn on_discarded(&mut self, _iteration: usize, _phase: Phase, _reason: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// The run finished.
    async fn on_finalized(&mut self, _champion: &Arc<Candidate>, _summary: &RunSummary) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}
