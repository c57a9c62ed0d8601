//! Run directory tracker.
//!
//! Layout of a run directory:
//! ```text
//! run_YYYYmmdd_HHMMSS/
//!   config.json
//!   candidates/iter_NNN_challenger.txt
//!   evaluations/iter_NNN.json
//!   champions/champion_iter_NNN.{txt,<ext>}
//!   renders/iter_NNN_{challenger,champion}.<ext>   (with a renderer)
//!   final/final.{txt,<ext>}
//!   summary.json
//! ```

use crate::Result;
use async_trait::async_trait;
use descent_core::{Candidate, Evaluation, FeedbackLogEntry, Phase, RunConfig, RunSummary};
use descent_engine::{ArtifactRenderer, RunObserver};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// Persisted form of a single evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Iteration number
    pub iteration: usize,
    /// Whether the challenger won
    pub preferred: bool,
    /// Judge rationale
    #[serde(default)]
    pub rationale: String,
    /// Actionable feedback
    #[serde(default)]
    pub feedback: String,
    /// Iteration of the challenger
    pub challenger_iteration: usize,
    /// Iteration of the champion
    pub champion_iteration: usize,
    /// Raw judge output
    #[serde(default)]
    pub raw_response: String,
}

impl EvaluationRecord {
    /// Build the record for `evaluation` at `iteration`.
    pub fn new(iteration: usize, evaluation: &Evaluation) -> Self {
        Self {
            iteration,
            preferred: evaluation.preferred,
            rationale: evaluation.rationale.clone(),
            feedback: evaluation.feedback.clone(),
            challenger_iteration: evaluation.challenger.iteration,
            champion_iteration: evaluation.champion.iteration,
            raw_response: evaluation.raw_response.clone(),
        }
    }

    /// The matching feedback-log entry.
    pub fn log_entry(&self) -> FeedbackLogEntry {
        let (iteration, rationale, feedback) = (self.iteration, self.rationale.clone(), self.feedback.clone());
        let (champion_iteration, challenger_iteration) = (self.champion_iteration, self.challenger_iteration);
        if self.preferred {
            FeedbackLogEntry::ChallengerWins {
                iteration,
                rationale,
                feedback,
                champion_iteration,
                challenger_iteration,
            }
        } else {
            FeedbackLogEntry::ChampionRetained {
                iteration,
                rationale,
                feedback,
                champion_iteration,
                challenger_iteration,
            }
        }
    }
}

/// Contents of `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Run statistics
    #[serde(flatten)]
    pub summary: RunSummary,
    /// Every iteration outcome in order
    #[serde(default)]
    pub feedback_log: Vec<FeedbackLogEntry>,
}

/// Observer persisting a run to disk.
pub struct RunTracker {
    run_dir: PathBuf,
    renderer: Option<Arc<dyn ArtifactRenderer>>,
    feedback_log: Vec<FeedbackLogEntry>,
}

impl RunTracker {
    /// Create `run_<timestamp>` under `config.output_dir` and record the config.
    pub async fn create(config: &RunConfig, renderer: Option<Arc<dyn ArtifactRenderer>>) -> Result<Self> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let run_dir = config.output_dir.join(format!("run_{}", timestamp));
        Self::create_in(run_dir, config, renderer).await
    }

    /// Use `run_dir` as the run directory.
    pub async fn create_in(
        run_dir: impl AsRef<Path>,
        config: &RunConfig,
        renderer: Option<Arc<dyn ArtifactRenderer>>,
    ) -> Result<Self> {
        let run_dir = run_dir.as_ref().to_path_buf();

        fs::create_dir_all(run_dir.join("candidates")).await?;
        fs::create_dir_all(run_dir.join("evaluations")).await?;
        fs::create_dir_all(run_dir.join("champions")).await?;
        fs::create_dir_all(run_dir.join("final")).await?;
        if renderer.is_some() {
            fs::create_dir_all(run_dir.join("renders")).await?;
        }

        let stored = serde_json::json!({
            "subject": config.subject,
            "domain": config.domain,
            "domain_config": config.domain_config,
            "rubric_text": config.rubric_text,
            "max_iterations": config.max_iterations,
            "order_bias_mitigation": config.order_bias_mitigation,
            "proposer_model": config.proposer_model,
            "evaluator_model": config.evaluator_model,
            "informed_init": config.informed_init,
        });
        fs::write(run_dir.join("config.json"), serde_json::to_string_pretty(&stored)?).await?;

        info!("Run directory: {}", run_dir.display());

        Ok(Self {
            run_dir,
            renderer,
            feedback_log: Vec::new(),
        })
    }

    /// The run directory.
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Render `candidate` and write it to every path in `targets`
    /// (relative to the run directory, without extension).
    async fn save_render(&self, candidate: &Candidate, targets: &[String]) -> Result<()> {
        let Some(renderer) = &self.renderer else {
            return Ok(());
        };

        let bytes = match renderer.render(candidate).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("No render for iteration {}", candidate.iteration);
                return Ok(());
            }
            Err(e) => {
                warn!("Render failed for iteration {}: {:#}", candidate.iteration, e);
                return Ok(());
            }
        };

        for target in targets {
            let path = self.run_dir.join(format!("{}.{}", target, renderer.extension()));
            fs::write(&path, &bytes).await?;
        }
        Ok(())
    }

    async fn save_champion(&self, iteration: usize, champion: &Candidate) -> Result<()> {
        fs::write(
            self.run_dir.join(format!("champions/champion_iter_{:03}.txt", iteration)),
            &champion.content,
        )
        .await?;

        self.save_render(
            champion,
            &[
                format!("champions/champion_iter_{:03}", iteration),
                format!("renders/iter_{:03}_champion", iteration),
            ],
        )
        .await
    }

    async fn save_challenger(&self, iteration: usize, challenger: &Candidate) -> Result<()> {
        fs::write(
            self.run_dir.join(format!("candidates/iter_{:03}_challenger.txt", iteration)),
            &challenger.content,
        )
        .await?;

        self.save_render(challenger, &[format!("renders/iter_{:03}_challenger", iteration)])
            .await
    }

    async fn save_evaluation(&mut self, iteration: usize, evaluation: &Evaluation) -> Result<()> {
        let record = EvaluationRecord::new(iteration, evaluation);
        fs::write(
            self.run_dir.join(format!("evaluations/iter_{:03}.json", iteration)),
            serde_json::to_string_pretty(&record)?,
        )
        .await?;

        self.feedback_log.push(record.log_entry());
        Ok(())
    }

    async fn save_final(&self, champion: &Candidate, summary: &RunSummary) -> Result<()> {
        fs::write(self.run_dir.join("final/final.txt"), &champion.content).await?;
        self.save_render(champion, &["final/final".to_string()]).await?;

        let record = SummaryRecord {
            summary: summary.clone(),
            feedback_log: self.feedback_log.clone(),
        };
        fs::write(
            self.run_dir.join("summary.json"),
            serde_json::to_string_pretty(&record)?,
        )
        .await?;

        info!("Saved final champion to {}", self.run_dir.join("final").display());
        Ok(())
    }
}

#[async_trait]
impl RunObserver for RunTracker {
    async fn on_seed(&mut self, seed: &Arc<Candidate>) -> anyhow::Result<()> {
        Ok(self.save_champion(0, seed).await?)
    }

    async fn on_challenger(&mut self, iteration: usize, challenger: &Arc<Candidate>) -> anyhow::Result<()> {
        Ok(self.save_challenger(iteration, challenger).await?)
    }

    async fn on_evaluation(&mut self, iteration: usize, evaluation: &Evaluation) -> anyhow::Result<()> {
        Ok(self.save_evaluation(iteration, evaluation).await?)
    }

    async fn on_champion_updated(&mut self, iteration: usize, champion: &Arc<Candidate>) -> anyhow::Result<()> {
        Ok(self.save_champion(iteration, champion).await?)
    }

    async fn on_discarded(&mut self, iteration: usize, phase: Phase, reason: &str) -> anyhow::Result<()> {
        self.feedback_log.push(FeedbackLogEntry::Discarded {
            iteration,
            reason: reason.to_string(),
            phase,
        });
        Ok(())
    }

    async fn on_finalized(&mut self, champion: &Arc<Candidate>, summary: &RunSummary) -> anyhow::Result<()> {
        Ok(self.save_final(champion, summary).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    enum Mode {
        Bytes,
        Nothing,
        Broken,
    }

    struct FakeRenderer(Mode);

    #[async_trait]
    impl ArtifactRenderer for FakeRenderer {
        fn media_type(&self) -> &str {
            "image/png"
        }

        fn extension(&self) -> &str {
            "png"
        }

        async fn render(&self, candidate: &Candidate) -> anyhow::Result<Option<Vec<u8>>> {
            match self.0 {
                Mode::Bytes => Ok(Some(format!("png:{}", candidate.content).into_bytes())),
                Mode::Nothing => Ok(None),
                Mode::Broken => anyhow::bail!("rasterizer crashed"),
            }
        }
    }

    fn evaluation(challenger: &Arc<Candidate>, champion: &Arc<Candidate>, preferred: bool) -> Evaluation {
        Evaluation {
            preferred,
            rationale: "sharper outline".to_string(),
            feedback: "Preserve: outline. Improve: colors.".to_string(),
            challenger: challenger.clone(),
            champion: champion.clone(),
            raw_response: "{\"winner\": \"A\"}".to_string(),
        }
    }

    async fn tracker(dir: &Path, renderer: Option<FakeRenderer>) -> RunTracker {
        let config = RunConfig::new("a red fox", "Judge the anatomy.");
        let renderer = renderer.map(|r| Arc::new(r) as Arc<dyn ArtifactRenderer>);
        RunTracker::create_in(dir.join("run"), &config, renderer).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_writes_config() {
        let dir = tempdir().expect("tempdir");
        let tracker = tracker(dir.path(), None).await;

        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(tracker.run_dir().join("config.json")).unwrap()).unwrap();
        assert_eq!(config["subject"], "a red fox");
        assert_eq!(config["max_iterations"], 20);
        assert!(tracker.run_dir().join("champions").is_dir());
        assert!(!tracker.run_dir().join("renders").exists());
    }

    #[tokio::test]
    async fn test_create_uses_timestamped_dir() {
        let dir = tempdir().expect("tempdir");
        let mut config = RunConfig::new("a red fox", "Judge the anatomy.");
        config.output_dir = dir.path().to_path_buf();

        let tracker = RunTracker::create(&config, None).await.unwrap();

        let name = tracker.run_dir().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("run_"));
        assert_eq!(name.len(), "run_20260101_120000".len());
    }

    #[tokio::test]
    async fn test_full_run_layout() {
        let dir = tempdir().expect("tempdir");
        let mut tracker = tracker(dir.path(), Some(FakeRenderer(Mode::Bytes))).await;
        let run_dir = tracker.run_dir().to_path_buf();

        let seed = Arc::new(Candidate::new("<svg>0</svg>", 0));
        let c1 = Arc::new(Candidate::new("<svg>1</svg>", 1));
        let c2 = Arc::new(Candidate::new("<svg>2</svg>", 2));

        tracker.on_seed(&seed).await.unwrap();
        tracker.on_challenger(1, &c1).await.unwrap();
        tracker.on_evaluation(1, &evaluation(&c1, &seed, true)).await.unwrap();
        tracker.on_champion_updated(1, &c1).await.unwrap();
        tracker.on_challenger(2, &c2).await.unwrap();
        tracker.on_evaluation(2, &evaluation(&c2, &c1, false)).await.unwrap();
        tracker.on_champion_retained(2, &c1).await.unwrap();
        tracker.on_discarded(3, Phase::Proposal, "No valid SVG found in LLM response").await.unwrap();

        let mut summary = RunSummary::new(3);
        summary.record_champion(0);
        summary.record_champion(1);
        summary.record_discard(3);
        tracker.on_finalized(&c1, &summary).await.unwrap();

        let read = |p: &str| std::fs::read_to_string(run_dir.join(p)).unwrap();
        assert_eq!(read("champions/champion_iter_000.txt"), "<svg>0</svg>");
        assert_eq!(read("champions/champion_iter_001.png"), "png:<svg>1</svg>");
        assert_eq!(read("renders/iter_001_champion.png"), "png:<svg>1</svg>");
        assert_eq!(read("renders/iter_002_challenger.png"), "png:<svg>2</svg>");
        assert_eq!(read("candidates/iter_002_challenger.txt"), "<svg>2</svg>");
        assert_eq!(read("final/final.txt"), "<svg>1</svg>");
        assert_eq!(read("final/final.png"), "png:<svg>1</svg>");
        assert!(!run_dir.join("champions/champion_iter_002.txt").exists());

        let record: EvaluationRecord = serde_json::from_str(&read("evaluations/iter_002.json")).unwrap();
        assert!(!record.preferred);
        assert_eq!(record.challenger_iteration, 2);
        assert_eq!(record.champion_iteration, 1);

        let stored: SummaryRecord = serde_json::from_str(&read("summary.json")).unwrap();
        assert_eq!(stored.summary.champion_update_iterations, vec![0, 1]);
        assert_eq!(stored.summary.final_champion_iteration, 1);
        assert_eq!(stored.feedback_log.len(), 3);
        assert!(matches!(stored.feedback_log[0], FeedbackLogEntry::ChallengerWins { iteration: 1, .. }));
        assert!(matches!(stored.feedback_log[1], FeedbackLogEntry::ChampionRetained { iteration: 2, .. }));
        assert!(matches!(
            stored.feedback_log[2],
            FeedbackLogEntry::Discarded { iteration: 3, phase: Phase::Proposal, .. }
        ));

        let raw: serde_json::Value = serde_json::from_str(&read("summary.json")).unwrap();
        assert_eq!(raw["champion_updates"], 2);
        assert_eq!(raw["feedback_log"][0]["outcome"], "challenger_wins");
    }

    #[tokio::test]
    async fn test_renderer_none_and_errors_are_skipped() {
        for mode in [Mode::Nothing, Mode::Broken] {
            let dir = tempdir().expect("tempdir");
            let mut tracker = tracker(dir.path(), Some(FakeRenderer(mode))).await;
            let seed = Arc::new(Candidate::new("<svg/>", 0));

            tracker.on_seed(&seed).await.unwrap();

            assert!(tracker.run_dir().join("champions/champion_iter_000.txt").exists());
            assert!(!tracker.run_dir().join("champions/champion_iter_000.png").exists());
            assert!(!tracker.run_dir().join("renders/iter_000_champion.png").exists());
        }
    }

    #[tokio::test]
    async fn test_write_failure_surfaces() {
        let dir = tempdir().expect("tempdir");
        let mut tracker = tracker(dir.path(), None).await;
        std::fs::remove_dir_all(tracker.run_dir().join("candidates")).unwrap();

        let challenger = Arc::new(Candidate::new("<svg/>", 1));
        assert!(tracker.on_challenger(1, &challenger).await.is_err());
    }
}
