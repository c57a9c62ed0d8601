//! LLM-backed SVG proposer.

use super::parser::{extract_svg, NO_SVG};
use super::prompts::{improvement_prompt, seed_prompt, ProposalContext};
use async_trait::async_trait;
use descent_core::{Candidate, FeedbackEntry, RunConfig};
use descent_engine::{retry_with_budget, Attempt, FatalError, ProposalError, Proposer, RetryOutcome};
use descent_llm::{ChatModel, GenerateOptions};
use std::sync::Arc;
use tracing::{debug, warn};

/// Generation attempts per proposal.
pub const MAX_EXTRACTION_ATTEMPTS: usize = 3;

/// Proposes SVG markup for the configured subject.
pub struct SvgProposer {
    llm: Arc<dyn ChatModel>,
    config: Arc<RunConfig>,
}

impl SvgProposer {
    /// Create a proposer.
    pub fn new(llm: Arc<dyn ChatModel>, config: Arc<RunConfig>) -> Self {
        Self { llm, config }
    }

    fn context(&self) -> Result<ProposalContext<'_>, FatalError> {
        let description = self
            .config
            .domain_str("description")
            .ok_or_else(|| FatalError::contract("proposer", "subject has no 'description'"))?;

        Ok(ProposalContext {
            subject: &self.config.subject,
            description,
            rubric: &self.config.rubric_text,
            informed_init: self.config.informed_init,
        })
    }
}

#[async_trait]
impl Proposer for SvgProposer {
    async fn propose(
        &self,
        champion: Option<&Arc<Candidate>>,
        feedback_history: &[FeedbackEntry],
        iteration: usize,
    ) -> Result<Candidate, ProposalError> {
        let ctx = self.context()?;
        let prompt = match champion {
            None => seed_prompt(&ctx),
            Some(champion) => improvement_prompt(&ctx, &champion.content, iteration, feedback_history),
        };
        let prompt = &prompt;
        let llm = &self.llm;

        let outcome = retry_with_budget::<_, _, ProposalError, _, _>(MAX_EXTRACTION_ATTEMPTS, |attempt| async move {
            debug!("PROPOSAL iteration {} attempt {}", iteration, attempt + 1);
            debug!("USER PROMPT:\n{}", prompt.user);

            let response = llm
                .generate(&prompt.system, &prompt.user, GenerateOptions::generation())
                .await
                .map_err(|e| FatalError::Other(anyhow::Error::new(e).context("proposal request failed")))?;
            debug!("RESPONSE:\n{}", response);

            match extract_svg(&response) {
                Ok(svg) => Ok(Attempt::Done((svg, attempt, response.len()))),
                Err(e) => {
                    warn!("Iteration {}: attempt {} had no SVG", iteration, attempt + 1);
                    Ok(Attempt::Retry(e))
                }
            }
        })
        .await?;

        match outcome {
            RetryOutcome::Succeeded {
                value: (svg, attempt, raw_len),
                ..
            } => Ok(Candidate::new(svg, iteration)
                .with_metadata("attempt", attempt)
                .with_metadata("raw_response_length", raw_len)),
            RetryOutcome::Exhausted { attempts, .. } => Err(ProposalError::Rejected(format!(
                "Failed to extract SVG after {} attempts: {}",
                attempts, NO_SVG
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg::testing::ScriptedModel;

    fn config() -> Arc<RunConfig> {
        let mut config = RunConfig::new("a fox", "four legs");
        config
            .domain_config
            .insert("description".into(), "A red fox sitting".into());
        Arc::new(config)
    }

    #[tokio::test]
    async fn test_seed_proposal() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("```svg\n<svg><circle/></svg>\n```".into())]));
        let proposer = SvgProposer::new(model.clone(), config());

        let candidate = proposer.propose(None, &[], 0).await.unwrap();

        assert_eq!(candidate.content, "<svg><circle/></svg>");
        assert_eq!(candidate.iteration, 0);
        assert_eq!(candidate.metadata["attempt"], 0);
        assert!(model.prompts()[0].contains("Create an SVG image of: a fox"));
    }

    #[tokio::test]
    async fn test_improvement_uses_champion_and_feedback() {
        let model = Arc::new(ScriptedModel::new(vec![Ok("<svg>v2</svg>".into())]));
        let proposer = SvgProposer::new(model.clone(), config());
        let champion = Arc::new(Candidate::new("<svg>v1</svg>", 1));
        let history = vec![FeedbackEntry::new(champion.clone(), "add a tail", 2)];

        let candidate = proposer.propose(Some(&champion), &history, 3).await.unwrap();

        assert_eq!(candidate.iteration, 3);
        let prompt = &model.prompts()[0];
        assert!(prompt.contains("Current best SVG (iteration 3)"));
        assert!(prompt.contains("<svg>v1</svg>"));
        assert!(prompt.contains("1. add a tail"));
    }

    #[tokio::test]
    async fn test_retries_until_svg_found() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("sorry, no drawing".into()),
            Ok("<svg>ok</svg>".into()),
        ]));
        let proposer = SvgProposer::new(model.clone(), config());

        let candidate = proposer.propose(None, &[], 0).await.unwrap();

        assert_eq!(candidate.metadata["attempt"], 1);
        assert_eq!(model.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_is_rejected() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok("no".into()),
            Ok("still no".into()),
            Ok("nope".into()),
        ]));
        let proposer = SvgProposer::new(model, config());

        let err = proposer.propose(None, &[], 0).await.unwrap_err();

        assert!(err.is_recoverable());
        assert_eq!(
            err.to_string(),
            "Failed to extract SVG after 3 attempts: No valid SVG found in LLM response"
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_fatal() {
        let model = Arc::new(ScriptedModel::new(vec![Err(503)]));
        let proposer = SvgProposer::new(model, config());

        let err = proposer.propose(None, &[], 0).await.unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn test_missing_description() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let proposer = SvgProposer::new(model, Arc::new(RunConfig::new("a fox", "r")));

        let err = proposer.propose(None, &[], 0).await.unwrap_err();
        assert!(matches!(
            err,
            ProposalError::Fatal(FatalError::ContractViolation { role: "proposer", .. })
        ));
    }
}
