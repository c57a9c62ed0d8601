//! Pairwise judging of rendered SVGs.

use super::prompts::evaluation_prompt;
use super::renderer::SvgRasterizer;
use async_trait::async_trait;
use descent_core::{Candidate, Evaluation};
use descent_engine::{EvaluationError, FatalError, PairwiseJudge, Presentation};
use descent_llm::{ChatModel, ImageInput};
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

/// Which image the judge picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    /// The first image
    A,
    /// The second image
    B,
}

impl Winner {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_uppercase().as_str() {
            "A" => Some(Winner::A),
            "B" => Some(Winner::B),
            _ => None,
        }
    }

    /// Whether this verdict favours the challenger under `presentation`.
    pub fn prefers_challenger(self, presentation: Presentation) -> bool {
        match presentation {
            Presentation::ChallengerFirst => self == Winner::A,
            Presentation::ChampionFirst => self == Winner::B,
        }
    }
}

/// A parsed judge answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Picked image
    pub winner: Winner,
    /// Why
    pub rationale: String,
    /// What to do next; the rationale when the judge gave none
    pub feedback: String,
}

fn capture(pattern: &str, text: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(text)?.get(1).map(|m| m.as_str().to_string())
}

fn parse_json_verdict(response: &str) -> Option<Verdict> {
    let object = Regex::new(r"\{[^{}]*\}").ok()?.find(response)?;
    let data: serde_json::Value = serde_json::from_str(object.as_str()).ok()?;

    let winner = Winner::parse(data.get("winner")?.as_str()?)?;
    let rationale = data
        .get("rationale")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let feedback = data
        .get("feedback")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| rationale.clone());

    Some(Verdict {
        winner,
        rationale,
        feedback,
    })
}

/// Read a verdict from the judge's answer.
///
/// Strict JSON first (the first brace-delimited object without nested
/// braces), then a field-by-field regex fallback for near-JSON answers.
/// On failure the error carries the first 200 characters of the answer.
pub fn parse_judge_response(response: &str) -> Result<Verdict, EvaluationError> {
    if let Some(verdict) = parse_json_verdict(response) {
        return Ok(verdict);
    }

    if let Some(winner) = capture(r#"(?i)"winner"\s*:\s*"([AB])""#, response).and_then(|w| Winner::parse(&w)) {
        let rationale = capture(r#"(?s)"rationale"\s*:\s*"(.*?)""#, response).unwrap_or_default();
        let feedback = capture(r#"(?s)"feedback"\s*:\s*"(.*?)""#, response).unwrap_or_else(|| rationale.clone());
        return Ok(Verdict {
            winner,
            rationale,
            feedback,
        });
    }

    Err(EvaluationError::Unparseable(response.chars().take(200).collect()))
}

/// Judge comparing PNG renders of two SVG candidates with a multimodal model.
pub struct SvgJudge {
    llm: Arc<dyn ChatModel>,
    rasterizer: Arc<dyn SvgRasterizer>,
    subject: String,
    rubric: String,
    width: u32,
    height: u32,
}

impl SvgJudge {
    /// Create a judge.
    pub fn new(
        llm: Arc<dyn ChatModel>,
        rasterizer: Arc<dyn SvgRasterizer>,
        subject: impl Into<String>,
        rubric: impl Into<String>,
        (width, height): (u32, u32),
    ) -> Self {
        Self {
            llm,
            rasterizer,
            subject: subject.into(),
            rubric: rubric.into(),
            width,
            height,
        }
    }
}

#[async_trait]
impl PairwiseJudge for SvgJudge {
    type Exhibit = Vec<u8>;

    async fn exhibit(&self, candidate: &Candidate) -> Result<Vec<u8>, EvaluationError> {
        self.rasterizer
            .rasterize(&candidate.content, self.width, self.height)
            .await
            .map_err(|e| match e {
                e if e.is_bad_input() => {
                    EvaluationError::Rejected(format!("iteration {} did not render: {}", candidate.iteration, e))
                }
                e => FatalError::Other(anyhow::Error::new(e).context("SVG rasteriser unavailable")).into(),
            })
    }

    async fn compare(
        &self,
        challenger: &Arc<Candidate>,
        challenger_png: &Vec<u8>,
        champion: &Arc<Candidate>,
        champion_png: &Vec<u8>,
        presentation: Presentation,
    ) -> Result<Evaluation, EvaluationError> {
        let prompt = evaluation_prompt(&self.subject, &self.rubric);
        let images = match presentation {
            Presentation::ChallengerFirst => [challenger_png, champion_png],
            Presentation::ChampionFirst => [champion_png, challenger_png],
        }
        .map(|png| ImageInput::png(png.clone()));

        debug!(
            "EVALUATION challenger iter {} vs champion iter {} ({}), images {} / {} bytes",
            challenger.iteration,
            champion.iteration,
            presentation,
            images[0].data.len(),
            images[1].data.len()
        );
        debug!("SYSTEM PROMPT:\n{}", prompt.system);
        debug!("USER PROMPT:\n{}", prompt.user);

        let response = self
            .llm
            .evaluate_with_images(&prompt.system, &prompt.user, &images)
            .await
            .map_err(|e| FatalError::Other(anyhow::Error::new(e).context("judge request failed")))?;
        debug!("RESPONSE:\n{}", response);

        let verdict = parse_judge_response(&response)?;

        Ok(Evaluation {
            preferred: verdict.winner.prefers_challenger(presentation),
            rationale: verdict.rationale,
            feedback: verdict.feedback,
            challenger: challenger.clone(),
            champion: champion.clone(),
            raw_response: response,
        })
    }
}
