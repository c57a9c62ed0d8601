//! Prompt templates for the SVG domain.

use descent_core::FeedbackEntry;
use std::fmt::Write as _;

/// A system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System prompt
    pub system: String,
    /// User prompt
    pub user: String,
}

const PROPOSER_SYSTEM: &str = "You are an SVG generator. You write raw SVG markup. \
Always output valid SVG code wrapped in <svg> tags with explicit width and height attributes.";

const JUDGE_SYSTEM: &str = "You are an expert art critic evaluating SVG artwork. You will compare two rendered \
images (Image A and Image B) of the same subject and determine which better satisfies the given rubric.

You MUST respond with valid JSON containing three fields:
- \"winner\": \"A\" or \"B\"
- \"rationale\": brief explanation of why the winner is better
- \"feedback\": structured guidance for the next iteration, formatted as:
  Preserve: [what the current best version does well that must be kept]
  Improve: [2-3 specific, actionable edits to make]
  IMPORTANT: Do NOT reference \"Image A\", \"Image B\", \"the winner\", or \"the loser\" in the feedback. \
Write as direct instructions (e.g. \"keep the grounded hooves\", \"connect the legs to the body\").";

const FENCE_INSTRUCTION: &str = "Output ONLY the SVG code, wrapped in ```svg fences.";

/// What the proposer is asked to build on.
#[derive(Debug, Clone, Copy)]
pub struct ProposalContext<'a> {
    /// Subject name
    pub subject: &'a str,
    /// Subject description
    pub description: &'a str,
    /// Rubric text
    pub rubric: &'a str,
    /// Show the rubric to the seed proposal
    pub informed_init: bool,
}

/// Prompt for the seed candidate.
pub fn seed_prompt(ctx: &ProposalContext<'_>) -> Prompt {
    let mut user = format!(
        "Create an SVG image of: {}\n\nDescription: {}\n\n",
        ctx.subject, ctx.description
    );
    if ctx.informed_init {
        let _ = write!(
            user,
            "Style rubric:\n{}\n\nCreate a detailed, high-quality SVG that follows the rubric closely. ",
            ctx.rubric
        );
    } else {
        user.push_str("Create a detailed, high-quality SVG. ");
    }
    user.push_str(FENCE_INSTRUCTION);

    Prompt {
        system: PROPOSER_SYSTEM.to_string(),
        user,
    }
}

/// Prompt for the challenger of `iteration`, improving on `champion_svg`.
///
/// Feedback is numbered newest first.
pub fn improvement_prompt(
    ctx: &ProposalContext<'_>,
    champion_svg: &str,
    iteration: usize,
    feedback_history: &[FeedbackEntry],
) -> Prompt {
    let mut user = format!(
        "Subject: {}\nDescription: {}\n\nStyle rubric:\n{}\n\n",
        ctx.subject, ctx.description, ctx.rubric
    );
    let _ = write!(
        user,
        "Current best SVG (iteration {}):\n```svg\n{}\n```\n\n",
        iteration, champion_svg
    );

    if !feedback_history.is_empty() {
        user.push_str("Feedback:\n");
        for (i, entry) in feedback_history.iter().rev().enumerate() {
            let _ = writeln!(user, "{}. {}", i + 1, entry.feedback);
        }
        user.push('\n');
    }

    user.push_str(
        "Create an improved SVG that addresses the feedback above. Use the current best \
as reference for what works, but feel free to rethink the structure and composition. ",
    );
    user.push_str(FENCE_INSTRUCTION);

    Prompt {
        system: PROPOSER_SYSTEM.to_string(),
        user,
    }
}

/// Prompt for one pairwise judgement over two attached images.
pub fn evaluation_prompt(subject: &str, rubric: &str) -> Prompt {
    let user = format!(
        "Subject: {}\n\nEvaluation rubric:\n{}\n\n\
Compare Image A and Image B above. Which image better depicts the subject according to the rubric?\n\n\
Respond with JSON only: {{\"winner\": \"A\" or \"B\", \"rationale\": \"...\", \"feedback\": \"...\"}}",
        subject, rubric
    );

    Prompt {
        system: JUDGE_SYSTEM.to_string(),
        user,
    }
}
