//! Layer 2 (model) guardrail screen (spec.md §4.D), a structured-output
//! request over `eval-llm`, grounded on
//! `original_source/.../intent_analyzer.py`'s `IntentAnalysisResult` model
//! and its `validate_status_and_block_reason` normalization.

use serde::{Deserialize, Serialize};

use eval_domain::{BlockReason, GuideStrategy, ProblemContext, RequestType, Result, TokenTriple};
use eval_llm::LlmGateway;

use crate::verdict::GuardrailVerdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum RawStatus {
    Safe,
    Blocked,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    status: RawStatus,
    #[serde(default)]
    block_reason: Option<BlockReason>,
    request_type: RequestType,
    #[serde(default)]
    guide_strategy: Option<GuideStrategy>,
    #[serde(default)]
    keywords: Vec<String>,
    reasoning: String,
}

fn prompt(message: &str, problem: &ProblemContext, recent_turns: &[String]) -> String {
    let history = if recent_turns.is_empty() {
        "(none)".to_string()
    } else {
        recent_turns.join("\n")
    };
    format!(
        "You are a guardrail classifier for a coding-tutor assistant.\n\
         Problem: {title}\n\
         Recent turns:\n{history}\n\
         User message: {message}\n\n\
         Classify this message. Respond as JSON: \
         {{\"status\": \"SAFE\"|\"BLOCKED\", \"block_reason\": \"DIRECT_ANSWER\"|\"JAILBREAK\"|\"OFF_TOPIC\"|null, \
         \"request_type\": \"CHAT\"|\"SUBMISSION\", \
         \"guide_strategy\": \"SYNTAX_GUIDE\"|\"LOGIC_HINT\"|\"ROADMAP\"|\"GENERATION\"|null, \
         \"keywords\": [string], \"reasoning\": string}}",
        title = problem.title,
    )
}

/// Run the model screen and apply the normalization rules from spec.md
/// §4.D: a BLOCKED verdict missing `block_reason` defaults to `OffTopic`; a
/// SAFE verdict always clears it.
pub async fn screen(
    gateway: &LlmGateway,
    message: &str,
    problem: &ProblemContext,
    recent_turns: &[String],
) -> Result<(GuardrailVerdict, TokenTriple)> {
    let prompt = prompt(message, problem, recent_turns);
    let (raw, tokens): (RawVerdict, TokenTriple) = gateway.complete_structured("guardrail", &prompt).await?;

    let verdict = match raw.status {
        RawStatus::Blocked => GuardrailVerdict {
            blocked: true,
            block_reason: Some(raw.block_reason.unwrap_or(BlockReason::OffTopic)),
            request_type: raw.request_type,
            guide_strategy: None,
            keywords: raw.keywords,
            reasoning: raw.reasoning,
        },
        RawStatus::Safe => GuardrailVerdict {
            blocked: false,
            block_reason: None,
            request_type: raw.request_type,
            guide_strategy: raw.guide_strategy,
            keywords: raw.keywords,
            reasoning: raw.reasoning,
        },
    };
    Ok((verdict, tokens))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_without_reason_defaults_to_off_topic() {
        let raw = RawVerdict {
            status: RawStatus::Blocked,
            block_reason: None,
            request_type: RequestType::Chat,
            guide_strategy: None,
            keywords: vec![],
            reasoning: "test".into(),
        };
        let reason = raw.block_reason.unwrap_or(BlockReason::OffTopic);
        assert_eq!(reason, BlockReason::OffTopic);
    }
}
