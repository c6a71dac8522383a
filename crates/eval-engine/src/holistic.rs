//! Holistic Evaluator (spec.md §4.G), grounded on
//! `original_source/.../holistic_evaluator/flow.py`'s single structured-
//! output scoring pass over the full turn-log history.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use eval_domain::{HolisticLog, TokenTriple, TurnLog};
use eval_llm::LlmGateway;

#[derive(Debug, Serialize)]
struct TurnSummary<'a> {
    turn: u32,
    intent: &'a str,
    weighted_score: f64,
    rubrics: BTreeMap<String, f64>,
    assistant_summary: &'a str,
}

#[derive(Debug, Deserialize)]
struct RawHolisticResponse {
    flow_score: f64,
    analysis: String,
}

fn prompt(turns: &[TurnSummary]) -> String {
    let encoded = serde_json::to_string_pretty(turns).unwrap_or_default();
    format!(
        "You are assessing a student's overall chaining strategy across an \
         entire coding-tutor session. Score [0,100] and explain, weighing four \
         sub-qualities: problem decomposition, feedback integration, \
         proactiveness, and strategic exploration.\n\n\
         Turn-by-turn record:\n{encoded}\n\n\
         Respond as JSON: {{\"flow_score\": number, \"analysis\": string}}."
    )
}

/// Run the holistic evaluation over every completed turn, ordered by turn
/// number. An empty turn list short-circuits to score 0 / "no turns"
/// without any LLM call (ported from `flow.py`'s early-return branch).
pub async fn evaluate(gateway: &LlmGateway, turn_logs: &std::collections::HashMap<u32, TurnLog>) -> (HolisticLog, TokenTriple) {
    if turn_logs.is_empty() {
        return (
            HolisticLog {
                flow_score: 0.0,
                analysis: "no turns".into(),
            },
            TokenTriple::default(),
        );
    }

    let mut ordered: Vec<&TurnLog> = turn_logs.values().collect();
    ordered.sort_by_key(|log| log.turn);

    let summaries: Vec<TurnSummary> = ordered
        .iter()
        .map(|log| TurnSummary {
            turn: log.turn,
            intent: log.intent.as_str(),
            weighted_score: log.weighted_score,
            rubrics: log
                .rubrics
                .iter()
                .map(|r| (format!("{:?}", r.criterion), r.score))
                .collect(),
            assistant_summary: &log.assistant_summary,
        })
        .collect();

    match gateway
        .complete_structured::<RawHolisticResponse>("holistic_evaluator", &prompt(&summaries))
        .await
    {
        Ok((raw, tokens)) => (
            HolisticLog {
                flow_score: raw.flow_score.clamp(0.0, 100.0),
                analysis: raw.analysis,
            },
            tokens,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "holistic evaluation failed, recording zero flow score");
            (
                HolisticLog {
                    flow_score: 0.0,
                    analysis: format!("evaluation failed: {e}"),
                },
                TokenTriple::default(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_domain::Config;

    #[tokio::test]
    async fn empty_turn_list_short_circuits_without_llm_call() {
        struct PanicsIfCalled;

        #[async_trait::async_trait]
        impl eval_llm::LlmProvider for PanicsIfCalled {
            async fn chat(&self, _req: eval_llm::ChatRequest) -> eval_domain::Result<eval_llm::ChatResponse> {
                panic!("holistic evaluator must not call the LLM for an empty turn list");
            }
            fn provider_id(&self) -> &str {
                "panics"
            }
        }

        let gateway = LlmGateway::new(std::sync::Arc::new(PanicsIfCalled), Config::default());
        let (log, tokens) = evaluate(&gateway, &std::collections::HashMap::new()).await;
        assert_eq!(log.flow_score, 0.0);
        assert_eq!(log.analysis, "no turns");
        assert_eq!(tokens.total, 0);
    }

    #[tokio::test]
    async fn scores_nonempty_turn_list_via_structured_call() {
        struct FakeHolistic;

        #[async_trait::async_trait]
        impl eval_llm::LlmProvider for FakeHolistic {
            async fn chat(&self, _req: eval_llm::ChatRequest) -> eval_domain::Result<eval_llm::ChatResponse> {
                Ok(eval_llm::ChatResponse {
                    content: r#"{"flow_score": 82.5, "analysis": "good decomposition"}"#.into(),
                    usage: TokenTriple::new(20, 15),
                    model: "fake".into(),
                    finish_reason: None,
                })
            }
            fn provider_id(&self) -> &str {
                "fake"
            }
        }

        let mut logs = std::collections::HashMap::new();
        logs.insert(
            1,
            TurnLog {
                turn: 1,
                intent: eval_domain::Intent::HintOrQuery,
                intent_confidence: 0.9,
                rubrics: vec![],
                weighted_score: 70.0,
                assistant_summary: "explained bitmask dp".into(),
                guardrail_failed: false,
                created_at: chrono::Utc::now(),
            },
        );
        let gateway = LlmGateway::new(std::sync::Arc::new(FakeHolistic), Config::default());
        let (log, tokens) = evaluate(&gateway, &logs).await;
        assert_eq!(log.flow_score, 82.5);
        assert!(tokens.total > 0);
    }
}
