//! The Turn Evaluator (spec.md §4.F): four stages — intent classification,
//! rubric evaluation, weighted scoring, summarization — run for every
//! chat turn, either in the background right after the tutor reply or
//! synchronously when `submission_guard` finds a gap.

pub mod intent;
pub mod metrics;

use serde::{Deserialize, Serialize};

use eval_domain::config::RubricWeightTable;
use eval_domain::{Criterion, Intent, ProblemContext, RubricEntry, TokenTriple, TurnLog, ALL_CRITERIA};
use eval_llm::LlmGateway;

#[derive(Debug, Deserialize)]
struct RawIntentResponse {
    intent_types: Vec<Intent>,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct RawRubricEntry {
    criterion: Criterion,
    score: f64,
    reasoning: String,
}

#[derive(Debug, Deserialize)]
struct RawRubricResponse {
    rubrics: Vec<RawRubricEntry>,
    final_reasoning: String,
}

/// Short, human-readable description of what each intent's rubric call is
/// grading, mirrored from `evaluators.py`'s per-intent `criteria` strings —
/// used only to steer the model prompt, never to affect scoring.
fn rubric_focus(intent: Intent) -> &'static str {
    match intent {
        Intent::SystemPrompt => "whether the user gave the assistant a clear persona, scope, and tone",
        Intent::RuleSetting => "whether constraints (complexity, language, format) are stated explicitly",
        Intent::Generation => "whether input/output examples and implementation conditions are spelled out",
        Intent::Optimization => "whether the current bottleneck and a target improvement are identified",
        Intent::Debugging => "whether the error, repro steps, or unexpected behavior are described concretely",
        Intent::TestCase => "whether the edge cases or boundary conditions to test are named",
        Intent::HintOrQuery => "whether the user shares their own reasoning instead of just asking for the answer",
        Intent::FollowUp => "whether the follow-up logically builds on the prior turn's reply",
    }
}

fn intent_prompt(turn: u32, message: &str, reply: &str) -> String {
    format!(
        "Classify the user's intent in this coding-tutor turn into exactly one \
         of: SYSTEM_PROMPT, RULE_SETTING, GENERATION, OPTIMIZATION, DEBUGGING, \
         TEST_CASE, HINT_OR_QUERY, FOLLOW_UP. Turn number: {turn}.\n\n\
         User: {message}\n\nAssistant: {reply}\n\n\
         Respond as JSON: {{\"intent_types\": [string], \"confidence\": number}}."
    )
}

fn rubric_prompt(message: &str, reply: &str, intent: Intent, problem: &ProblemContext, metrics: &metrics::PromptMetrics) -> String {
    let metrics_json = serde_json::to_string(metrics).unwrap_or_default();
    format!(
        "You are a prompt-engineering evaluator. Score how well the user's \
         prompt serves its intent — {focus}. The assistant's reply is reference \
         context only; score the user's prompt.\n\n\
         Problem: {title}\nKey algorithms: {algos}\n\n\
         Reference metrics (corroboration only, never the basis for the score): \
         {metrics_json}\n\n\
         User prompt: {message}\n\nAssistant reply (reference): {reply}\n\n\
         Score five criteria in [0,100] each — clarity, examples, rules, \
         context, problem_relevance — with a brief reasoning per criterion. \
         Respond as JSON: {{\"rubrics\": [{{\"criterion\": string, \"score\": \
         number, \"reasoning\": string}}], \"final_reasoning\": string}}.",
        focus = rubric_focus(intent),
        title = problem.title,
        algos = problem.key_algorithms.join(", "),
    )
}

fn summary_prompt(reply: &str) -> String {
    format!(
        "Summarize this assistant reply in at most 3 sentences, covering the \
         core functionality, algorithm/approach, and key explanation point:\n\n{reply}"
    )
}

/// Resolve the turn's intent, defaulting to `HintOrQuery`/confidence 0 when
/// classification fails outright (spec.md §4.F failure semantics).
async fn classify_intent(gateway: &LlmGateway, turn: u32, message: &str, reply: &str) -> (Intent, f64, TokenTriple) {
    let prompt = intent_prompt(turn, message, reply);
    match gateway.complete_structured::<RawIntentResponse>("intent_classifier", &prompt).await {
        Ok((raw, tokens)) if !raw.intent_types.is_empty() => {
            let resolved = intent::resolve(&raw.intent_types, turn, message);
            (resolved, raw.confidence.clamp(0.0, 1.0), tokens)
        }
        Ok((_, tokens)) => {
            tracing::warn!("intent classifier returned no candidates, defaulting to HINT_OR_QUERY");
            (Intent::HintOrQuery, 0.0, tokens)
        }
        Err(e) => {
            tracing::warn!(error = %e, "intent classification failed, defaulting to HINT_OR_QUERY");
            (Intent::HintOrQuery, 0.0, TokenTriple::default())
        }
    }
}

/// Run the rubric call, or build the sentinel turn-log values spec.md
/// mandates on failure: score 0, rubrics empty, reasoning = the error.
async fn evaluate_rubrics(
    gateway: &LlmGateway,
    message: &str,
    reply: &str,
    intent: Intent,
    problem: &ProblemContext,
) -> (Vec<RubricEntry>, String, TokenTriple) {
    let computed_metrics = metrics::compute(message, problem);
    let prompt = rubric_prompt(message, reply, intent, problem, &computed_metrics);
    match gateway.complete_structured::<RawRubricResponse>("rubric_evaluator", &prompt).await {
        Ok((raw, tokens)) => {
            let rubrics = raw
                .rubrics
                .into_iter()
                .map(|r| RubricEntry {
                    criterion: r.criterion,
                    score: r.score.clamp(0.0, 100.0),
                    reasoning: r.reasoning,
                })
                .collect();
            (rubrics, raw.final_reasoning, tokens)
        }
        Err(e) => {
            tracing::warn!(error = %e, "rubric evaluation failed, recording sentinel turn log");
            (Vec::new(), e.to_string(), TokenTriple::default())
        }
    }
}

fn weighted_score(rubrics: &[RubricEntry], intent: Intent, weights: &RubricWeightTable) -> f64 {
    let table = weights.weights_for(intent);
    let rubric_map = rubrics.iter().map(|r| (r.criterion, r.score)).collect::<std::collections::HashMap<_, _>>();
    ALL_CRITERIA
        .iter()
        .map(|c| rubric_map.get(c).copied().unwrap_or(0.0) * table.get(c).copied().unwrap_or(0.2))
        .sum()
}

/// Produce the ≤3-sentence assistant-message summary (spec.md §4.F stage
/// 4). Falls back to a truncated copy of the reply if the summarization
/// call itself fails — the turn log must always get written.
async fn summarize_reply(gateway: &LlmGateway, reply: &str) -> (String, TokenTriple) {
    if reply.trim().is_empty() {
        return (String::new(), TokenTriple::default());
    }
    match gateway.complete("turn_summary", &summary_prompt(reply)).await {
        Ok((resp, tokens)) => (resp.content, tokens),
        Err(e) => {
            tracing::warn!(error = %e, "reply summarization failed, falling back to truncation");
            let truncated: String = reply.chars().take(240).collect();
            (truncated, TokenTriple::default())
        }
    }
}

/// Run all four stages and return the finished `TurnLog` plus the total
/// eval tokens spent. Never fails — rubric/intent failures degrade to the
/// sentinels spec.md §4.F names rather than propagating an `Error`.
pub async fn evaluate_turn(
    gateway: &LlmGateway,
    weights: &RubricWeightTable,
    turn: eval_domain::message::Turn,
    message: &str,
    reply: &str,
    problem: &ProblemContext,
    guardrail_failed: bool,
) -> (TurnLog, TokenTriple) {
    let mut total = TokenTriple::default();

    let (intent, confidence, tokens) = classify_intent(gateway, turn, message, reply).await;
    total.add(tokens);

    let (rubrics, _final_reasoning, tokens) = evaluate_rubrics(gateway, message, reply, intent, problem).await;
    total.add(tokens);

    let score = if guardrail_failed {
        0.0
    } else {
        weighted_score(&rubrics, intent, weights)
    };

    let (summary, tokens) = summarize_reply(gateway, reply).await;
    total.add(tokens);

    let log = TurnLog {
        turn,
        intent,
        intent_confidence: confidence,
        rubrics,
        weighted_score: score,
        assistant_summary: summary,
        guardrail_failed,
        created_at: chrono::Utc::now(),
    };
    (log, total)
}
