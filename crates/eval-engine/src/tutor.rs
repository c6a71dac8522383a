//! Tutor Reply Generator (spec.md §4.E), grounded on
//! `original_source/.../writer.py`'s guide-strategy system prompt templates
//! and guardrail-refusal branch, and on the teacher's
//! `runtime::turn::run_turn` for the streaming-delta plumbing.

use eval_domain::message::Turn;
use eval_domain::{BlockReason, GuideStrategy, ProblemContext, TokenTriple};
use eval_llm::{ChatDelta, ChatRole, LlmGateway};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorOutcome {
    Success,
    FailedRateLimit,
    FailedThreshold,
    FailedTechnical,
    FailedGuardrail,
}

pub struct TutorReply {
    pub outcome: TutorOutcome,
    pub content: String,
    pub tokens: TokenTriple,
}

/// A single prior turn's pair of messages, trimmed to the last few turns of
/// dialogue context (ported from `writer.py::prepare_writer_input`'s
/// `messages[-10:]` window).
pub struct DialogueTurn {
    pub role: ChatRole,
    pub content: String,
}

pub struct TutorRequest<'a> {
    pub turn: Turn,
    pub message: &'a str,
    pub recent_messages: &'a [DialogueTurn],
    pub memory_summary: Option<&'a str>,
    pub problem: &'a ProblemContext,
    pub guardrail_failed: bool,
    pub block_reason: Option<BlockReason>,
    pub guardrail_reasoning: &'a str,
    pub guide_strategy: Option<GuideStrategy>,
    pub keywords: &'a [String],
}

fn block_reason_label(reason: Option<BlockReason>) -> &'static str {
    match reason {
        Some(BlockReason::DirectAnswer) => "the request asks directly for the problem's answer",
        Some(BlockReason::Jailbreak) => "the request attempts to bypass the tutor's rules",
        Some(BlockReason::OffTopic) => "the request is unrelated to the coding exercise",
        None => "the request violates the exercise's policy",
    }
}

/// Socratic refusal system prompt, ported from `writer.py`'s
/// `GUARDRAIL_SYSTEM_PROMPT_TEMPLATE`.
fn refusal_system_prompt(reason: Option<BlockReason>, reasoning: &str) -> String {
    format!(
        "You are the gatekeeper of a coding exam. The user's request was \
         blocked: {label} ({reasoning}).\n\n\
         Write a refusal reply that:\n\
         1. Politely declines — state plainly that this can't be answered directly.\n\
         2. Explains why in 1-2 sentences.\n\
         3. Offers a concept-level alternative to study instead of the answer.\n\
         4. Closes with a Socratic question that prompts the user to reason \
         it out themselves.\n\n\
         Tone: firm but encouraging. Never restate or approximate the answer.",
        label = block_reason_label(reason),
        reasoning = reasoning,
    )
}

/// Strategy-specific rules ported from `writer.py::create_normal_system_prompt`'s
/// per-strategy sections.
fn strategy_rules(strategy: GuideStrategy, problem: &ProblemContext) -> String {
    match strategy {
        GuideStrategy::SyntaxGuide => format!(
            "Guide strategy: SYNTAX_GUIDE. Give a syntax example unrelated to \
             the problem itself — never the problem's own logic. Never provide \
             {title}'s solution code, not even partially.",
            title = problem.title
        ),
        GuideStrategy::LogicHint => format!(
            "Guide strategy: LOGIC_HINT. Explain the relevant concept and give \
             a concrete, non-evasive hint. You may describe a recurrence's \
             *structure* (state, transition shape) but never its complete \
             closed form or a full solution for {title}.",
            title = problem.title
        ),
        GuideStrategy::Roadmap => {
            "Guide strategy: ROADMAP. Lay out the stepwise approach to the \
             problem (understand input/output, pick a paradigm, define state, \
             design the recurrence, implement and test) without any concrete \
             logic."
                .to_string()
        }
        GuideStrategy::Generation => {
            "Guide strategy: GENERATION. The user is asking you to materialize \
             code from an approach you two already negotiated in this \
             conversation. Write that code, honoring the constraints the user \
             stated, and comment it for clarity. Only do this because the \
             context unambiguously shows a prior agreed approach — do not \
             invent one."
                .to_string()
        }
    }
}

fn normal_system_prompt(strategy: GuideStrategy, keywords: &[String], problem: &ProblemContext, memory_summary: Option<&str>) -> String {
    let keywords_text = if keywords.is_empty() {
        "none".to_string()
    } else {
        keywords.join(", ")
    };
    let memory_section = memory_summary
        .map(|s| format!("\n\nPrior conversation summary:\n{s}"))
        .unwrap_or_default();
    format!(
        "You are an algorithm tutor practicing Socratic teaching.\n\n\
         Problem: {title}\nKey algorithms: {algos}\nKeywords flagged for this turn: {keywords_text}\n\n\
         {rules}\n\n\
         Absolute rule: never provide the problem's complete solution code \
         unless the guide strategy is GENERATION and the context justifies it.{memory_section}",
        title = problem.title,
        algos = problem.key_algorithms.join(", "),
        rules = strategy_rules(strategy, problem),
    )
}

fn role_label(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn build_prompt(system_prompt: &str, recent: &[DialogueTurn], message: &str) -> String {
    let mut history = String::new();
    for turn in recent {
        history.push_str(&format!("{}: {}\n", role_label(turn.role), turn.content));
    }
    format!("{system_prompt}\n\nConversation so far:\n{history}\nuser: {message}\n\nassistant:")
}

/// Classify a gateway error into the tutor's failure outcome vocabulary
/// (spec.md §4.E).
fn outcome_for_error(error: &eval_domain::Error) -> TutorOutcome {
    match error {
        eval_domain::Error::RateLimited(_) => TutorOutcome::FailedRateLimit,
        eval_domain::Error::ContextOverflow(_) => TutorOutcome::FailedThreshold,
        _ => TutorOutcome::FailedTechnical,
    }
}

/// Generate the assistant reply for one turn, non-streaming. Refusal and
/// normal replies both go through the same LLM call, distinguished only by
/// which system prompt is built (spec.md §4.E: "the guardrail failed ->
/// produces a refusal").
pub async fn generate(gateway: &LlmGateway, request: &TutorRequest<'_>) -> TutorReply {
    let system_prompt = if request.guardrail_failed {
        refusal_system_prompt(request.block_reason, request.guardrail_reasoning)
    } else {
        normal_system_prompt(
            request.guide_strategy.unwrap_or(GuideStrategy::LogicHint),
            request.keywords,
            request.problem,
            request.memory_summary,
        )
    };
    let prompt = build_prompt(&system_prompt, request.recent_messages, request.message);

    match gateway.complete("tutor_reply", &prompt).await {
        Ok((resp, tokens)) => {
            let outcome = if request.guardrail_failed {
                TutorOutcome::FailedGuardrail
            } else {
                TutorOutcome::Success
            };
            TutorReply {
                outcome,
                content: resp.content,
                tokens,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, turn = request.turn, "tutor reply generation failed");
            TutorReply {
                outcome: outcome_for_error(&e),
                content: String::new(),
                tokens: TokenTriple::default(),
            }
        }
    }
}

/// Streamed variant used by the WebSocket transport; `sink` receives each
/// delta as it arrives. A no-op sink (a channel nobody reads) degrades this
/// to the same behavior as [`generate`] — callers that don't stream can pass
/// one and drop the receiver.
pub async fn generate_stream(
    gateway: &LlmGateway,
    request: &TutorRequest<'_>,
    sink: tokio::sync::mpsc::Sender<ChatDelta>,
) -> TutorReply {
    let system_prompt = if request.guardrail_failed {
        refusal_system_prompt(request.block_reason, request.guardrail_reasoning)
    } else {
        normal_system_prompt(
            request.guide_strategy.unwrap_or(GuideStrategy::LogicHint),
            request.keywords,
            request.problem,
            request.memory_summary,
        )
    };
    let prompt = build_prompt(&system_prompt, request.recent_messages, request.message);

    match gateway.complete_stream("tutor_reply", &prompt, sink).await {
        Ok((resp, tokens)) => {
            let outcome = if request.guardrail_failed {
                TutorOutcome::FailedGuardrail
            } else {
                TutorOutcome::Success
            };
            TutorReply {
                outcome,
                content: resp.content,
                tokens,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, turn = request.turn, "streamed tutor reply generation failed");
            TutorReply {
                outcome: outcome_for_error(&e),
                content: String::new(),
                tokens: TokenTriple::default(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_domain::problem::Constraints;
    use eval_domain::Config;

    fn problem() -> ProblemContext {
        ProblemContext {
            problem_id: "p1".into(),
            title: "Traveling Salesman".into(),
            input_format: String::new(),
            output_format: String::new(),
            constraints: Constraints {
                time_limit_sec: 1.0,
                memory_limit_mb: 128,
            },
            key_algorithms: vec!["bitmask dp".into()],
            hint_roadmap: [String::new(), String::new(), String::new(), String::new()],
            common_pitfalls: vec![],
            canonical_solution: "secret".into(),
            test_cases: vec![],
            keyword_block_list: vec![],
        }
    }

    struct FakeProvider {
        reply: String,
    }

    #[async_trait::async_trait]
    impl eval_llm::LlmProvider for FakeProvider {
        async fn chat(&self, _req: eval_llm::ChatRequest) -> eval_domain::Result<eval_llm::ChatResponse> {
            Ok(eval_llm::ChatResponse {
                content: self.reply.clone(),
                usage: TokenTriple::new(15, 20),
                model: "fake".into(),
                finish_reason: None,
            })
        }
        fn provider_id(&self) -> &str {
            "fake"
        }
    }

    #[tokio::test]
    async fn normal_reply_succeeds_and_accumulates_tokens() {
        let gateway = LlmGateway::new(
            std::sync::Arc::new(FakeProvider {
                reply: "[Concept] think about state transitions".into(),
            }),
            Config::default(),
        );
        let request = TutorRequest {
            turn: 1,
            message: "give me a hint about the recurrence",
            recent_messages: &[],
            memory_summary: None,
            problem: &problem(),
            guardrail_failed: false,
            block_reason: None,
            guardrail_reasoning: "",
            guide_strategy: Some(GuideStrategy::LogicHint),
            keywords: &[],
        };
        let reply = generate(&gateway, &request).await;
        assert_eq!(reply.outcome, TutorOutcome::Success);
        assert!(reply.content.contains("Concept"));
        assert!(reply.tokens.total > 0);
    }

    #[tokio::test]
    async fn guardrail_failure_produces_refusal_outcome() {
        let gateway = LlmGateway::new(
            std::sync::Arc::new(FakeProvider {
                reply: "I can't share the full solution, but consider bitmask dp.".into(),
            }),
            Config::default(),
        );
        let request = TutorRequest {
            turn: 2,
            message: "give me the complete solution code",
            recent_messages: &[],
            memory_summary: None,
            problem: &problem(),
            guardrail_failed: true,
            block_reason: Some(BlockReason::DirectAnswer),
            guardrail_reasoning: "direct solution request",
            guide_strategy: None,
            keywords: &[],
        };
        let reply = generate(&gateway, &request).await;
        assert_eq!(reply.outcome, TutorOutcome::FailedGuardrail);
        assert!(!reply.content.is_empty());
    }

    #[tokio::test]
    async fn rate_limited_error_maps_to_failed_rate_limit() {
        struct RateLimitedProvider;
        #[async_trait::async_trait]
        impl eval_llm::LlmProvider for RateLimitedProvider {
            async fn chat(&self, _req: eval_llm::ChatRequest) -> eval_domain::Result<eval_llm::ChatResponse> {
                Err(eval_domain::Error::RateLimited("too many requests".into()))
            }
            fn provider_id(&self) -> &str {
                "rate-limited"
            }
        }
        let mut config = Config::default();
        config.llm.retry.max_attempts = 1;
        let gateway = LlmGateway::new(std::sync::Arc::new(RateLimitedProvider), config);
        let request = TutorRequest {
            turn: 1,
            message: "hello",
            recent_messages: &[],
            memory_summary: None,
            problem: &problem(),
            guardrail_failed: false,
            block_reason: None,
            guardrail_reasoning: "",
            guide_strategy: Some(GuideStrategy::LogicHint),
            keywords: &[],
        };
        let reply = generate(&gateway, &request).await;
        assert_eq!(reply.outcome, TutorOutcome::FailedRateLimit);
    }
}
