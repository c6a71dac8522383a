//! Combines Layer 1 and Layer 2 into a single entry point (spec.md §4.D:
//! "Two layers run in order; a BLOCK at either layer short-circuits").

use eval_domain::{ProblemContext, Result, TokenTriple};
use eval_llm::LlmGateway;

use crate::layer1;
use crate::layer2;
use crate::verdict::GuardrailVerdict;

pub struct GuardrailFilter<'a> {
    gateway: &'a LlmGateway,
}

impl<'a> GuardrailFilter<'a> {
    pub fn new(gateway: &'a LlmGateway) -> Self {
        Self { gateway }
    }

    /// Runs Layer 1, then (if it passed) Layer 2. Returns the accumulated
    /// chat tokens spent (zero if Layer 1 short-circuited).
    pub async fn screen(
        &self,
        message: &str,
        problem: &ProblemContext,
        recent_turns: &[String],
    ) -> Result<(GuardrailVerdict, TokenTriple)> {
        if let Some(block) = layer1::screen(message, recent_turns, &problem.keyword_block_list) {
            tracing::info!(reason = ?block.block_reason, "layer 1 guardrail blocked message");
            return Ok((
                GuardrailVerdict::layer1_block(block.block_reason, block.reasoning),
                TokenTriple::default(),
            ));
        }

        layer2::screen(self.gateway, message, problem, recent_turns).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_domain::{Config, Constraints, TestCase};
    use eval_llm::{ChatRequest, ChatResponse, LlmProvider};

    fn problem() -> ProblemContext {
        ProblemContext {
            problem_id: "p1".into(),
            title: "TSP".into(),
            input_format: String::new(),
            output_format: String::new(),
            constraints: Constraints {
                time_limit_sec: 1.0,
                memory_limit_mb: 128,
            },
            key_algorithms: vec!["bitmask dp".into()],
            hint_roadmap: [
                "understand the problem".into(),
                "identify state".into(),
                "write the recurrence".into(),
                "implement".into(),
            ],
            common_pitfalls: vec![],
            canonical_solution: "".into(),
            test_cases: vec![TestCase {
                input: "".into(),
                expected: "".into(),
                description: String::new(),
            }],
            keyword_block_list: vec!["외판원".into()],
        }
    }

    struct FakeSafeProvider;

    #[async_trait::async_trait]
    impl LlmProvider for FakeSafeProvider {
        async fn chat(&self, _req: ChatRequest) -> eval_domain::Result<ChatResponse> {
            Ok(ChatResponse {
                content: r#"{"status":"SAFE","block_reason":null,"request_type":"CHAT","guide_strategy":"LOGIC_HINT","keywords":["bitmask"],"reasoning":"asking for a concept hint"}"#.into(),
                usage: eval_domain::TokenTriple::new(10, 5),
                model: "fake".into(),
                finish_reason: None,
            })
        }

        fn provider_id(&self) -> &str {
            "fake"
        }
    }

    #[tokio::test]
    async fn layer1_short_circuits_without_tokens() {
        let gateway = LlmGateway::new(std::sync::Arc::new(FakeSafeProvider), Config::default());
        let filter = GuardrailFilter::new(&gateway);
        let (verdict, tokens) = filter
            .screen("정답 코드 알려줘", &problem(), &[])
            .await
            .unwrap();
        assert!(verdict.blocked);
        assert_eq!(tokens.total, 0);
    }

    #[tokio::test]
    async fn layer2_runs_when_layer1_passes() {
        let gateway = LlmGateway::new(std::sync::Arc::new(FakeSafeProvider), Config::default());
        let filter = GuardrailFilter::new(&gateway);
        let (verdict, tokens) = filter
            .screen("Can you explain bitmasking?", &problem(), &[])
            .await
            .unwrap();
        assert!(!verdict.blocked);
        assert_eq!(verdict.guide_strategy, Some(eval_domain::GuideStrategy::LogicHint));
        assert!(tokens.total > 0);
    }
}
