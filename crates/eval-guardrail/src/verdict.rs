use eval_domain::{BlockReason, GuideStrategy, RequestType};

/// Outcome of running both guardrail layers on a single user message.
#[derive(Debug, Clone)]
pub struct GuardrailVerdict {
    pub blocked: bool,
    pub block_reason: Option<BlockReason>,
    pub request_type: RequestType,
    pub guide_strategy: Option<GuideStrategy>,
    pub keywords: Vec<String>,
    pub reasoning: String,
}

impl GuardrailVerdict {
    /// Layer 1 only ever blocks on `DirectAnswer`, never classifies
    /// request type or strategy (spec.md §4.D: "without any LLM call").
    pub fn layer1_block(reason: BlockReason, reasoning: String) -> Self {
        Self {
            blocked: true,
            block_reason: Some(reason),
            request_type: RequestType::Chat,
            guide_strategy: None,
            keywords: Vec::new(),
            reasoning,
        }
    }
}
