use serde::{Deserialize, Serialize};

/// Token usage for a single LLM call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenTriple {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

impl TokenTriple {
    pub fn new(prompt: u64, completion: u64) -> Self {
        Self {
            prompt,
            completion,
            total: prompt + completion,
        }
    }

    pub fn add(&mut self, other: TokenTriple) {
        self.prompt += other.prompt;
        self.completion += other.completion;
        self.total += other.total;
    }
}

/// The two independent token accumulators a session tracks (spec.md §3).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenCounters {
    /// Tokens spent by the guardrail filter and tutor reply generator.
    pub chat_tokens: TokenTriple,
    /// Tokens spent by the turn and holistic evaluators.
    pub eval_tokens: TokenTriple,
}

impl TokenCounters {
    pub fn add_chat(&mut self, triple: TokenTriple) {
        self.chat_tokens.add(triple);
    }

    pub fn add_eval(&mut self, triple: TokenTriple) {
        self.eval_tokens.add(triple);
    }
}
