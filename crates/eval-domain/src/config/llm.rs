use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider & middleware configuration (spec.md §6)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_model")]
    pub model_default: String,
    #[serde(default = "d_temperature")]
    pub temperature: f64,
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "d_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Per-node model overrides, keyed by node name (e.g. `"intent_classifier"`,
    /// `"rubric_evaluator"`, `"tutor_reply"`, `"guardrail_screen"`).
    #[serde(default)]
    pub node_overrides: HashMap<String, String>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_default: d_model(),
            temperature: d_temperature(),
            max_tokens: d_max_tokens(),
            request_timeout_ms: d_timeout_ms(),
            node_overrides: HashMap::new(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Resolve the model for a node, falling back to the session default.
    pub fn model_for(&self, node_name: &str) -> &str {
        self.node_overrides
            .get(node_name)
            .map(String::as_str)
            .unwrap_or(&self.model_default)
    }
}

/// Global token-bucket limits applied to outbound LLM calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "d_rpm")]
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: d_rpm(),
        }
    }
}

/// Backoff policy for RATE_LIMITED/TRANSIENT provider errors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "d_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "d_backoff_ms")]
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: d_max_attempts(),
            backoff_base_ms: d_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff with no jitter beyond attempt-indexed doubling.
    pub fn backoff_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let factor = 2u64.saturating_pow(attempt.min(16));
        std::time::Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

fn d_model() -> String {
    "gpt-4o".into()
}
fn d_temperature() -> f64 {
    0.7
}
fn d_max_tokens() -> u32 {
    2048
}
fn d_timeout_ms() -> u64 {
    30_000
}
fn d_rpm() -> u32 {
    60
}
fn d_max_attempts() -> u32 {
    3
}
fn d_backoff_ms() -> u64 {
    250
}
