mod llm;
mod sandbox;
mod server;
mod sessions;
mod weights;

pub use llm::*;
pub use sandbox::*;
pub use server::*;
pub use sessions::*;
pub use weights::*;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub weights: RubricWeightTable,
}

impl Config {
    /// Load from a TOML file, falling back to defaults for anything absent.
    pub fn from_toml_str(raw: &str) -> crate::Result<Self> {
        toml::from_str(raw).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Overlay the subset of fields that have dedicated env vars
    /// (spec.md §6). Called after `from_toml_str` so env always wins.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_MODEL_DEFAULT") {
            self.llm.model_default = v;
        }
        env_parse_into("LLM_TEMPERATURE", &mut self.llm.temperature);
        env_parse_into("LLM_MAX_TOKENS", &mut self.llm.max_tokens);
        env_parse_into(
            "CHECKPOINT_TTL_SECONDS",
            &mut self.sessions.checkpoint_ttl_seconds,
        );
        if let Ok(v) = std::env::var("USE_REDIS_QUEUE") {
            self.sandbox.use_redis_queue = matches!(v.as_str(), "1" | "true" | "TRUE");
        }
        if let Ok(v) = std::env::var("JUDGE0_API_URL") {
            self.sandbox.judge0_api_url = Some(v);
        }
        if let Ok(v) = std::env::var("JUDGE0_API_KEY") {
            self.sandbox.judge0_api_key = Some(v);
        }
        env_parse_into(
            "MIDDLEWARE_RATE_LIMIT_PER_MINUTE",
            &mut self.llm.rate_limit.requests_per_minute,
        );
        env_parse_into(
            "MIDDLEWARE_RETRY_MAX_ATTEMPTS",
            &mut self.llm.retry.max_attempts,
        );
        env_parse_into(
            "MIDDLEWARE_RETRY_BACKOFF_MS",
            &mut self.llm.retry.backoff_base_ms,
        );
    }
}

/// Parse an env var into `field` in place, warning (not failing) on a
/// malformed value so a typo'd override degrades to the existing default.
fn env_parse_into<T: std::str::FromStr>(key: &str, field: &mut T) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.parse() {
        Ok(v) => *field = v,
        Err(_) => tracing::warn!(key, raw, "ignoring malformed env override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_shape() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.model_default, "gpt-4o");
        assert_eq!(config.sessions.checkpoint_ttl_seconds, 86_400);
    }

    #[test]
    fn empty_toml_falls_back_to_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.sandbox.poll_interval_ms, 500);
    }
}
