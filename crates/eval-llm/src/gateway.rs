//! The LLM Gateway facade (spec.md §4.B): `complete(node_name, prompt,
//! schema?) -> (Response, TokenTriple)`, with per-node config, retry/backoff
//! on `RATE_LIMITED`/`TRANSIENT`, and a global rate limit. Grounded on
//! `sa_providers::router::LlmRouter::chat_for_role`'s fallback/retry loop,
//! simplified to one provider (no multi-provider fallback chain — this
//! domain has a single configured chat model, not a role-based registry).

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use eval_domain::{Config, Error, Result, TokenTriple};

use crate::rate_limit::RateLimiter;
use crate::structured::{parse_structured, provider_native_fallback};
use crate::traits::{ChatDelta, ChatMessage, ChatRequest, ChatResponse, LlmProvider};

pub struct LlmGateway {
    provider: Arc<dyn LlmProvider>,
    config: Config,
    limiter: RateLimiter,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn LlmProvider>, config: Config) -> Self {
        let limiter = RateLimiter::new(config.llm.rate_limit.requests_per_minute);
        Self {
            provider,
            config,
            limiter,
        }
    }

    fn request_for(&self, node_name: &str, prompt: &str, json_mode: bool) -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user(prompt)],
            model: self.config.llm.model_for(node_name).to_owned(),
            temperature: self.config.llm.temperature,
            max_tokens: self.config.llm.max_tokens,
            json_mode,
        }
    }

    /// Send a request, retrying on retriable errors with exponential
    /// backoff up to `retry.max_attempts` (spec.md §4.B).
    async fn chat_with_retry(&self, req: ChatRequest) -> Result<ChatResponse> {
        let retry = self.config.llm.retry;
        let mut attempt = 0;
        loop {
            self.limiter.acquire().await;
            match tokio::time::timeout(
                Duration::from_millis(self.config.llm.request_timeout_ms),
                self.provider.chat(req.clone()),
            )
            .await
            {
                Ok(Ok(resp)) => return Ok(resp),
                Ok(Err(e)) if e.is_retriable() && attempt + 1 < retry.max_attempts => {
                    tracing::warn!(attempt, error = %e, "llm call failed, retrying");
                    tokio::time::sleep(retry.backoff_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(Error::Timeout("llm request timed out".into())),
            }
        }
    }

    /// Plain-text completion. Never writes to the Session Store (spec.md
    /// §4.B: "The gateway never writes to the Session Store").
    pub async fn complete(&self, node_name: &str, prompt: &str) -> Result<(ChatResponse, TokenTriple)> {
        let req = self.request_for(node_name, prompt, false);
        let resp = self.chat_with_retry(req).await?;
        let tokens = resp.usage;
        Ok((resp, tokens))
    }

    /// Streamed variant for the tutor reply path; deltas are pushed to
    /// `sink` as they arrive.
    pub async fn complete_stream(
        &self,
        node_name: &str,
        prompt: &str,
        sink: tokio::sync::mpsc::Sender<ChatDelta>,
    ) -> Result<(ChatResponse, TokenTriple)> {
        self.limiter.acquire().await;
        let req = self.request_for(node_name, prompt, false);
        let resp = tokio::time::timeout(
            Duration::from_millis(self.config.llm.request_timeout_ms),
            self.provider.chat_stream(req, sink),
        )
        .await
        .map_err(|_| Error::Timeout("llm stream timed out".into()))??;
        let tokens = resp.usage;
        Ok((resp, tokens))
    }

    /// Structured-output completion: three-step extraction, then
    /// provider-native fallback, per spec.md §4.B/§9.
    pub async fn complete_structured<T: DeserializeOwned>(
        &self,
        node_name: &str,
        prompt: &str,
    ) -> Result<(T, TokenTriple)> {
        let req = self.request_for(node_name, prompt, true);
        let resp = self.chat_with_retry(req.clone()).await?;
        let tokens = resp.usage;
        let provider = self.provider.clone();
        let fallback_req = req;
        let parsed = parse_structured(&resp.content, || async move {
            provider_native_fallback(provider.as_ref(), fallback_req).await
        })
        .await?;
        Ok((parsed, tokens))
    }
}
