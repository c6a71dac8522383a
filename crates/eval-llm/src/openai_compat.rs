//! OpenAI-compatible HTTP adapter, trimmed from `sa_providers::openai_compat`
//! (no tool calls, no Azure/vision branches, no keychain — auth is a single
//! env var, matching this domain's single-provider, no-interactive-login
//! shape).

use serde_json::Value;

use eval_domain::{Error, Result, TokenTriple};

use crate::traits::{ChatDelta, ChatMessage, ChatRequest, ChatResponse, ChatRole, LlmProvider};

pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build from an env var holding the API key, the way `resolve_api_key`'s
    /// env branch does (without the keychain precedence chain this domain
    /// doesn't need).
    pub fn from_env(id: impl Into<String>, base_url: impl Into<String>, env_var: &str) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .map_err(|_| Error::Config(format!("{env_var} not set")))?;
        Ok(Self::new(id, base_url, api_key))
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let messages: Vec<Value> = req
            .messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": role_str(m.role),
                    "content": m.content,
                })
            })
            .collect();
        let mut body = serde_json::json!({
            "model": req.model,
            "messages": messages,
            "temperature": req.temperature,
        });
        if req.max_tokens > 0 {
            body["max_tokens"] = serde_json::json!(req.max_tokens);
        }
        if req.json_mode {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        body
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let body = self.build_body(req);
        let resp = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited(format!("{} rate limited", self.id)));
        }
        if status.is_server_error() {
            return Err(Error::Transient(format!("{} returned {status}", self.id)));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {status}: {text}"),
            });
        }

        let parsed: OpenAiChatResponse = resp.json().await.map_err(map_reqwest_error)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        let usage = parsed
            .usage
            .map(|u| TokenTriple::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(ChatResponse {
            content,
            usage,
            model: parsed.model,
            finish_reason: None,
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
        self.send(&req).await
    }

    async fn chat_stream(
        &self,
        req: ChatRequest,
        sink: tokio::sync::mpsc::Sender<ChatDelta>,
    ) -> Result<ChatResponse> {
        // No native SSE streaming wired up here — this domain has no
        // tool-call layer to stream incrementally, so send the full
        // response as a single delta, same as the trait default.
        let resp = self.send(&req).await?;
        let _ = sink
            .send(ChatDelta {
                content: resp.content.clone(),
            })
            .await;
        Ok(resp)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

fn role_str(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "system",
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Transient(e.to_string())
    }
}

#[derive(serde::Deserialize)]
struct OpenAiChatResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(serde::Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(serde::Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(serde::Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
