//! Provider-agnostic chat types, grounded on `sa_providers::traits`'s
//! `ChatRequest`/`ChatResponse`/`LlmProvider` shape, trimmed to what this
//! domain needs (no tool calls, no embeddings).

use eval_domain::{Result, TokenTriple};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Set when the caller wants structured JSON back (spec.md §4.B).
    pub json_mode: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            model: model.into(),
            temperature: 0.0,
            max_tokens: 0,
            json_mode: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: TokenTriple,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// One streamed token delta (spec.md §6 WebSocket envelope, `delta` variant).
#[derive(Debug, Clone)]
pub struct ChatDelta {
    pub content: String,
}

/// Trait every LLM adapter implements (spec.md §4.B: "uniform
/// request/response to an external chat model").
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse>;

    /// Streamed variant, used by the tutor reply path when the transport
    /// requested streaming. The default implementation synthesizes a
    /// single-delta stream from `chat`, so adapters without native
    /// streaming support still work.
    async fn chat_stream(
        &self,
        req: ChatRequest,
        sink: tokio::sync::mpsc::Sender<ChatDelta>,
    ) -> Result<ChatResponse> {
        let resp = self.chat(req).await?;
        let _ = sink
            .send(ChatDelta {
                content: resp.content.clone(),
            })
            .await;
        Ok(resp)
    }

    fn provider_id(&self) -> &str;
}
