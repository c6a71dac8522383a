//! `POST /chat/messages` (spec.md §6), grounded on
//! `sa_gateway::api::chat::chat`'s request/response shape and status-code
//! conventions, trimmed to this domain's single synchronous reply (no
//! multi-provider fallback, no tool-call loop).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::orchestrator::chat::{handle_chat_turn, ChatOutcome, ChatTurnRequest};
use crate::state::AppState;

use super::api_error;

#[derive(Debug, Deserialize)]
pub struct ChatContext {
    #[serde(rename = "problemId")]
    pub problem_id: String,
    #[serde(rename = "specVersion")]
    pub spec_version: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    #[serde(rename = "sessionId")]
    pub session_id: i64,
    #[serde(rename = "participantId")]
    pub participant_id: String,
    /// The client's own turn counter — this domain assigns the authoritative
    /// turn number in `SessionStore::begin_turn`, so this field is logged for
    /// traceability only and never trusted as the stored turn index.
    #[serde(rename = "turnId")]
    pub turn_id: Option<i64>,
    pub content: String,
    pub context: ChatContext,
}

#[derive(Serialize)]
struct AiMessage {
    #[serde(rename = "sessionId")]
    session_id: i64,
    turn: u32,
    role: &'static str,
    content: String,
    #[serde(rename = "tokenCount")]
    token_count: u64,
    #[serde(rename = "totalToken")]
    total_token: u64,
}

#[derive(Serialize)]
struct ChatMessageResponse {
    #[serde(rename = "aiMessage")]
    ai_message: AiMessage,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatMessageRequest>,
) -> Response {
    let _permit = state.session_locks.acquire(body.session_id).await;

    tracing::debug!(
        session_id = body.session_id,
        turn_id = body.turn_id,
        "chat message received"
    );

    let outcome = handle_chat_turn(
        &state,
        ChatTurnRequest {
            session_id: body.session_id,
            participant_id: &body.participant_id,
            problem_id: &body.context.problem_id,
            spec_id: &body.context.spec_version,
            exam_id: None,
            language: None,
            message: &body.content,
        },
    )
    .await;

    match outcome {
        ChatOutcome::Success {
            turn,
            content,
            token_count,
            total_token,
        } => Json(ChatMessageResponse {
            ai_message: AiMessage {
                session_id: body.session_id,
                turn,
                role: "AI",
                content,
                token_count,
                total_token,
            },
        })
        .into_response(),
        ChatOutcome::UnknownSession(msg) => api_error(StatusCode::NOT_FOUND, &msg),
        ChatOutcome::Timeout => api_error(StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        ChatOutcome::Internal(msg) => api_error(StatusCode::INTERNAL_SERVER_ERROR, &msg),
    }
}
