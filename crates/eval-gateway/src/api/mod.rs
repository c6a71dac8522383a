//! Router assembly, grounded on `sa_gateway::api::mod::router` and
//! `sa_gateway::api::router::api_error`'s error-body helper, trimmed to the
//! two HTTP endpoints and one WebSocket endpoint spec.md §6 names — no
//! admin/auth/skills/MCP/dashboard surface.

pub mod chat;
pub mod submit;
pub mod ws;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/chat/messages", post(chat::chat))
        .route("/session/submit", post(submit::submit))
        .route("/ws/chat", get(ws::ws_chat))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Error-body helper matching spec.md §6's `{error_code, error_message}`
/// shape for 500s, reused for every non-2xx response this gateway returns.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error_code": status.as_u16(),
            "error_message": message,
        })),
    )
        .into_response()
}
