//! Streaming tutor-reply deltas over WebSocket (spec.md §6), grounded on
//! `sa_gateway::api::chat::chat_stream`'s SSE `TurnEvent` stream, adapted to
//! WS framing. Envelope: `{delta}`, `{done, turn, tokenCount, totalToken}`,
//! `{error}`, `{cancelled}`. A first client frame carries the same fields as
//! `ChatMessageRequest`; a later `{"type":"cancel"}` frame cancels the
//! in-flight generation via `CancelMap`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use eval_engine::tutor::{DialogueTurn as TutorDialogueTurn, TutorOutcome, TutorRequest};
use eval_guardrail::GuardrailFilter;

use crate::orchestrator::{self, background};
use crate::state::AppState;

use super::chat::ChatMessageRequest;

pub async fn ws_chat(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientFrame {
    Message(ChatMessageRequest),
    Cancel { turn_id: Option<i64> },
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let Some(Ok(Message::Text(text))) = socket.recv().await else {
        return;
    };
    let frame: ClientFrame = match serde_json::from_str(&text) {
        Ok(f) => f,
        Err(e) => {
            let _ = send_json(&mut socket, &json!({"error": e.to_string()})).await;
            return;
        }
    };
    let ClientFrame::Message(req) = frame else {
        let _ = send_json(&mut socket, &json!({"error": "first frame must be a message"})).await;
        return;
    };

    let _permit = state.session_locks.acquire(req.session_id).await;
    let cancel = state.cancel_map.register(req.session_id);

    let binding = eval_domain::SessionBinding {
        session_id: req.session_id,
        exam_id: "unassigned".into(),
        participant_id: req.participant_id.clone(),
        problem_id: req.context.problem_id.clone(),
        spec_id: req.context.spec_version.clone(),
        language: "python".into(),
    };
    let session = match orchestrator::handle_request(&state, binding).await {
        Ok(s) => s,
        Err(e) => {
            let _ = send_json(&mut socket, &json!({"error": e.to_string()})).await;
            state.cancel_map.remove(req.session_id);
            return;
        }
    };
    let Some(problem) = session.problem.clone() else {
        let _ = send_json(&mut socket, &json!({"error": "session has no problem bound"})).await;
        state.cancel_map.remove(req.session_id);
        return;
    };

    let recent_turns = orchestrator::recent_user_texts(&session, 3);
    let guardrail = GuardrailFilter::new(&state.llm);
    let guardrail_result = guardrail.screen(&req.content, &problem, &recent_turns).await;

    let turn = match state
        .sessions
        .begin_turn(req.session_id, req.content.clone(), orchestrator::estimate_tokens(&req.content))
        .await
    {
        Ok(t) => t,
        Err(e) => {
            let _ = send_json(&mut socket, &json!({"error": e.to_string()})).await;
            state.cancel_map.remove(req.session_id);
            return;
        }
    };

    let (verdict, guardrail_tokens) = match guardrail_result {
        Ok(v) => v,
        Err(e) => {
            let _ = send_json(&mut socket, &json!({"error": e.to_string()})).await;
            state.cancel_map.remove(req.session_id);
            return;
        }
    };
    if let Err(e) = state
        .sessions
        .add_tokens(req.session_id, eval_sessions::TokenKind::Chat, guardrail_tokens)
        .await
    {
        let _ = send_json(&mut socket, &json!({"error": e.to_string()})).await;
        state.cancel_map.remove(req.session_id);
        return;
    }

    let recent_messages: Vec<TutorDialogueTurn> = orchestrator::recent_dialogue(&session, 10)
        .into_iter()
        .map(|m| TutorDialogueTurn { role: m.role, content: m.content })
        .collect();
    let memory_summary = session.dialogue.summary.clone();
    let request = TutorRequest {
        turn,
        message: &req.content,
        recent_messages: &recent_messages,
        memory_summary: memory_summary.as_deref(),
        problem: &problem,
        guardrail_failed: verdict.blocked,
        block_reason: verdict.block_reason,
        guardrail_reasoning: &verdict.reasoning,
        guide_strategy: verdict.guide_strategy,
        keywords: &verdict.keywords,
    };

    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let reply_fut = eval_engine::generate_tutor_reply_stream(&state.llm, &request, tx);
    tokio::pin!(reply_fut);

    let reply = loop {
        tokio::select! {
            biased;
            _ = tokio::time::sleep(std::time::Duration::from_millis(20)), if cancel.is_cancelled() => {
                let _ = send_json(&mut socket, &json!({"cancelled": true})).await;
                state.cancel_map.remove(req.session_id);
                return;
            }
            delta = rx.recv() => {
                if let Some(delta) = delta {
                    if send_json(&mut socket, &json!({"delta": delta.content})).await.is_err() {
                        state.cancel_map.remove(req.session_id);
                        return;
                    }
                }
            }
            reply = &mut reply_fut => break reply,
        }
    };

    state.cancel_map.remove(req.session_id);

    if !matches!(
        reply.outcome,
        TutorOutcome::FailedRateLimit | TutorOutcome::FailedThreshold | TutorOutcome::FailedTechnical
    ) {
        if state
            .sessions
            .complete_turn(req.session_id, turn, reply.content.clone(), orchestrator::estimate_tokens(&reply.content))
            .await
            .is_err()
        {
            let _ = send_json(&mut socket, &json!({"error": "failed to record reply"})).await;
            return;
        }
        let totals = match state
            .sessions
            .add_tokens(req.session_id, eval_sessions::TokenKind::Chat, reply.tokens)
            .await
        {
            Ok(t) => t,
            Err(e) => {
                let _ = send_json(&mut socket, &json!({"error": e.to_string()})).await;
                return;
            }
        };

        if verdict.blocked {
            let (log, tokens) = eval_engine::evaluate_turn(
                &state.llm,
                &state.config.weights,
                turn,
                &req.content,
                &reply.content,
                &problem,
                true,
            )
            .await;
            let _ = state.sessions.add_tokens(req.session_id, eval_sessions::TokenKind::Eval, tokens).await;
            let _ = state.sessions.put_turn_log(req.session_id, turn, log).await;
        } else {
            background::spawn_turn_evaluation(
                state.clone(),
                req.session_id,
                turn,
                req.content.clone(),
                reply.content.clone(),
                problem,
                false,
            );
        }

        let _ = send_json(
            &mut socket,
            &json!({
                "done": true,
                "turn": turn,
                "tokenCount": reply.tokens.total,
                "totalToken": totals.chat_tokens.total,
            }),
        )
        .await;
    } else {
        let _ = send_json(&mut socket, &json!({"error": format!("{:?}", reply.outcome)})).await;
    }
}

async fn send_json(socket: &mut WebSocket, value: &serde_json::Value) -> Result<(), axum::Error> {
    socket.send(Message::Text(value.to_string())).await
}
