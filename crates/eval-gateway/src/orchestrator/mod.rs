//! The Session Orchestrator (spec.md §4.I): the directed graph gluing the
//! Session Store, Guardrail Filter, Tutor Reply Generator, Turn Evaluator,
//! Holistic Evaluator, and Code Evaluator together. Grounded on the design
//! note "graph as data, not control flow" — each state below is a function
//! of an immutable request context, not a method threading mutable state
//! through a handler; `chat::handle_chat_turn` and `submit::handle_submission`
//! are the two entry points the HTTP layer calls, each walking its half of
//! the state-machine summary in one pass.

pub mod background;
pub mod chat;
pub mod submit;

use eval_domain::{Error, Result, SessionBinding, SessionId};
use eval_sessions::SessionState;

use crate::state::AppState;

/// **handle_request** (spec.md §4.I): load-or-create the session and attach
/// problem context if missing. Turn assignment itself happens inside
/// `SessionStore::begin_turn`, called by `chat::handle_chat_turn` once the
/// message content is known.
pub async fn handle_request(state: &AppState, binding: SessionBinding) -> Result<SessionState> {
    let session_id = binding.session_id;
    let spec_id = binding.spec_id.clone();
    state.sessions.load_or_create(binding).await;
    state.sessions.ensure_problem(session_id, &spec_id).await?;
    state
        .sessions
        .load(session_id)
        .ok_or_else(|| Error::Precondition(format!("session {session_id} vanished after create")))
}

/// Crude token estimate used for the `token_count` recorded on each
/// `Message` — this domain has no tokenizer dependency in its stack, so a
/// whitespace word count stands in for it, consistently applied to both
/// user and assistant message records.
pub fn estimate_tokens(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Up to the last `window` user-message texts strictly before the turn
/// about to be opened, oldest first — the shape `guardrail::layer1::screen`
/// and `layer2::screen` both expect for their "recent turns" parameter.
pub fn recent_user_texts(state: &SessionState, window: usize) -> Vec<String> {
    let mut texts: Vec<String> = state
        .dialogue
        .messages
        .iter()
        .filter(|m| m.role == eval_domain::Role::User)
        .map(|m| m.content.clone())
        .collect();
    let start = texts.len().saturating_sub(window);
    texts.split_off(start)
}

/// Up to the last `window` messages of either role, oldest first, as the
/// dialogue-turn shape `eval_engine::tutor::TutorRequest` expects.
pub fn recent_dialogue(state: &SessionState, window: usize) -> Vec<eval_engine::DialogueTurn> {
    let messages = &state.dialogue.messages;
    let start = messages.len().saturating_sub(window);
    messages[start..]
        .iter()
        .map(|m| eval_engine::DialogueTurn {
            role: match m.role {
                eval_domain::Role::User => eval_llm::ChatRole::User,
                eval_domain::Role::Assistant => eval_llm::ChatRole::Assistant,
            },
            content: m.content.clone(),
        })
        .collect()
}

/// Turns kept verbatim after `summarize_memory` runs; everything before
/// `current_turn - MEMORY_SUMMARY_KEEP_TURNS` is folded into the summary.
pub const MEMORY_SUMMARY_KEEP_TURNS: u32 = 5;

/// **summarize_memory** (spec.md §4.I): replace the dialogue buffer's older
/// prefix with an LLM-produced summary, keeping the most recent turns
/// verbatim. Re-entering `handle_request` afterward is the caller's job —
/// this function runs once per call, matching the "at most once" looseness
/// the design note ascribes to this edge.
pub async fn summarize_memory(state: &AppState, session_id: SessionId) -> Result<()> {
    let Some(session) = state.sessions.load(session_id) else {
        return Err(Error::Precondition(format!("unknown session {session_id}")));
    };
    let keep_from = session.current_turn.saturating_sub(MEMORY_SUMMARY_KEEP_TURNS).max(1);
    let transcript: String = session
        .dialogue
        .messages
        .iter()
        .filter(|m| m.turn < keep_from)
        .map(|m| format!("turn {} {:?}: {}\n", m.turn, m.role, m.content))
        .collect();
    let prompt = format!(
        "Summarize this coding-tutor conversation prefix in a few sentences, \
         preserving the problem-solving approach agreed on so far:\n\n{transcript}"
    );
    let (resp, tokens) = state.llm.complete("memory_summary", &prompt).await?;
    state
        .sessions
        .add_tokens(session_id, eval_sessions::TokenKind::Chat, tokens)
        .await?;
    state.sessions.summarize_dialogue(session_id, keep_from, resp.content).await
}
