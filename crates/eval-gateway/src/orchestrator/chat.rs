//! `handle_request` → `intent_analyze` → `{tutor_reply, handle_failure}`
//! (spec.md §4.I), entered once per `POST /chat/messages` call. A guardrail
//! BLOCKED verdict still runs through `tutor_reply` (the refusal message
//! *is* the reply, per spec.md §4.E); `handle_failure` is reserved for the
//! cases where no reply can be produced at all — rate limiting, a timeout,
//! or any other technical failure — matching the design note's "graph as
//! data" framing rather than bolting each branch on separately.

use eval_domain::message::Turn;
use eval_domain::{BlockReason, Error, ProblemContext, SessionBinding, SessionId};
use eval_engine::tutor::{DialogueTurn as TutorDialogueTurn, TutorOutcome, TutorRequest};
use eval_guardrail::{GuardrailFilter, GuardrailVerdict};

use super::{background, estimate_tokens, recent_dialogue, recent_user_texts};
use crate::state::AppState;

pub struct ChatTurnRequest<'a> {
    pub session_id: SessionId,
    pub participant_id: &'a str,
    pub problem_id: &'a str,
    pub spec_id: &'a str,
    /// Absent for every chat call after the session's first; the exam/
    /// language fields `/chat/messages` payloads omit are only ever
    /// carried by `/session/submit`, so the first chat turn fills them in
    /// with placeholders a real deployment would resolve out-of-band.
    pub exam_id: Option<&'a str>,
    pub language: Option<&'a str>,
    pub message: &'a str,
}

pub enum ChatOutcome {
    Success { turn: Turn, content: String, token_count: u64, total_token: u64 },
    UnknownSession(String),
    Timeout,
    Internal(String),
}

const RECENT_TURN_WINDOW: usize = 3;
const RECENT_DIALOGUE_MESSAGES: usize = 10;

pub async fn handle_chat_turn(state: &AppState, req: ChatTurnRequest<'_>) -> ChatOutcome {
    let binding = SessionBinding {
        session_id: req.session_id,
        exam_id: req.exam_id.unwrap_or("unassigned").to_string(),
        participant_id: req.participant_id.to_string(),
        problem_id: req.problem_id.to_string(),
        spec_id: req.spec_id.to_string(),
        language: req.language.unwrap_or("python").to_string(),
    };
    let session = match super::handle_request(state, binding).await {
        Ok(s) => s,
        Err(Error::Precondition(msg)) => return ChatOutcome::UnknownSession(msg),
        Err(e) => return ChatOutcome::Internal(e.to_string()),
    };

    let Some(problem) = session.problem.clone() else {
        return ChatOutcome::UnknownSession(format!("session {} has no problem bound", req.session_id));
    };

    let recent_turns = recent_user_texts(&session, RECENT_TURN_WINDOW);
    let recent_messages: Vec<TutorDialogueTurn> = recent_dialogue(&session, RECENT_DIALOGUE_MESSAGES)
        .into_iter()
        .map(|m| TutorDialogueTurn { role: m.role, content: m.content })
        .collect();

    let guardrail = GuardrailFilter::new(&state.llm);
    let guardrail_result = guardrail.screen(req.message, &problem, &recent_turns).await;

    // handle_request: assign the turn number only once the screen has
    // run, so a request that never gets this far doesn't burn a turn.
    let turn = match state
        .sessions
        .begin_turn(req.session_id, req.message.to_string(), estimate_tokens(req.message))
        .await
    {
        Ok(t) => t,
        Err(e) => return ChatOutcome::Internal(e.to_string()),
    };

    let (verdict, guardrail_tokens) = match guardrail_result {
        Ok(v) => v,
        Err(Error::Timeout(_)) => return ChatOutcome::Timeout,
        Err(Error::RateLimited(_)) => {
            return handle_failure(turn, "I'm getting rate limited right now — please try again shortly.");
        }
        Err(e) => {
            tracing::warn!(session_id = req.session_id, turn, error = %e, "guardrail screening failed");
            return handle_failure(turn, "Something went wrong processing that message — please try again.");
        }
    };
    if let Err(e) = state
        .sessions
        .add_tokens(req.session_id, eval_sessions::TokenKind::Chat, guardrail_tokens)
        .await
    {
        return ChatOutcome::Internal(e.to_string());
    }

    let reply = generate_reply_with_memory_retry(state, req.session_id, turn, req.message, &recent_messages, &problem, &verdict).await;

    match reply.outcome {
        TutorOutcome::FailedRateLimit => {
            return handle_failure(turn, "I'm getting rate limited right now — please try again shortly.");
        }
        TutorOutcome::FailedThreshold | TutorOutcome::FailedTechnical => {
            return handle_failure(turn, "Something went wrong generating a reply — please try again.");
        }
        TutorOutcome::FailedGuardrail | TutorOutcome::Success => {}
    }

    if let Err(e) = state
        .sessions
        .complete_turn(req.session_id, turn, reply.content.clone(), estimate_tokens(&reply.content))
        .await
    {
        return ChatOutcome::Internal(e.to_string());
    }
    let totals = match state
        .sessions
        .add_tokens(req.session_id, eval_sessions::TokenKind::Chat, reply.tokens)
        .await
    {
        Ok(t) => t,
        Err(e) => return ChatOutcome::Internal(e.to_string()),
    };

    if verdict.blocked {
        evaluate_blocked_turn_sync(state, req.session_id, turn, req.message, &reply.content, &problem, verdict.block_reason).await;
    } else {
        background::spawn_turn_evaluation(
            state.clone(),
            req.session_id,
            turn,
            req.message.to_string(),
            reply.content.clone(),
            problem,
            false,
        );
    }

    ChatOutcome::Success {
        turn,
        content: reply.content,
        token_count: guardrail_tokens.total + reply.tokens.total,
        total_token: totals.chat_tokens.total,
    }
}

/// Generate the reply, and if it fails with `FailedThreshold` (context
/// overflow), run `summarize_memory` once and retry on the same turn —
/// **summarize_memory** (spec.md §4.I) looping back into the same request
/// rather than restarting it, since the turn is already open.
async fn generate_reply_with_memory_retry(
    state: &AppState,
    session_id: SessionId,
    turn: Turn,
    message: &str,
    recent_messages: &[TutorDialogueTurn],
    problem: &ProblemContext,
    verdict: &GuardrailVerdict,
) -> eval_engine::tutor::TutorReply {
    let memory_summary = state.sessions.load(session_id).and_then(|s| s.dialogue.summary);
    let request = TutorRequest {
        turn,
        message,
        recent_messages,
        memory_summary: memory_summary.as_deref(),
        problem,
        guardrail_failed: verdict.blocked,
        block_reason: verdict.block_reason,
        guardrail_reasoning: &verdict.reasoning,
        guide_strategy: verdict.guide_strategy,
        keywords: &verdict.keywords,
    };
    let reply = eval_engine::generate_tutor_reply(&state.llm, &request).await;
    if reply.outcome != TutorOutcome::FailedThreshold {
        return reply;
    }
    if let Err(e) = super::summarize_memory(state, session_id).await {
        tracing::warn!(session_id, turn, error = %e, "memory summarization failed, surfacing context overflow as-is");
        return reply;
    }
    let memory_summary = state.sessions.load(session_id).and_then(|s| s.dialogue.summary);
    let request = TutorRequest {
        turn,
        message,
        recent_messages,
        memory_summary: memory_summary.as_deref(),
        problem,
        guardrail_failed: verdict.blocked,
        block_reason: verdict.block_reason,
        guardrail_reasoning: &verdict.reasoning,
        guide_strategy: verdict.guide_strategy,
        keywords: &verdict.keywords,
    };
    eval_engine::generate_tutor_reply(&state.llm, &request).await
}

/// **handle_failure** (spec.md §4.I / §7): a human-readable message for the
/// caller, with no assistant message or turn log persisted — the turn stays
/// user-only, the same posture spec.md §8 scenario 6 describes for a
/// timeout, here applied uniformly to rate-limit and technical failures so
/// `submission_guard` has one consistent gap to close later.
fn handle_failure(turn: Turn, message: &str) -> ChatOutcome {
    ChatOutcome::Success {
        turn,
        content: message.to_string(),
        token_count: 0,
        total_token: 0,
    }
}

async fn evaluate_blocked_turn_sync(
    state: &AppState,
    session_id: SessionId,
    turn: Turn,
    message: &str,
    reply: &str,
    problem: &ProblemContext,
    _block_reason: Option<BlockReason>,
) {
    let (log, tokens) = eval_engine::evaluate_turn(&state.llm, &state.config.weights, turn, message, reply, problem, true).await;
    if let Err(e) = state.sessions.add_tokens(session_id, eval_sessions::TokenKind::Eval, tokens).await {
        tracing::warn!(session_id, turn, error = %e, "failed to record guardrail-block eval tokens");
    }
    if let Err(e) = state.sessions.put_turn_log(session_id, turn, log).await {
        tracing::warn!(session_id, turn, error = %e, "failed to persist guardrail-block turn log");
    }
}
