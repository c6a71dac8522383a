//! Background turn evaluation (spec.md §4.I `tutor_reply`: "spawns a
//! background evaluation of the turn it just answered rather than blocking
//! the reply on it"). Grounded on the teacher's `runtime::task::TaskRunner`
//! fire-and-forget `tokio::spawn` pattern, trimmed of its cancellation-group
//! plumbing — a turn evaluation has no children to cascade-cancel, only the
//! session-level `CancelMap` entry a client could in principle clear.

use eval_domain::message::Turn;
use eval_domain::{ProblemContext, SessionId};
use eval_engine::evaluate_turn;

use crate::state::AppState;

/// Spawn the four-stage turn evaluation for `turn` if nothing has recorded
/// a log for it yet. At-most-once is enforced by checking immediately
/// before spawning and once more immediately before the write, since
/// `submission_guard` can race this task and fill the same gap
/// synchronously while the LLM calls are in flight.
pub fn spawn_turn_evaluation(
    state: AppState,
    session_id: SessionId,
    turn: Turn,
    message: String,
    reply: String,
    problem: ProblemContext,
    guardrail_failed: bool,
) {
    if state.sessions.get_turn_log(session_id, turn).is_some() {
        return;
    }
    tokio::spawn(async move {
        let (log, tokens) = evaluate_turn(
            &state.llm,
            &state.config.weights,
            turn,
            &message,
            &reply,
            &problem,
            guardrail_failed,
        )
        .await;

        if state.sessions.get_turn_log(session_id, turn).is_some() {
            tracing::debug!(session_id, turn, "turn log already written, dropping background result");
            return;
        }
        if let Err(e) = state
            .sessions
            .add_tokens(session_id, eval_sessions::TokenKind::Eval, tokens)
            .await
        {
            tracing::warn!(session_id, turn, error = %e, "failed to record background eval tokens");
        }
        if let Err(e) = state.sessions.put_turn_log(session_id, turn, log).await {
            tracing::warn!(session_id, turn, error = %e, "failed to persist background turn log");
        }
    });
}
