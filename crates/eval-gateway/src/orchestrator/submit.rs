//! `handle_request` → `submission_guard` → `submit_pipeline` (spec.md
//! §4.I), entered once per `POST /session/submit` call.

use eval_domain::{Error, Grade, SessionBinding, SessionId, SubmissionResult};
use eval_engine::{evaluate_code, evaluate_holistic, evaluate_turn};

use crate::state::AppState;

pub struct SubmitRequest<'a> {
    pub session_id: SessionId,
    pub exam_id: &'a str,
    pub participant_id: &'a str,
    pub problem_id: &'a str,
    pub spec_id: &'a str,
    pub language: &'a str,
    pub submission_id: &'a str,
    pub final_code: &'a str,
}

pub enum SubmitOutcome {
    Successed(SubmissionResult),
    Failed(String),
}

pub async fn handle_submission(state: &AppState, req: SubmitRequest<'_>) -> SubmitOutcome {
    let binding = SessionBinding {
        session_id: req.session_id,
        exam_id: req.exam_id.to_string(),
        participant_id: req.participant_id.to_string(),
        problem_id: req.problem_id.to_string(),
        spec_id: req.spec_id.to_string(),
        language: req.language.to_string(),
    };
    let session = match super::handle_request(state, binding).await {
        Ok(s) => s,
        Err(e) => return SubmitOutcome::Failed(e.to_string()),
    };
    let Some(problem) = session.problem.clone() else {
        return SubmitOutcome::Failed(format!("session {} has no problem bound", req.session_id));
    };

    if let Err(e) = submission_guard(state, req.session_id).await {
        tracing::warn!(session_id = req.session_id, error = %e, "submission guard failed to close a turn-log gap");
    }

    match submit_pipeline(state, req.session_id, &problem, req.final_code, req.language, req.submission_id).await {
        Ok(result) => SubmitOutcome::Successed(result),
        Err(e) => SubmitOutcome::Failed(e.to_string()),
    }
}

/// **submission_guard** (spec.md §4.I): synchronously evaluate every
/// completed turn with no recorded log, closing whatever the background
/// path in `chat::handle_chat_turn` hasn't caught up with yet. A turn left
/// user-only by a `handle_failure` branch (no assistant message) has no
/// pair to evaluate and is skipped — it was never a tutor reply to begin
/// with.
async fn submission_guard(state: &AppState, session_id: SessionId) -> eval_domain::Result<()> {
    let Some(session) = state.sessions.load(session_id) else {
        return Err(Error::Precondition(format!("unknown session {session_id}")));
    };
    for turn in session.turns_missing_log() {
        let (user, assistant) = session.dialogue.turn_messages(turn);
        let (Some(user), Some(assistant)) = (user, assistant) else {
            continue;
        };
        let Some(problem) = session.problem.clone() else {
            continue;
        };
        let (log, tokens) = evaluate_turn(
            &state.llm,
            &state.config.weights,
            turn,
            &user.content,
            &assistant.content,
            &problem,
            false,
        )
        .await;
        state.sessions.add_tokens(session_id, eval_sessions::TokenKind::Eval, tokens).await?;
        state.sessions.put_turn_log(session_id, turn, log).await?;
    }
    Ok(())
}

/// **submit_pipeline** (spec.md §4.I): holistic flow evaluation over every
/// turn log, then the sandboxed correctness/performance pass, then the
/// weighted aggregate.
async fn submit_pipeline(
    state: &AppState,
    session_id: SessionId,
    problem: &eval_domain::ProblemContext,
    final_code: &str,
    language: &str,
    submission_id: &str,
) -> eval_domain::Result<SubmissionResult> {
    let turn_logs = state.sessions.list_turn_logs(session_id);
    let (holistic_log, holistic_tokens) = evaluate_holistic(&state.llm, &turn_logs).await;
    state.sessions.add_tokens(session_id, eval_sessions::TokenKind::Eval, holistic_tokens).await?;
    state.sessions.put_holistic(session_id, holistic_log.clone()).await?;

    let code_eval = evaluate_code(&*state.sandbox, final_code, language, problem, &state.config.sandbox).await;

    let mean_weighted = if turn_logs.is_empty() {
        0.0
    } else {
        turn_logs.values().map(|l| l.weighted_score).sum::<f64>() / turn_logs.len() as f64
    };
    let prompt_score = (mean_weighted + holistic_log.flow_score) / 2.0;
    let total_score = prompt_score * 0.25 + code_eval.performance_score * 0.25 + code_eval.correctness_score * 0.50;

    let result = SubmissionResult {
        correctness_score: code_eval.correctness_score,
        performance_score: code_eval.performance_score,
        prompt_score,
        total_score,
        grade: Grade::from_total(total_score),
        test_outcomes: code_eval.test_outcomes,
        measured_time_sec: code_eval.measured_time_sec,
        measured_memory_mb: code_eval.measured_memory_mb,
        skip_reason: code_eval.skip_reason,
    };

    state.sessions.mark_submitted(submission_id, session_id, result.clone()).await?;
    Ok(result)
}
