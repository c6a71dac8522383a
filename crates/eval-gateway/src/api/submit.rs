//! `POST /session/submit` (spec.md §6), grounded on the same handler shape
//! as `chat.rs`; this call blocks until `submit_pipeline` completes, matching
//! the spec's "blocks until the full submission pipeline completes".

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::orchestrator::submit::{handle_submission, SubmitOutcome, SubmitRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    #[serde(rename = "examId")]
    pub exam_id: String,
    #[serde(rename = "participantId")]
    pub participant_id: String,
    #[serde(rename = "problemId")]
    pub problem_id: String,
    #[serde(rename = "specId")]
    pub spec_id: String,
    #[serde(rename = "finalCode")]
    pub final_code: String,
    pub language: String,
    #[serde(rename = "submissionId")]
    pub submission_id: String,
    /// Not named in spec.md's submit payload, but every submission belongs
    /// to the session opened by the prior chat turns — without it there is
    /// no way to look up that session's dialogue and turn logs.
    #[serde(rename = "sessionId")]
    pub session_id: i64,
}

#[derive(Serialize)]
struct SubmitResponse {
    #[serde(rename = "submissionId")]
    submission_id: String,
    status: &'static str,
}

pub async fn submit(State(state): State<AppState>, Json(body): Json<SubmitBody>) -> Response {
    let _permit = state.session_locks.acquire(body.session_id).await;

    let outcome = handle_submission(
        &state,
        SubmitRequest {
            session_id: body.session_id,
            exam_id: &body.exam_id,
            participant_id: &body.participant_id,
            problem_id: &body.problem_id,
            spec_id: &body.spec_id,
            language: &body.language,
            submission_id: &body.submission_id,
            final_code: &body.final_code,
        },
    )
    .await;

    match outcome {
        SubmitOutcome::Successed(_) => Json(SubmitResponse {
            submission_id: body.submission_id,
            status: "successed",
        })
        .into_response(),
        SubmitOutcome::Failed(msg) => {
            tracing::warn!(submission_id = %body.submission_id, error = %msg, "submission pipeline failed");
            Json(SubmitResponse {
                submission_id: body.submission_id,
                status: "failed",
            })
            .into_response()
        }
    }
}
