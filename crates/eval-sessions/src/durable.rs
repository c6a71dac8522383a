//! Durable mirror: the two external tables spec.md §6 names.
//!
//! `Arc<dyn DurableStore>` is injected into the orchestrator the way
//! `sa_memory::provider::SerialMemoryProvider` is injected as a trait object
//! into `AppState` — concrete backends (Postgres, etc.) live outside this
//! workspace; tests exercise the in-memory fake below.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use eval_domain::{
    HolisticLog, ProblemContext, Result, SessionId, SubmissionResult, Turn, TurnLog,
};

/// Discriminates the two evaluation row kinds written to the durable store
/// (spec.md §6: "Writes two evaluation kinds, discriminated by
/// `evaluation_type`").
#[derive(Debug, Clone)]
pub enum EvaluationRecord {
    TurnEval { turn: Turn, log: TurnLog },
    HolisticFlow { log: HolisticLog },
}

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Read a problem spec from the catalog, keyed by `spec_id`.
    async fn problem_spec(&self, spec_id: &str) -> Result<Option<ProblemContext>>;

    /// Upsert an evaluation row, unique by (session_id, turn, evaluation_type).
    async fn write_evaluation(
        &self,
        session_id: SessionId,
        record: EvaluationRecord,
    ) -> Result<()>;

    /// Write the submission's final score row, keyed by submission id.
    async fn write_submission(
        &self,
        submission_id: &str,
        session_id: SessionId,
        result: SubmissionResult,
    ) -> Result<()>;
}

/// In-memory fake used in tests and as the default backend until a real
/// persistence adapter is wired in.
#[derive(Default)]
pub struct InMemoryDurableStore {
    problems: Mutex<HashMap<String, ProblemContext>>,
    turn_evals: Mutex<HashMap<(SessionId, Turn), TurnLog>>,
    holistic: Mutex<HashMap<SessionId, HolisticLog>>,
    submissions: Mutex<HashMap<String, SubmissionResult>>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_problem(&self, spec_id: impl Into<String>, problem: ProblemContext) {
        self.problems.lock().unwrap().insert(spec_id.into(), problem);
    }

    pub fn turn_eval_count(&self, session_id: SessionId) -> usize {
        self.turn_evals
            .lock()
            .unwrap()
            .keys()
            .filter(|(sid, _)| *sid == session_id)
            .count()
    }

    pub fn holistic_count(&self, session_id: SessionId) -> usize {
        usize::from(self.holistic.lock().unwrap().contains_key(&session_id))
    }

    pub fn submission(&self, submission_id: &str) -> Option<SubmissionResult> {
        self.submissions.lock().unwrap().get(submission_id).cloned()
    }
}

#[async_trait]
impl DurableStore for InMemoryDurableStore {
    async fn problem_spec(&self, spec_id: &str) -> Result<Option<ProblemContext>> {
        Ok(self.problems.lock().unwrap().get(spec_id).cloned())
    }

    async fn write_evaluation(
        &self,
        session_id: SessionId,
        record: EvaluationRecord,
    ) -> Result<()> {
        match record {
            EvaluationRecord::TurnEval { turn, log } => {
                self.turn_evals.lock().unwrap().insert((session_id, turn), log);
            }
            EvaluationRecord::HolisticFlow { log } => {
                self.holistic.lock().unwrap().insert(session_id, log);
            }
        }
        Ok(())
    }

    async fn write_submission(
        &self,
        submission_id: &str,
        _session_id: SessionId,
        result: SubmissionResult,
    ) -> Result<()> {
        self.submissions
            .lock()
            .unwrap()
            .insert(submission_id.to_owned(), result);
        Ok(())
    }
}
