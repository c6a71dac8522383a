//! The unified Session Store (spec.md §4.A): one trait-shaped facade over
//! the ephemeral layer and the durable mirror, serializing writes per
//! session.

use std::sync::Arc;
use std::time::Duration;

use eval_domain::{
    Error, HolisticLog, Message, ProblemContext, Result, Role, SessionBinding, SessionId,
    TokenCounters, TokenTriple, Turn, TurnLog,
};

use crate::durable::{DurableStore, EvaluationRecord};
use crate::ephemeral::EphemeralStore;
use crate::state::SessionState;
use crate::write_lock::SessionWriteLockMap;

/// Which of the two token accumulators a write targets (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Chat,
    Eval,
}

pub struct SessionStore {
    ephemeral: EphemeralStore,
    durable: Arc<dyn DurableStore>,
    write_locks: SessionWriteLockMap,
}

impl SessionStore {
    pub fn new(ttl: Duration, durable: Arc<dyn DurableStore>) -> Self {
        Self {
            ephemeral: EphemeralStore::new(ttl),
            durable,
            write_locks: SessionWriteLockMap::new(),
        }
    }

    /// Load session state, creating a fresh one bound to `binding` if it
    /// does not already exist in the ephemeral layer.
    pub async fn load_or_create(&self, binding: SessionBinding) -> SessionState {
        let session_id = binding.session_id;
        if let Some(state) = self.ephemeral.load(session_id) {
            return state;
        }
        let state = SessionState::new(binding);
        self.ephemeral.save(session_id, state.clone());
        state
    }

    pub fn load(&self, session_id: SessionId) -> Option<SessionState> {
        self.ephemeral.load(session_id)
    }

    /// Attach problem context if the session doesn't carry one yet
    /// (spec.md §4.I `handle_request`).
    pub async fn ensure_problem(&self, session_id: SessionId, spec_id: &str) -> Result<()> {
        let _guard = self.write_locks.acquire(session_id).await;
        let Some(mut state) = self.ephemeral.load(session_id) else {
            return Err(Error::Precondition(format!("unknown session {session_id}")));
        };
        if state.problem.is_some() {
            return Ok(());
        }
        let problem = self
            .durable
            .problem_spec(spec_id)
            .await?
            .ok_or_else(|| Error::Precondition(format!("unknown problem spec {spec_id}")))?;
        state.problem = Some(problem);
        self.ephemeral.save(session_id, state);
        Ok(())
    }

    /// Assign the next turn number and record the user's message. Returns
    /// the assigned turn.
    pub async fn begin_turn(&self, session_id: SessionId, content: String, tokens: u64) -> Result<Turn> {
        let _guard = self.write_locks.acquire(session_id).await;
        let mut state = self
            .ephemeral
            .load(session_id)
            .ok_or_else(|| Error::Precondition(format!("unknown session {session_id}")))?;
        let turn = state.current_turn + 1;
        state.current_turn = turn;
        state.dialogue.push(Message::user(turn, content, tokens));
        self.ephemeral.save(session_id, state);
        Ok(turn)
    }

    /// Record the assistant's reply for a turn already opened by `begin_turn`.
    pub async fn complete_turn(
        &self,
        session_id: SessionId,
        turn: Turn,
        content: String,
        tokens: u64,
    ) -> Result<()> {
        let _guard = self.write_locks.acquire(session_id).await;
        let mut state = self
            .ephemeral
            .load(session_id)
            .ok_or_else(|| Error::Precondition(format!("unknown session {session_id}")))?;
        state.dialogue.push(Message::assistant(turn, content, tokens));
        self.ephemeral.save(session_id, state);
        Ok(())
    }

    pub fn get_turn_log(&self, session_id: SessionId, turn: Turn) -> Option<TurnLog> {
        self.ephemeral
            .load(session_id)
            .and_then(|state| state.turn_logs.get(&turn).cloned())
    }

    /// Upsert a turn log. Fails with `Precondition` unless a USER+ASSISTANT
    /// pair for `turn` is already recorded (spec.md §4.A invariant).
    pub async fn put_turn_log(&self, session_id: SessionId, turn: Turn, log: TurnLog) -> Result<()> {
        let _guard = self.write_locks.acquire(session_id).await;
        let mut state = self
            .ephemeral
            .load(session_id)
            .ok_or_else(|| Error::Precondition(format!("unknown session {session_id}")))?;
        if !state.dialogue.turn_is_complete(turn) {
            return Err(Error::Precondition(format!(
                "turn {turn} has no USER+ASSISTANT pair recorded"
            )));
        }
        state.turn_logs.insert(turn, log.clone());
        self.ephemeral.save(session_id, state);
        self.durable
            .write_evaluation(session_id, EvaluationRecord::TurnEval { turn, log })
            .await?;
        Ok(())
    }

    pub fn list_turn_logs(
        &self,
        session_id: SessionId,
    ) -> std::collections::HashMap<Turn, TurnLog> {
        self.ephemeral
            .load(session_id)
            .map(|state| state.turn_logs)
            .unwrap_or_default()
    }

    pub async fn put_holistic(&self, session_id: SessionId, log: HolisticLog) -> Result<()> {
        let _guard = self.write_locks.acquire(session_id).await;
        let mut state = self
            .ephemeral
            .load(session_id)
            .ok_or_else(|| Error::Precondition(format!("unknown session {session_id}")))?;
        state.holistic = Some(log.clone());
        self.ephemeral.save(session_id, state);
        self.durable
            .write_evaluation(session_id, EvaluationRecord::HolisticFlow { log })
            .await?;
        Ok(())
    }

    pub async fn add_tokens(&self, session_id: SessionId, kind: TokenKind, triple: TokenTriple) -> Result<TokenCounters> {
        let _guard = self.write_locks.acquire(session_id).await;
        let mut state = self
            .ephemeral
            .load(session_id)
            .ok_or_else(|| Error::Precondition(format!("unknown session {session_id}")))?;
        match kind {
            TokenKind::Chat => state.tokens.add_chat(triple),
            TokenKind::Eval => state.tokens.add_eval(triple),
        }
        let tokens = state.tokens;
        self.ephemeral.save(session_id, state);
        Ok(tokens)
    }

    pub async fn mark_submitted(
        &self,
        submission_id: &str,
        session_id: SessionId,
        result: eval_domain::SubmissionResult,
    ) -> Result<()> {
        let _guard = self.write_locks.acquire(session_id).await;
        let mut state = self
            .ephemeral
            .load(session_id)
            .ok_or_else(|| Error::Precondition(format!("unknown session {session_id}")))?;
        state.lifecycle = eval_domain::SessionLifecycle::Submitted;
        self.ephemeral.save(session_id, state);
        self.durable
            .write_submission(submission_id, session_id, result)
            .await
    }

    /// Replace the dialogue prefix before `keep_from_turn` with a summary
    /// (spec.md §3 Dialogue Buffer / §4.I `summarize_memory`).
    pub async fn summarize_dialogue(&self, session_id: SessionId, keep_from_turn: Turn, summary: String) -> Result<()> {
        let _guard = self.write_locks.acquire(session_id).await;
        let mut state = self
            .ephemeral
            .load(session_id)
            .ok_or_else(|| Error::Precondition(format!("unknown session {session_id}")))?;
        state.dialogue.summarize_prefix(keep_from_turn, summary);
        self.ephemeral.save(session_id, state);
        Ok(())
    }

    pub fn problem(&self, session_id: SessionId) -> Option<ProblemContext> {
        self.ephemeral.load(session_id).and_then(|s| s.problem)
    }

    /// Messages in the prior N turns containing the given role, used by the
    /// guardrail's "confirming an edit" context check (spec.md §4.D).
    pub fn recent_messages(&self, session_id: SessionId, last_n_turns: Turn, role: Role) -> Vec<Message> {
        let Some(state) = self.ephemeral.load(session_id) else {
            return Vec::new();
        };
        let floor = state.current_turn.saturating_sub(last_n_turns);
        state
            .dialogue
            .messages
            .iter()
            .filter(|m| m.turn > floor && m.role == role)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::InMemoryDurableStore;
    use eval_domain::{Criterion, Grade, Intent, RubricEntry};

    fn binding(id: SessionId) -> SessionBinding {
        SessionBinding {
            session_id: id,
            exam_id: "exam-1".into(),
            participant_id: "p-1".into(),
            problem_id: "prob-1".into(),
            spec_id: "spec-1".into(),
            language: "python".into(),
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(3600), Arc::new(InMemoryDurableStore::new()))
    }

    fn turn_log(turn: Turn) -> TurnLog {
        TurnLog {
            turn,
            intent: Intent::HintOrQuery,
            intent_confidence: 0.9,
            rubrics: vec![RubricEntry {
                criterion: Criterion::Clarity,
                score: 80.0,
                reasoning: "clear".into(),
            }],
            weighted_score: 80.0,
            assistant_summary: "explained bitmasking".into(),
            guardrail_failed: false,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn put_turn_log_requires_completed_turn() {
        let store = store();
        store.load_or_create(binding(1)).await;
        let err = store.put_turn_log(1, 1, turn_log(1)).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn put_turn_log_succeeds_after_pair_recorded() {
        let store = store();
        store.load_or_create(binding(1)).await;
        store.begin_turn(1, "hi".into(), 3).await.unwrap();
        store.complete_turn(1, 1, "hello".into(), 4).await.unwrap();
        store.put_turn_log(1, 1, turn_log(1)).await.unwrap();
        assert_eq!(store.get_turn_log(1, 1).unwrap().weighted_score, 80.0);
    }

    #[tokio::test]
    async fn put_turn_log_is_idempotent_upsert() {
        let store = store();
        store.load_or_create(binding(1)).await;
        store.begin_turn(1, "hi".into(), 3).await.unwrap();
        store.complete_turn(1, 1, "hello".into(), 4).await.unwrap();
        store.put_turn_log(1, 1, turn_log(1)).await.unwrap();
        store.put_turn_log(1, 1, turn_log(1)).await.unwrap();
        assert_eq!(store.list_turn_logs(1).len(), 1);
    }

    #[tokio::test]
    async fn token_counters_accumulate() {
        let store = store();
        store.load_or_create(binding(1)).await;
        store
            .add_tokens(1, TokenKind::Chat, TokenTriple::new(10, 5))
            .await
            .unwrap();
        let totals = store
            .add_tokens(1, TokenKind::Chat, TokenTriple::new(2, 1))
            .await
            .unwrap();
        assert_eq!(totals.chat_tokens.total, 18);
    }

    #[tokio::test]
    async fn turns_missing_log_reports_gaps() {
        let store = store();
        store.load_or_create(binding(1)).await;
        for t in 1..=3u32 {
            store.begin_turn(1, format!("msg {t}"), 1).await.unwrap();
            store.complete_turn(1, t, format!("reply {t}"), 1).await.unwrap();
        }
        store.put_turn_log(1, 2, turn_log(2)).await.unwrap();
        let state = store.load(1).unwrap();
        assert_eq!(state.turns_missing_log(), vec![1]);
    }

    #[tokio::test]
    async fn mark_submitted_writes_submission_row() {
        let durable = Arc::new(InMemoryDurableStore::new());
        let store = SessionStore::new(Duration::from_secs(3600), durable.clone());
        store.load_or_create(binding(1)).await;
        let result = eval_domain::SubmissionResult {
            correctness_score: 100.0,
            performance_score: 50.0,
            prompt_score: 80.0,
            total_score: 82.5,
            grade: Grade::B,
            test_outcomes: vec![],
            measured_time_sec: Some(0.2),
            measured_memory_mb: Some(12.0),
            skip_reason: None,
        };
        store.mark_submitted("sub-1", 1, result).await.unwrap();
        assert!(durable.submission("sub-1").is_some());
    }
}
