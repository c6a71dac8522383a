use serde::{Deserialize, Serialize};

/// Durable session identifier (spec.md §3: "an integer `session_id`").
pub type SessionId = i64;

/// The ephemeral-store key format used everywhere a session is addressed
/// by its logical cache key (spec.md §9 open question: the source mixes a
/// raw id and a `"session_{id}"` string; this picks the latter and uses it
/// uniformly).
pub fn ephemeral_key(session_id: SessionId) -> String {
    format!("session_{session_id}")
}

/// Binding of a session to its exam, participant, problem, and language —
/// fixed at creation, never mutated by the core (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBinding {
    pub session_id: SessionId,
    pub exam_id: String,
    pub participant_id: String,
    pub problem_id: String,
    pub spec_id: String,
    pub language: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionLifecycle {
    Open,
    Submitted,
}
