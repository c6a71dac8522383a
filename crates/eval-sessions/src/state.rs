//! The state the Session Store owns exclusively for an OPEN session
//! (spec.md §3 Ownership).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use eval_domain::{
    DialogueBuffer, HolisticLog, ProblemContext, SessionBinding, SessionLifecycle, TokenCounters,
    Turn, TurnLog,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub binding: SessionBinding,
    pub lifecycle: SessionLifecycle,
    /// Highest turn number assigned so far; 0 before any user input.
    pub current_turn: Turn,
    pub dialogue: DialogueBuffer,
    pub turn_logs: HashMap<Turn, TurnLog>,
    pub holistic: Option<HolisticLog>,
    pub tokens: TokenCounters,
    /// Attached lazily by `handle_request` the first time a session is
    /// touched (spec.md §4.I: "attaches problem context if missing").
    pub problem: Option<ProblemContext>,
}

impl SessionState {
    pub fn new(binding: SessionBinding) -> Self {
        Self {
            binding,
            lifecycle: SessionLifecycle::Open,
            current_turn: 0,
            dialogue: DialogueBuffer::default(),
            turn_logs: HashMap::new(),
            holistic: None,
            tokens: TokenCounters::default(),
            problem: None,
        }
    }

    /// Turn numbers with a completed (user, assistant) pair but no turn log
    /// yet — what `submission_guard` needs to close.
    pub fn turns_missing_log(&self) -> Vec<Turn> {
        (1..self.current_turn)
            .filter(|t| self.dialogue.turn_is_complete(*t) && !self.turn_logs.contains_key(t))
            .collect()
    }
}
