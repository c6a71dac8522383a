use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A participant turn number. Positive, monotonic per session, starting at 1.
pub type Turn = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Assistant,
}

/// A single message within a turn. Owned exclusively by the Session Store;
/// other components only ever receive a read-only view (clone).
///
/// `turn` and `role` are first-class fields, not positions inferred from a
/// vector index — this is what lets `submission_guard` locate the (user,
/// assistant) pair for a given turn without scanning by parity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub turn: Turn,
    pub role: Role,
    pub content: String,
    pub token_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(turn: Turn, content: impl Into<String>, token_count: u64) -> Self {
        Self {
            turn,
            role: Role::User,
            content: content.into(),
            token_count,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(turn: Turn, content: impl Into<String>, token_count: u64) -> Self {
        Self {
            turn,
            role: Role::Assistant,
            content: content.into(),
            token_count,
            created_at: Utc::now(),
        }
    }
}

/// Ordered sequence of messages for a session, with an optional advisory
/// summary replacing an older prefix (spec.md §3 "Memory Summary").
///
/// Summaries never alter turn numbering; downstream components treat
/// `(summary, tail)` as equivalent context to the full message list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueBuffer {
    pub messages: Vec<Message>,
    pub summary: Option<String>,
}

impl DialogueBuffer {
    /// Messages belonging to one turn, in (user, assistant) order.
    pub fn turn_messages(&self, turn: Turn) -> (Option<&Message>, Option<&Message>) {
        let user = self
            .messages
            .iter()
            .find(|m| m.turn == turn && m.role == Role::User);
        let assistant = self
            .messages
            .iter()
            .find(|m| m.turn == turn && m.role == Role::Assistant);
        (user, assistant)
    }

    /// Whether turn `t` has both a user and an assistant message recorded.
    pub fn turn_is_complete(&self, turn: Turn) -> bool {
        let (u, a) = self.turn_messages(turn);
        u.is_some() && a.is_some()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the prefix of messages before `keep_from_turn` with a summary.
    /// Advisory only — turn numbers of the retained tail are unchanged.
    pub fn summarize_prefix(&mut self, keep_from_turn: Turn, summary: String) {
        self.messages.retain(|m| m.turn >= keep_from_turn);
        self.summary = Some(summary);
    }
}
