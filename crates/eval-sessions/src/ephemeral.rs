//! In-memory keyed store with TTL, grounded on `sa_sessions::store::SessionStore`'s
//! `RwLock<HashMap<...>>` shape but without the JSON-file persistence layer —
//! persistence on this side of the boundary is the durable backend's job.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use eval_domain::SessionId;
use parking_lot::RwLock;

use crate::state::SessionState;

struct Entry {
    state: SessionState,
    expires_at: Instant,
}

/// The ephemeral layer of the Session Store (spec.md §4.A).
pub struct EphemeralStore {
    ttl: Duration,
    sessions: RwLock<HashMap<SessionId, Entry>>,
}

impl EphemeralStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(&self, session_id: SessionId) -> Option<SessionState> {
        let sessions = self.sessions.read();
        let entry = sessions.get(&session_id)?;
        if entry.expires_at < Instant::now() {
            return None;
        }
        Some(entry.state.clone())
    }

    pub fn save(&self, session_id: SessionId, state: SessionState) {
        let mut sessions = self.sessions.write();
        sessions.insert(
            session_id,
            Entry {
                state,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn remove(&self, session_id: SessionId) {
        self.sessions.write().remove(&session_id);
    }

    /// Drop every entry past its TTL. Intended to run on a periodic tick;
    /// does not run implicitly on `load`/`save` beyond the per-entry check.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at >= now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eval_domain::SessionBinding;

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

    #[test]
    fn save_then_load_round_trips() {
        let store = EphemeralStore::new(Duration::from_secs(60));
        let state = SessionState::new(binding(1));
        store.save(1, state.clone());
        let loaded = store.load(1).unwrap();
        assert_eq!(loaded.binding.session_id, 1);
    }

    #[test]
    fn expired_entry_is_invisible() {
        let store = EphemeralStore::new(Duration::from_millis(1));
        store.save(1, SessionState::new(binding(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.load(1).is_none());
    }

    #[test]
    fn sweep_removes_expired_only() {
        let store = EphemeralStore::new(Duration::from_millis(50));
        store.save(1, SessionState::new(binding(1)));
        std::thread::sleep(Duration::from_millis(60));
        store.save(2, SessionState::new(binding(2)));
        // session 2 still fresh relative to its own save, session 1 stale.
        let removed = store.sweep_expired();
        assert_eq!(removed, 1);
        assert!(store.load(2).is_some());
    }
}
