//! Per-session cancellation tokens, grounded on
//! `sa_gateway::runtime::cancel::{CancelToken, CancelMap}` — trimmed of the
//! teacher's group/cascade fan-out (`add_to_group`/`remove_from_group`,
//! parent→child cancellation for sub-agent turns), which has no counterpart
//! here: a chat turn never spawns child turns in this domain. Used by the
//! WebSocket transport to let a client cancel an in-flight tutor-reply
//! stream for its own session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eval_domain::SessionId;
use parking_lot::Mutex;

#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks active cancellation tokens per session, one running turn at a
/// time per session (enforced upstream by `SessionLockMap`).
pub struct CancelMap {
    tokens: Mutex<HashMap<SessionId, CancelToken>>,
}

impl Default for CancelMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelMap {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, session_id: SessionId) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(session_id, token.clone());
        token
    }

    pub fn cancel(&self, session_id: SessionId) -> bool {
        if let Some(token) = self.tokens.lock().get(&session_id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    pub fn remove(&self, session_id: SessionId) {
        self.tokens.lock().remove(&session_id);
    }

    pub fn is_running(&self, session_id: SessionId) -> bool {
        self.tokens.lock().contains_key(&session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_lifecycle() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_map_register_and_cancel() {
        let map = CancelMap::new();
        let token = map.register(1);
        assert!(map.is_running(1));
        assert!(map.cancel(1));
        assert!(token.is_cancelled());
        map.remove(1);
        assert!(!map.is_running(1));
        assert!(!map.cancel(1));
    }

    #[test]
    fn cancel_nonexistent_session_returns_false() {
        let map = CancelMap::new();
        assert!(!map.cancel(99));
    }
}
