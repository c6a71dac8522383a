//! Per-session request concurrency control, grounded on
//! `sa_gateway::runtime::session_lock::SessionLockMap`'s semaphore-per-key
//! pattern. This is distinct from `eval_sessions::SessionWriteLockMap`: that
//! one serializes individual store writes; this one serializes whole
//! `handle_request` → ... → response chains for the same session, so a
//! second concurrent chat turn waits behind the first rather than racing it
//! through the orchestrator.

use std::collections::HashMap;
use std::sync::Arc;

use eval_domain::SessionId;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct SessionLockMap {
    locks: Mutex<HashMap<SessionId, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the run lock for a session, waiting if another request for
    /// the same session is in flight. The permit releases on drop.
    pub async fn acquire(&self, session_id: SessionId) -> OwnedSemaphorePermit {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(session_id)
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };
        sem.acquire_owned().await.expect("session semaphore is never closed")
    }

    pub fn session_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop tracking entries for sessions with no request currently holding
    /// or waiting on their permit.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn sequential_access() {
        let map = SessionLockMap::new();
        let permit1 = map.acquire(1).await;
        drop(permit1);
        let permit2 = map.acquire(1).await;
        drop(permit2);
    }

    #[tokio::test]
    async fn different_sessions_do_not_block() {
        let map = Arc::new(SessionLockMap::new());
        let p1 = map.acquire(1).await;
        let p2 = map.acquire(2).await;
        assert_eq!(map.session_count(), 2);
        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn same_session_waits() {
        let map = Arc::new(SessionLockMap::new());
        let map2 = map.clone();
        let p1 = map.acquire(1).await;

        let handle = tokio::spawn(async move {
            let _p2 = map2.acquire(1).await;
            42
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(p1);

        assert_eq!(handle.await.unwrap(), 42);
    }
}
