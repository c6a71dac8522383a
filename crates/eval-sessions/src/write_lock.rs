//! Per-session write serialization.
//!
//! Grounded on `sa_gateway::runtime::session_lock::SessionLockMap`'s
//! semaphore-per-key pattern, but this one never rejects a waiter — spec.md
//! §5 requires *serialization*, not a "session busy" error, between a
//! background turn-evaluation write and a concurrent chat-turn write.

use std::collections::HashMap;
use std::sync::Arc;

use eval_domain::SessionId;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct SessionWriteLockMap {
    locks: SyncMutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionWriteLockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the write lock for a session, waiting if another writer
    /// (background evaluation or chat turn) currently holds it. The guard
    /// releases the lock on drop — never hold it across another suspension
    /// point than the store write it protects.
    pub async fn acquire(&self, session_id: SessionId) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock();
            locks
                .entry(session_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }

    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_session_serializes() {
        let map = Arc::new(SessionWriteLockMap::new());
        let order = Arc::new(SyncMutex::new(Vec::new()));

        let map2 = map.clone();
        let order2 = order.clone();
        let first = tokio::spawn(async move {
            let _guard = map2.acquire(1).await;
            tokio::time::sleep(Duration::from_millis(30)).await;
            order2.lock().push(1);
        });

        tokio::time::sleep(Duration::from_millis(5)).await;

        let map3 = map.clone();
        let order3 = order.clone();
        let second = tokio::spawn(async move {
            let _guard = map3.acquire(1).await;
            order3.lock().push(2);
        });

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn different_sessions_do_not_block() {
        let map = SessionWriteLockMap::new();
        let g1 = map.acquire(1).await;
        let g2 = map.acquire(2).await;
        drop(g1);
        drop(g2);
    }
}
