//! Per-conversation write serialization: one semaphore per conversation id,
//! created on first use. A second writer for the same conversation either
//! gets the lock within `busy_wait_ms` or fails with `conversation_busy`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ceci_domain::CeciError;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub struct ConversationLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for ConversationLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the write lock for `conv_id`, waiting up to `busy_wait_ms`
    /// before giving up with `conversation_busy`.
    pub async fn acquire(
        &self,
        conv_id: &str,
        busy_wait_ms: u64,
    ) -> Result<OwnedSemaphorePermit, CeciError> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(conv_id.to_string())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        if let Ok(permit) = sem.clone().try_acquire_owned() {
            return Ok(permit);
        }

        match tokio::time::timeout(Duration::from_millis(busy_wait_ms), sem.acquire_owned()).await
        {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_closed)) => Err(CeciError::ConversationBusy {
                conv_id: conv_id.to_string(),
            }),
            Err(_timed_out) => Err(CeciError::ConversationBusy {
                conv_id: conv_id.to_string(),
            }),
        }
    }

    pub fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop entries whose semaphore is not currently held, bounding memory
    /// growth across many distinct conversations.
    pub fn prune_idle(&self) {
        self.locks
            .lock()
            .retain(|_, sem| sem.available_permits() == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_access() {
        let map = ConversationLockMap::new();
        let permit = map.acquire("c1", 1_000).await.unwrap();
        drop(permit);
        let _permit2 = map.acquire("c1", 1_000).await.unwrap();
    }

    #[tokio::test]
    async fn different_conversations_concurrent() {
        let map = ConversationLockMap::new();
        let p1 = map.acquire("c1", 1_000).await.unwrap();
        let p2 = map.acquire("c2", 1_000).await.unwrap();
        drop(p1);
        drop(p2);
    }

    #[tokio::test]
    async fn busy_conversation_fails_after_wait_budget() {
        let map = Arc::new(ConversationLockMap::new());
        let _held = map.acquire("c1", 1_000).await.unwrap();

        let err = map.acquire("c1", 50).await.unwrap_err();
        assert!(matches!(err, CeciError::ConversationBusy { .. }));
    }

    #[tokio::test]
    async fn waiter_succeeds_once_released_within_budget() {
        let map = Arc::new(ConversationLockMap::new());
        let held = map.acquire("c1", 1_000).await.unwrap();

        let map2 = map.clone();
        let waiter = tokio::spawn(async move { map2.acquire("c1", 1_000).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        assert!(waiter.await.unwrap().is_ok());
    }

    #[test]
    fn prune_idle_drops_unheld_locks() {
        let map = ConversationLockMap::new();
        {
            let _rt = tokio::runtime::Runtime::new().unwrap();
        }
        map.locks
            .lock()
            .insert("ghost".to_string(), Arc::new(Semaphore::new(1)));
        assert_eq!(map.lock_count(), 1);
        map.prune_idle();
        assert_eq!(map.lock_count(), 0);
    }
}
