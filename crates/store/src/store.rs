use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ceci_domain::conversation::{Conversation, EntityFrame, LastResultSet, Turn};
use ceci_domain::Result;

use crate::backend::{ConversationBackend, UpdateMode};
use crate::lock::ConversationLockMap;
use crate::memory::InMemoryBackend;
use crate::metrics::{StoreHealth, StoreMetrics};

/// Public Conversation Store API. Wraps a primary backend (the
/// networked KV store, normally) with an always-available in-memory stub:
/// any primary-backend failure degrades the *current request* to the stub
/// rather than failing it, and sets `degraded` so the HTTP layer can surface
/// that in response metadata. The planner itself never branches on which
/// backend is active.
pub struct ConversationStore {
    primary: Arc<dyn ConversationBackend>,
    stub: InMemoryBackend,
    locks: ConversationLockMap,
    busy_wait_ms: u64,
    max_turns: usize,
    degraded: AtomicBool,
}

impl ConversationStore {
    pub fn new(primary: Arc<dyn ConversationBackend>, ttl_seconds: i64, busy_wait_ms: u64, max_turns: usize) -> Self {
        Self {
            primary,
            stub: InMemoryBackend::new(ttl_seconds),
            locks: ConversationLockMap::new(),
            busy_wait_ms,
            max_turns,
            degraded: AtomicBool::new(false),
        }
    }

    /// An in-memory-only store, useful for tests and for deployments with
    /// no networked backend configured.
    pub fn in_memory_only(ttl_seconds: i64, busy_wait_ms: u64, max_turns: usize) -> Self {
        Self::new(Arc::new(InMemoryBackend::new(ttl_seconds)), ttl_seconds, busy_wait_ms, max_turns)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    pub async fn load(&self, conv_id: &str) -> Option<Conversation> {
        match self.primary.load(conv_id).await {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(conv_id, error = %e, "conversation store degraded to in-memory stub");
                self.degraded.store(true, Ordering::Relaxed);
                self.stub.load(conv_id).await.unwrap_or(None)
            }
        }
    }

    async fn with_lock<F, Fut>(&self, conv_id: &str, f: F) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<()>>,
    {
        let _permit = self.locks.acquire(conv_id, self.busy_wait_ms).await?;
        f().await
    }

    pub async fn append_turn(&self, conv_id: &str, turn: Turn) -> Result<()> {
        self.with_lock(conv_id, || async {
            if self
                .primary
                .append_turn(conv_id, turn.clone(), self.max_turns)
                .await
                .is_err()
            {
                self.degraded.store(true, Ordering::Relaxed);
                return self.stub.append_turn(conv_id, turn, self.max_turns).await;
            }
            Ok(())
        })
        .await
    }

    pub async fn update_entities(
        &self,
        conv_id: &str,
        delta: &EntityFrame,
        mode: UpdateMode,
    ) -> Result<()> {
        self.with_lock(conv_id, || async {
            if self.primary.update_entities(conv_id, delta, mode).await.is_err() {
                self.degraded.store(true, Ordering::Relaxed);
                return self.stub.update_entities(conv_id, delta, mode).await;
            }
            Ok(())
        })
        .await
    }

    pub async fn set_last_result(&self, conv_id: &str, result: LastResultSet) -> Result<()> {
        self.with_lock(conv_id, || async {
            if self
                .primary
                .set_last_result(conv_id, result.clone())
                .await
                .is_err()
            {
                self.degraded.store(true, Ordering::Relaxed);
                return self.stub.set_last_result(conv_id, result).await;
            }
            Ok(())
        })
        .await
    }

    pub async fn clear(&self, conv_id: &str) -> Result<()> {
        self.with_lock(conv_id, || async {
            let _ = self.primary.clear(conv_id).await;
            self.stub.clear(conv_id).await
        })
        .await
    }

    pub async fn set_cache_bypass(&self, conv_id: &str, bypass: bool) -> Result<()> {
        let _ = self.primary.set_cache_bypass(conv_id, bypass).await;
        self.stub.set_cache_bypass(conv_id, bypass).await
    }

    pub fn metrics(&self) -> StoreMetrics {
        self.primary.metrics()
    }

    pub async fn health(&self) -> StoreHealth {
        self.primary.health().await
    }

    pub fn prune_idle_locks(&self) {
        self.locks.prune_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceci_domain::conversation::Speaker;
    use chrono::Utc;
    use uuid::Uuid;

    fn turn(text: &str) -> Turn {
        Turn {
            turn_id: Uuid::new_v4(),
            speaker: Speaker::User,
            clean_text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn round_trips_through_in_memory_store() {
        let store = ConversationStore::in_memory_only(7_200, 5_000, 20);
        store.append_turn("c1", turn("hello")).await.unwrap();
        let conv = store.load("c1").await.unwrap();
        assert_eq!(conv.turns.len(), 1);
        assert!(!store.is_degraded());
    }

    #[tokio::test]
    async fn clear_removes_conversation() {
        let store = ConversationStore::in_memory_only(7_200, 5_000, 20);
        store.append_turn("c1", turn("hello")).await.unwrap();
        store.clear("c1").await.unwrap();
        assert!(store.load("c1").await.is_none());
    }
}
