//! In-memory fallback backend, used when the networked KV store is
//! unavailable or simply not configured. Implements the exact same
//! contract (including TTL) as the networked backend.

use std::collections::HashMap;

use async_trait::async_trait;
use ceci_domain::conversation::{Conversation, EntityFrame, LastResultSet, Turn};
use ceci_domain::Result;
use chrono::Utc;
use parking_lot::RwLock;

use crate::backend::{ConversationBackend, UpdateMode};
use crate::metrics::{StoreHealth, StoreMetrics, StoreMetricsCounters};

pub struct InMemoryBackend {
    conversations: RwLock<HashMap<String, Conversation>>,
    ttl_seconds: i64,
    metrics: StoreMetricsCounters,
}

impl InMemoryBackend {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            ttl_seconds,
            metrics: StoreMetricsCounters::default(),
        }
    }

    fn is_expired(&self, conv: &Conversation) -> bool {
        let elapsed = Utc::now().signed_duration_since(conv.last_touch).num_seconds();
        elapsed >= self.ttl_seconds
    }
}

#[async_trait]
impl ConversationBackend for InMemoryBackend {
    async fn load(&self, conv_id: &str) -> Result<Option<Conversation>> {
        self.metrics.record_read();
        let mut map = self.conversations.write();
        match map.get(conv_id) {
            Some(conv) if self.is_expired(conv) => {
                map.remove(conv_id);
                self.metrics.record_cache_miss();
                Ok(None)
            }
            Some(conv) => {
                let mut conv = conv.clone();
                conv.last_touch = Utc::now();
                let out = conv.clone();
                map.insert(conv_id.to_string(), conv);
                Ok(Some(out))
            }
            None => {
                self.metrics.record_cache_miss();
                Ok(None)
            }
        }
    }

    async fn append_turn(&self, conv_id: &str, turn: Turn, max_turns: usize) -> Result<()> {
        self.metrics.record_write();
        let mut map = self.conversations.write();
        let conv = map
            .entry(conv_id.to_string())
            .or_insert_with(|| Conversation::new(conv_id, Utc::now()));
        conv.push_turn(turn, max_turns);
        conv.last_touch = Utc::now();
        Ok(())
    }

    async fn update_entities(
        &self,
        conv_id: &str,
        delta: &EntityFrame,
        mode: UpdateMode,
    ) -> Result<()> {
        self.metrics.record_write();
        let mut map = self.conversations.write();
        let conv = map
            .entry(conv_id.to_string())
            .or_insert_with(|| Conversation::new(conv_id, Utc::now()));
        match mode {
            UpdateMode::Merge => conv.entity_frame.merge(delta),
            UpdateMode::ReplaceScope { kinds_reset } => {
                for kind in &kinds_reset {
                    conv.entity_frame.remove(*kind);
                }
                conv.entity_frame.merge(delta);
            }
        }
        conv.last_touch = Utc::now();
        Ok(())
    }

    async fn set_last_result(&self, conv_id: &str, result: LastResultSet) -> Result<()> {
        self.metrics.record_write();
        let mut map = self.conversations.write();
        let conv = map
            .entry(conv_id.to_string())
            .or_insert_with(|| Conversation::new(conv_id, Utc::now()));
        conv.last_result = Some(result);
        conv.last_touch = Utc::now();
        Ok(())
    }

    async fn clear(&self, conv_id: &str) -> Result<()> {
        self.metrics.record_write();
        self.conversations.write().remove(conv_id);
        Ok(())
    }

    async fn set_cache_bypass(&self, conv_id: &str, bypass: bool) -> Result<()> {
        self.metrics.record_write();
        if let Some(conv) = self.conversations.write().get_mut(conv_id) {
            conv.cache_bypass = bypass;
        }
        Ok(())
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }

    async fn health(&self) -> StoreHealth {
        StoreHealth {
            status: "ok",
            backend_connected: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceci_domain::conversation::Speaker;
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
    async fn append_turn_creates_and_trims_fifo() {
        let backend = InMemoryBackend::new(7_200);
        for i in 0..25 {
            backend
                .append_turn("c1", turn(&format!("msg {i}")), 20)
                .await
                .unwrap();
        }
        let conv = backend.load("c1").await.unwrap().unwrap();
        assert_eq!(conv.turns.len(), 20);
        assert_eq!(conv.turns.front().unwrap().clean_text, "msg 5");
    }

    #[tokio::test]
    async fn load_missing_conversation_is_none() {
        let backend = InMemoryBackend::new(7_200);
        assert!(backend.load("ghost").await.unwrap().is_none());
        assert_eq!(backend.metrics().cache_misses, 1);
    }

    #[tokio::test]
    async fn expired_conversation_is_evicted_on_load() {
        let backend = InMemoryBackend::new(1);
        backend.append_turn("c1", turn("hi"), 20).await.unwrap();
        {
            let mut map = backend.conversations.write();
            let conv = map.get_mut("c1").unwrap();
            conv.last_touch = Utc::now() - chrono::Duration::seconds(10);
        }
        assert!(backend.load("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_entities_replace_scope_drops_old_kinds() {
        use ceci_domain::conversation::{EntityKind, EntityValue};

        let backend = InMemoryBackend::new(7_200);
        let mut delta = EntityFrame::default();
        delta.set(EntityKind::Topic, EntityValue::Text("education".into()));
        backend
            .update_entities("c1", &delta, UpdateMode::Merge)
            .await
            .unwrap();

        let mut delta2 = EntityFrame::default();
        delta2.set(EntityKind::DecisionNumber, EntityValue::Number(42));
        backend
            .update_entities(
                "c1",
                &delta2,
                UpdateMode::ReplaceScope {
                    kinds_reset: vec![EntityKind::Topic, EntityKind::DecisionNumber],
                },
            )
            .await
            .unwrap();

        let conv = backend.load("c1").await.unwrap().unwrap();
        assert_eq!(conv.entity_frame.decision_number(), Some(42));
        // Topic was in kinds_reset but absent from the delta — it must still
        // be cleared, not just whatever the delta happens to mention.
        assert!(conv.entity_frame.get(EntityKind::Topic).is_none());
    }

    #[tokio::test]
    async fn clear_removes_conversation() {
        let backend = InMemoryBackend::new(7_200);
        backend.append_turn("c1", turn("hi"), 20).await.unwrap();
        backend.clear("c1").await.unwrap();
        assert!(backend.load("c1").await.unwrap().is_none());
    }
}
