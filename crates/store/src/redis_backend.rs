//! Networked KV backend: Redis-backed conversation storage keyed
//! `{prefix}:{conv_id}:history`, refreshing TTL on every read as well as
//! every write. Each conversation is stored as one JSON blob (`{turns,
//! entity_frame, last_result, created, last_touch}`) rather than a native
//! Redis list, so writes are read-modify-write rather than a pipelined
//! `RPUSH`/`LTRIM` — the per-conversation lock in `ceci-store::lock` is
//! what keeps that safe under concurrency.

use async_trait::async_trait;
use ceci_domain::conversation::{Conversation, EntityFrame, LastResultSet, Turn};
use ceci_domain::{CeciError, Result};
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::backend::{ConversationBackend, UpdateMode};
use crate::metrics::{StoreHealth, StoreMetrics, StoreMetricsCounters};

pub struct RedisBackend {
    conn: ConnectionManager,
    key_prefix: String,
    ttl_seconds: i64,
    metrics: StoreMetricsCounters,
}

impl RedisBackend {
    pub async fn connect(redis_url: &str, key_prefix: String, ttl_seconds: i64) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CeciError::StoreUnavailable(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CeciError::StoreUnavailable(e.to_string()))?;
        Ok(Self {
            conn,
            key_prefix,
            ttl_seconds,
            metrics: StoreMetricsCounters::default(),
        })
    }

    fn key(&self, conv_id: &str) -> String {
        format!("{}:{}:history", self.key_prefix, conv_id)
    }

    async fn read_blob(&self, conv_id: &str) -> Result<Option<Conversation>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn
            .get(self.key(conv_id))
            .await
            .map_err(|e| CeciError::StoreUnavailable(e.to_string()))?;
        match raw {
            None => Ok(None),
            Some(s) => serde_json::from_str(&s)
                .map(Some)
                .map_err(|e| CeciError::StageMalformed {
                    stage: "conversation-store".to_string(),
                    detail: e.to_string(),
                }),
        }
    }

    async fn write_blob(&self, conv_id: &str, conv: &Conversation) -> Result<()> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(conv)?;
        let _: () = conn
            .set_ex(self.key(conv_id), json, self.ttl_seconds.max(1) as u64)
            .await
            .map_err(|e| CeciError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ConversationBackend for RedisBackend {
    async fn load(&self, conv_id: &str) -> Result<Option<Conversation>> {
        self.metrics.record_read();
        match self.read_blob(conv_id).await {
            Ok(Some(mut conv)) => {
                conv.last_touch = Utc::now();
                // Refresh TTL on read, matching the Python original's
                // `fetch()` which re-issues EXPIRE after every read.
                if self.write_blob(conv_id, &conv).await.is_err() {
                    self.metrics.record_error();
                }
                Ok(Some(conv))
            }
            Ok(None) => {
                self.metrics.record_cache_miss();
                Ok(None)
            }
            Err(e) => {
                self.metrics.record_error();
                Err(e)
            }
        }
    }

    async fn append_turn(&self, conv_id: &str, turn: Turn, max_turns: usize) -> Result<()> {
        self.metrics.record_write();
        let mut conv = self
            .read_blob(conv_id)
            .await?
            .unwrap_or_else(|| Conversation::new(conv_id, Utc::now()));
        conv.push_turn(turn, max_turns);
        conv.last_touch = Utc::now();
        self.write_blob(conv_id, &conv).await
    }

    async fn update_entities(
        &self,
        conv_id: &str,
        delta: &EntityFrame,
        mode: UpdateMode,
    ) -> Result<()> {
        self.metrics.record_write();
        let mut conv = self
            .read_blob(conv_id)
            .await?
            .unwrap_or_else(|| Conversation::new(conv_id, Utc::now()));
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
        self.write_blob(conv_id, &conv).await
    }

    async fn set_last_result(&self, conv_id: &str, result: LastResultSet) -> Result<()> {
        self.metrics.record_write();
        let mut conv = self
            .read_blob(conv_id)
            .await?
            .unwrap_or_else(|| Conversation::new(conv_id, Utc::now()));
        conv.last_result = Some(result);
        conv.last_touch = Utc::now();
        self.write_blob(conv_id, &conv).await
    }

    async fn clear(&self, conv_id: &str) -> Result<()> {
        self.metrics.record_write();
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(self.key(conv_id))
            .await
            .map_err(|e| CeciError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn set_cache_bypass(&self, conv_id: &str, bypass: bool) -> Result<()> {
        self.metrics.record_write();
        if let Some(mut conv) = self.read_blob(conv_id).await? {
            conv.cache_bypass = bypass;
            self.write_blob(conv_id, &conv).await?;
        }
        Ok(())
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }

    async fn health(&self) -> StoreHealth {
        let mut conn = self.conn.clone();
        let ok: bool = redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|r| r == "PONG")
            .unwrap_or(false);
        StoreHealth {
            status: if ok { "ok" } else { "error" },
            backend_connected: ok,
        }
    }
}
