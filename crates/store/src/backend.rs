use async_trait::async_trait;
use ceci_domain::conversation::{Conversation, EntityFrame, EntityKind, LastResultSet, Turn};
use ceci_domain::Result;

use crate::metrics::{StoreHealth, StoreMetrics};

/// How a call to [`ConversationBackend::update_entities`] merges its delta
/// into the stored entity frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateMode {
    /// Merge new keys in, keeping existing ones not present in the delta.
    Merge,
    /// A scope break: `kinds_reset` is cleared from the stored frame before
    /// the delta is merged in. `kinds_reset` is the full set the scope-break
    /// detector decided on, which may be broader than the delta's own keys.
    ReplaceScope { kinds_reset: Vec<EntityKind> },
}

/// Backing store for conversation state. Both the networked implementation
/// and the in-memory fallback implement this same contract, including TTL,
/// so the planner never branches on which is active.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    async fn load(&self, conv_id: &str) -> Result<Option<Conversation>>;

    /// Push `turn`, trim the FIFO to `max_turns`, and refresh the TTL — a
    /// single logical write.
    async fn append_turn(&self, conv_id: &str, turn: Turn, max_turns: usize) -> Result<()>;

    async fn update_entities(&self, conv_id: &str, delta: &EntityFrame, mode: UpdateMode)
        -> Result<()>;

    async fn set_last_result(&self, conv_id: &str, result: LastResultSet) -> Result<()>;

    async fn clear(&self, conv_id: &str) -> Result<()>;

    /// Set or clear the one-turn cache-bypass flag raised on entity-change
    /// invalidation.
    async fn set_cache_bypass(&self, conv_id: &str, bypass: bool) -> Result<()>;

    fn metrics(&self) -> StoreMetrics;

    async fn health(&self) -> StoreHealth;
}
