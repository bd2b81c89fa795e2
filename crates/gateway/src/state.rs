use std::sync::Arc;
use std::time::Instant;

use ceci_cache::ResponseCache;
use ceci_dispatch::StageDispatcher;
use ceci_domain::config::Config;
use ceci_planner::{CancelMap, PlannerDeps};
use ceci_store::{ConversationLockMap, ConversationStore};

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services** — config, store, cache, dispatcher
/// - **Concurrency** — per-conversation write locks, per-turn cancellation
/// - **Security** — the API bearer-token hash
/// - **Diagnostics** — process start time, for `/health`'s uptime field
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub store: Arc<ConversationStore>,
    pub cache: Arc<ResponseCache>,
    pub dispatcher: Arc<StageDispatcher>,

    // ── Concurrency ──────────────────────────────────────────────────
    /// Serializes whole in-flight turns per conversation: a second-in-line
    /// writer waits up to `busy_wait_ms` or fails with `conversation_busy`.
    /// Distinct from the store's own internal lock, which only protects
    /// individual backend writes.
    pub conv_locks: Arc<ConversationLockMap>,
    pub cancel_map: Arc<CancelMap>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,

    // ── Diagnostics ──────────────────────────────────────────────────
    pub started_at: Instant,
}

impl AppState {
    /// Build the composition root the Pipeline Planner consumes for a turn.
    pub fn planner_deps(&self) -> PlannerDeps {
        PlannerDeps {
            config: self.config.clone(),
            store: self.store.clone(),
            cache: self.cache.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}
