use serde::{Deserialize, Serialize};

fn d_max_turns() -> usize {
    20
}
fn d_ttl_seconds() -> i64 {
    7_200
}
fn d_busy_wait_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(default = "d_max_turns")]
    pub max_turns_per_conversation: usize,
    #[serde(default = "d_ttl_seconds")]
    pub conversation_ttl_seconds: i64,
    /// Networked KV backend base URL. Empty means: run in-memory only.
    pub backend_url: String,
    /// Bounded wait for the per-conversation write lock before failing with
    /// `conversation_busy`.
    #[serde(default = "d_busy_wait_ms")]
    pub busy_wait_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_turns_per_conversation: d_max_turns(),
            conversation_ttl_seconds: d_ttl_seconds(),
            backend_url: String::new(),
            busy_wait_ms: d_busy_wait_ms(),
        }
    }
}
