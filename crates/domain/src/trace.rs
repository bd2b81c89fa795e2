use serde::Serialize;

/// Structured trace events emitted across the CECI core crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    StageCallCompleted {
        stage: String,
        outcome: String,
        elapsed_ms: u64,
    },
    ConversationLoaded {
        conv_id: String,
        is_new: bool,
        turn_count: usize,
    },
    ConversationBusy {
        conv_id: String,
        waited_ms: u64,
    },
    CacheHit {
        key: String,
        intent: String,
    },
    CacheBypassed {
        conv_id: String,
        reason: String,
    },
    ScopeBreak {
        conv_id: String,
        kinds_reset: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ceci_event");
    }
}
