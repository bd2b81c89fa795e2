use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn d_timeout_ms() -> u64 {
    8_000
}
fn d_max_retries() -> u32 {
    2
}
fn d_retry_backoff_ms() -> u64 {
    200
}
fn d_backoff_ceiling_ms() -> u64 {
    5_000
}
fn d_total_deadline_ms() -> u64 {
    30_000
}
fn d_eval_deadline_ms() -> u64 {
    120_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageEndpointConfig {
    pub endpoint: String,
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    #[serde(default = "d_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for StageEndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_ms: d_timeout_ms(),
            max_retries: d_max_retries(),
            retry_backoff_ms: d_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Keyed by `StageName::as_str()` (e.g. "REWRITE", "SQL-GEN").
    pub stages: HashMap<String, StageEndpointConfig>,
    #[serde(default = "d_backoff_ceiling_ms")]
    pub backoff_ceiling_ms: u64,
    #[serde(default = "d_total_deadline_ms")]
    pub total_request_deadline_ms: u64,
    /// Applied instead of `total_request_deadline_ms` when the route
    /// includes EVAL.
    #[serde(default = "d_eval_deadline_ms")]
    pub eval_route_deadline_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            stages: HashMap::new(),
            backoff_ceiling_ms: d_backoff_ceiling_ms(),
            total_request_deadline_ms: d_total_deadline_ms(),
            eval_route_deadline_ms: d_eval_deadline_ms(),
        }
    }
}
