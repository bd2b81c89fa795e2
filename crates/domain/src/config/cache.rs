use serde::{Deserialize, Serialize};

fn d_data_query_ttl() -> i64 {
    14_400
}
fn d_statistical_ttl() -> i64 {
    86_400
}
fn d_hard_cap() -> usize {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(default = "d_data_query_ttl")]
    pub data_query_ttl_seconds: i64,
    #[serde(default = "d_statistical_ttl")]
    pub statistical_ttl_seconds: i64,
    #[serde(default = "d_hard_cap")]
    pub hard_cap_entries: usize,
    /// Version tag mixed into every cache key; bump to invalidate the whole
    /// cache after a stage-contract change.
    pub pipeline_version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_query_ttl_seconds: d_data_query_ttl(),
            statistical_ttl_seconds: d_statistical_ttl(),
            hard_cap_entries: d_hard_cap(),
            pipeline_version: "v1".to_string(),
        }
    }
}
