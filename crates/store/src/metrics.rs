use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Observable counters for the conversation store.
#[derive(Default)]
pub struct StoreMetricsCounters {
    pub reads: AtomicU64,
    pub writes: AtomicU64,
    pub cache_misses: AtomicU64,
    pub errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StoreMetrics {
    pub reads_total: u64,
    pub writes_total: u64,
    pub cache_misses: u64,
    pub errors_total: u64,
}

impl StoreMetricsCounters {
    pub fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            reads_total: self.reads.load(Ordering::Relaxed),
            writes_total: self.writes.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            errors_total: self.errors.load(Ordering::Relaxed),
        }
    }

    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreHealth {
    pub status: &'static str,
    pub backend_connected: bool,
}
