//! The in-process Response Cache store: a keyed `RwLock<HashMap<...>>` with
//! `Instant`-based per-entry TTL and bounded eviction once the entry cap is
//! reached.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub formatted_answer: String,
    pub origin_metadata: serde_json::Value,
}

struct Slot {
    entry: CacheEntry,
    inserted_at: Instant,
    ttl: Duration,
}

/// The caller is solely responsible for deciding *when* to consult this
/// cache — this store never makes a cacheability decision itself.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, Slot>>,
    /// Insertion order, for cap eviction (oldest evicted first — no LRU
    /// bookkeeping, just a simple bounded cache).
    order: RwLock<Vec<String>>,
    hard_cap: usize,
}

impl ResponseCache {
    pub fn new(hard_cap: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            hard_cap,
        }
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read();
        let slot = entries.get(key)?;
        if slot.inserted_at.elapsed() >= slot.ttl {
            return None;
        }
        Some(slot.entry.clone())
    }

    pub fn put(&self, key: String, formatted_answer: String, origin_metadata: serde_json::Value, ttl: Duration) {
        let entry = CacheEntry {
            formatted_answer,
            origin_metadata,
        };
        let mut entries = self.entries.write();
        let mut order = self.order.write();

        if !entries.contains_key(&key) {
            order.push(key.clone());
        }
        entries.insert(
            key,
            Slot {
                entry,
                inserted_at: Instant::now(),
                ttl,
            },
        );

        while entries.len() > self.hard_cap {
            if order.is_empty() {
                break;
            }
            let oldest = order.remove(0);
            entries.remove(&oldest);
        }
    }

    /// Periodic sweep: drop entries past TTL that were never
    /// re-read. Lazy eviction on `get` already hides them from callers; this
    /// just bounds memory from keys nobody looks up again.
    pub fn sweep_expired(&self) {
        let mut entries = self.entries.write();
        let mut order = self.order.write();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, slot)| slot.inserted_at.elapsed() >= slot.ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for k in &expired {
            entries.remove(k);
        }
        order.retain(|k| !expired.contains(k));
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = ResponseCache::new(10);
        cache.put(
            "k1".to_string(),
            "answer".to_string(),
            serde_json::json!({}),
            Duration::from_secs(60),
        );
        let entry = cache.get("k1").unwrap();
        assert_eq!(entry.formatted_answer, "answer");
    }

    #[test]
    fn expired_entry_is_not_returned() {
        let cache = ResponseCache::new(10);
        cache.put(
            "k1".to_string(),
            "answer".to_string(),
            serde_json::json!({}),
            Duration::from_millis(1),
        );
        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.get("k1").is_none());
    }

    #[test]
    fn hard_cap_evicts_oldest_insertion() {
        let cache = ResponseCache::new(2);
        cache.put("a".into(), "1".into(), serde_json::json!({}), Duration::from_secs(60));
        cache.put("b".into(), "2".into(), serde_json::json!({}), Duration::from_secs(60));
        cache.put("c".into(), "3".into(), serde_json::json!({}), Duration::from_secs(60));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn sweep_expired_removes_stale_entries() {
        let cache = ResponseCache::new(10);
        cache.put("k1".into(), "v".into(), serde_json::json!({}), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));
        cache.sweep_expired();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn missing_key_is_none() {
        let cache = ResponseCache::new(10);
        assert!(cache.get("nope").is_none());
    }
}
