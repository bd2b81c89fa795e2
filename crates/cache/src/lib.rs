//! The Response Cache: a content-addressed memo of safe-to-cache
//! query→answer mappings, with entity-aware keys.

pub mod key;
pub mod predicate;
pub mod store;

pub use key::{build_cache_key, normalize_text};
pub use predicate::{is_cacheable, CacheabilityInputs};
pub use store::{CacheEntry, ResponseCache};
