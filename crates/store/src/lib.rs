//! The Conversation Store: durable per-conversation state behind a
//! networked-KV-with-in-memory-fallback interface, plus per-conversation
//! write serialization.

pub mod backend;
pub mod lock;
pub mod memory;
pub mod metrics;
pub mod redis_backend;
pub mod store;

pub use backend::{ConversationBackend, UpdateMode};
pub use lock::ConversationLockMap;
pub use memory::InMemoryBackend;
pub use metrics::{StoreHealth, StoreMetrics};
pub use redis_backend::RedisBackend;
pub use store::ConversationStore;
