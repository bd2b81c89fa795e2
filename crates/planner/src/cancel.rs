//! Per-turn cancellation. Grounded in `runtime::cancel::CancelToken` (an
//! `Arc<AtomicBool>` with `cancel()`/`is_cancelled()`), dropped without the
//! teacher's parent/child cascade-group bookkeeping: CECI has no sub-agent
//! concept for a cancellation to cascade to, so a turn's token is registered
//! and removed by request id alone.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct CancelMap {
    tokens: Mutex<HashMap<Uuid, CancelToken>>,
}

impl CancelMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, request_id: Uuid) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(request_id, token.clone());
        token
    }

    /// Track a token that already exists (e.g. the one a spawned turn is
    /// actually watching) under `request_id`, rather than minting a fresh,
    /// disconnected one.
    pub fn insert(&self, request_id: Uuid, token: CancelToken) {
        self.tokens.lock().insert(request_id, token);
    }

    pub fn cancel(&self, request_id: Uuid) -> bool {
        match self.tokens.lock().get(&request_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, request_id: Uuid) {
        self.tokens.lock().remove(&request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_on_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn map_cancel_by_request_id() {
        let map = CancelMap::new();
        let id = Uuid::new_v4();
        let token = map.register(id);
        assert!(map.cancel(id));
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_unknown_id_returns_false() {
        let map = CancelMap::new();
        assert!(!map.cancel(Uuid::new_v4()));
    }

    #[test]
    fn insert_tracks_a_token_minted_elsewhere() {
        let map = CancelMap::new();
        let id = Uuid::new_v4();
        let token = CancelToken::new();
        map.insert(id, token.clone());
        assert!(map.cancel(id));
        assert!(token.is_cancelled());
    }

    #[test]
    fn remove_drops_token() {
        let map = CancelMap::new();
        let id = Uuid::new_v4();
        map.register(id);
        map.remove(id);
        assert!(!map.cancel(id));
    }
}
