pub mod auth;
pub mod chat;
pub mod health;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the API router — three routes, one flat surface, no public/
/// protected split (a bot-chain turn has no lower-trust introspection
/// surface for a split to separate).
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat::chat_stream))
        .route("/chat/sync", post(chat::chat_sync))
        .route("/health", get(health::health))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
