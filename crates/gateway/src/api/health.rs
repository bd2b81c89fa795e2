//! `GET /health` — lightweight liveness/readiness probe.

use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let degraded = state.store.is_degraded();
    Json(serde_json::json!({
        "status": if degraded { "degraded" } else { "ok" },
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "degraded": degraded,
    }))
}
