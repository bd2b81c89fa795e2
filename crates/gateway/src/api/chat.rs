//! Chat API endpoints — the primary interface for running bot-chain turns.
//!
//! - `POST /chat`      — SSE streaming: progress events + one final answer
//! - `POST /chat/sync` — non-streaming: drains the stream, returns one JSON

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use futures_util::stream::Stream;
use serde::Deserialize;
use uuid::Uuid;

use ceci_planner::{run_turn, CancelMap, PlannerEvent, TurnInput};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub conv_id: String,
    pub message: String,
    #[serde(default)]
    pub include_metadata: bool,
}

/// Ties a turn's `cancel_map` entry to the handler's own future/stream.
/// Dropped on a normal finish (via [`Self::finish`]) it just removes the
/// entry; dropped before that — the client went away mid-turn — it signals
/// the spawned turn to stop before removing the entry, so a closed
/// connection actually cancels the in-flight work instead of leaking it.
struct CancelGuard {
    cancel_map: Arc<CancelMap>,
    request_id: Uuid,
    completed: bool,
}

impl CancelGuard {
    fn new(cancel_map: Arc<CancelMap>, request_id: Uuid) -> Self {
        Self { cancel_map, request_id, completed: false }
    }

    fn finish(&mut self) {
        self.completed = true;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.completed {
            self.cancel_map.cancel(self.request_id);
        }
        self.cancel_map.remove(self.request_id);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /chat/sync (non-streaming)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat_sync(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> impl IntoResponse {
    let busy_wait_ms = state.config.store.busy_wait_ms;
    let permit = match state.conv_locks.acquire(&body.conv_id, busy_wait_ms).await {
        Ok(p) => p,
        Err(e) => {
            return (
                axum::http::StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({ "error": e.kind(), "message": e.hebrew_apology() })),
            )
                .into_response();
        }
    };

    let input = TurnInput {
        conv_id: body.conv_id.clone(),
        message: body.message,
        include_metadata: body.include_metadata,
    };

    let (request_id, cancel, mut rx) = run_turn(state.planner_deps(), input);
    state.cancel_map.insert(request_id, cancel);
    let mut cancel_guard = CancelGuard::new(state.cancel_map.clone(), request_id);

    let mut response = String::new();
    let mut metadata = None;
    let mut progress = Vec::new();

    while let Some(event) = rx.recv().await {
        match event.kind {
            ceci_planner::EventKind::Progress => {
                if let Some(message) = event.message {
                    progress.push(message);
                }
            }
            ceci_planner::EventKind::Final => {
                response = event.response.unwrap_or_default();
                metadata = event.metadata;
            }
        }
    }

    cancel_guard.finish();
    drop(permit);

    Json(serde_json::json!({
        "conv_id": body.conv_id,
        "response": response,
        "progress": progress,
        "metadata": metadata,
    }))
    .into_response()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /chat (SSE)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat_stream(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> impl IntoResponse {
    let busy_wait_ms = state.config.store.busy_wait_ms;
    let permit = match state.conv_locks.acquire(&body.conv_id, busy_wait_ms).await {
        Ok(p) => p,
        Err(e) => {
            let message = e.hebrew_apology();
            let stream = futures_util::stream::once(async move {
                Ok::<_, std::convert::Infallible>(
                    Event::default()
                        .event("error")
                        .data(serde_json::json!({ "error": "conversation_busy", "message": message }).to_string()),
                )
            });
            return Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response();
        }
    };

    let input = TurnInput {
        conv_id: body.conv_id,
        message: body.message,
        include_metadata: body.include_metadata,
    };

    let (request_id, cancel, rx) = run_turn(state.planner_deps(), input);
    state.cancel_map.insert(request_id, cancel);
    let cancel_guard = CancelGuard::new(state.cancel_map.clone(), request_id);

    let stream = make_sse_stream(rx, permit, cancel_guard);

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn make_sse_stream(
    mut rx: tokio::sync::mpsc::Receiver<PlannerEvent>,
    _permit: tokio::sync::OwnedSemaphorePermit,
    mut cancel_guard: CancelGuard,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            let event_type = match event.kind {
                ceci_planner::EventKind::Progress => "progress",
                ceci_planner::EventKind::Final => "final",
            };
            let data = serde_json::to_string(&event).unwrap_or_default();
            yield Ok(Event::default().event(event_type).data(data));
        }
        cancel_guard.finish();
        // _permit and cancel_guard are dropped here, releasing the
        // conversation lock and the cancel map entry for the next in-line
        // writer. If the client drops the connection before the stream runs
        // to completion, this block never executes and the guard's `Drop`
        // cancels the in-flight turn instead.
    }
}
