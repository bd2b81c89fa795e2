//! The SSE/aggregated-JSON event shape streamed back to the HTTP front
//!: `{kind, final, ...}`, intermediate `progress` hints and one
//! terminal `final` event carrying the formatted answer plus metadata.

use ceci_ledger::LedgerSnapshot;
use serde::Serialize;

use ceci_domain::intent::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Progress,
    Final,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalMetadata {
    pub intent: Intent,
    pub confidence: f32,
    pub processing_time_ms: u64,
    pub service: &'static str,
    pub token_usage: LedgerSnapshot,
    /// Set when the conversation store fell back to its in-memory stub for
    /// this request.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannerEvent {
    pub kind: EventKind,
    pub r#final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FinalMetadata>,
}

impl PlannerEvent {
    pub fn progress(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Progress,
            r#final: false,
            message: Some(message.into()),
            response: None,
            metadata: None,
        }
    }

    pub fn final_answer(response: impl Into<String>, metadata: FinalMetadata) -> Self {
        Self {
            kind: EventKind::Final,
            r#final: true,
            message: None,
            response: Some(response.into()),
            metadata: Some(metadata),
        }
    }
}
