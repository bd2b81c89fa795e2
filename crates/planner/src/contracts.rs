//! Request/response shapes for the nine stage RPC contracts.
//! The dispatcher's `Envelope<T>` strips `token_usage` before these types
//! ever see it, so none of them carry that field themselves.

use serde::{Deserialize, Serialize};

use ceci_domain::conversation::EntityFrame;
use ceci_domain::intent::{Intent, RouteFlags};
use ceci_domain::stage::{PresentationStyle, ResultArtifact};

#[derive(Debug, Serialize)]
pub struct RewriteRequest<'a> {
    pub text: &'a str,
    pub conv_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct RewriteResponse {
    pub clean_text: String,
    #[serde(default)]
    pub corrections: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IntentRequest<'a> {
    pub clean_text: &'a str,
    pub conv_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_digest: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IntentResponse {
    pub intent: Intent,
    pub confidence: f32,
    #[serde(default)]
    pub entities: EntityFrame,
    #[serde(default)]
    pub route_flags: RouteFlags,
}

#[derive(Debug, Serialize)]
pub struct SqlGenRequest<'a> {
    pub intent: Intent,
    pub entities: &'a EntityFrame,
    pub conv_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SqlGenResponse {
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Value,
    pub query_type: String,
}

#[derive(Debug, Serialize)]
pub struct SqlExecRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<&'a str>,
    pub parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SqlExecResponse {
    pub rows: Vec<ResultArtifact>,
    pub total_count: u64,
}

#[derive(Debug, Serialize)]
pub struct RankRequest<'a> {
    pub artifacts: &'a [ResultArtifact],
    pub original_query: &'a str,
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct RankResponse {
    pub ranked: Vec<ResultArtifact>,
}

#[derive(Debug, Serialize)]
pub struct EvalRequest<'a> {
    pub artifact_id: &'a str,
    pub original_query: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EvalResponse {
    pub score: f32,
    pub relevance_level: String,
    pub explanation: String,
    #[serde(default)]
    pub criteria_breakdown: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ClarifyRequest<'a> {
    pub known_entities: &'a EntityFrame,
    pub missing_slots: &'a [String],
    pub conv_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ClarifyResponse {
    pub question: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatDataType {
    RankedRows,
    Count,
    Analysis,
    Empty,
}

#[derive(Debug, Serialize)]
pub struct FormatRequest<'a> {
    pub data_type: FormatDataType,
    pub content: serde_json::Value,
    pub original_query: &'a str,
    pub presentation_style: PresentationStyle,
    pub conv_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct FormatResponse {
    pub formatted_response: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}
