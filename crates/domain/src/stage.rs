//! The closed stage alphabet, stage call bookkeeping, and result artifacts.

use serde::{Deserialize, Serialize};

/// Closed set of stage identifiers. A route plan is an ordered sequence
/// drawn from this alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageName {
    Rewrite,
    Intent,
    ContextRoute,
    Clarify,
    SqlGen,
    SqlExec,
    Rank,
    Eval,
    Format,
}

impl StageName {
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::Rewrite => "REWRITE",
            StageName::Intent => "INTENT",
            StageName::ContextRoute => "CONTEXT-ROUTE",
            StageName::Clarify => "CLARIFY",
            StageName::SqlGen => "SQL-GEN",
            StageName::SqlExec => "SQL-EXEC",
            StageName::Rank => "RANK",
            StageName::Eval => "EVAL",
            StageName::Format => "FORMAT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Ok,
    Timeout,
    StageError,
    Malformed,
}

/// Token usage as reported by a stage's `token_usage` block. Absence of the
/// block means the ledger records zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// One completed (or failed) stage invocation, as fed to the token ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCallRecord {
    pub stage: StageName,
    pub model: Option<String>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub elapsed_ms: u64,
    pub outcome: StageOutcome,
}

/// A result row produced by SQL-EXEC, opaque to the core beyond these
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub id: String,
    pub title: String,
    pub short_summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_form: Option<String>,
}

/// Presentation hint passed to FORMAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationStyle {
    Card,
    Brief,
    Detailed,
}

/// Ordered sequence of stages to invoke for one turn. Built per-turn, never
/// persisted.
pub type RoutePlan = Vec<StageName>;
