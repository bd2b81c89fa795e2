//! Shared error taxonomy for the CECI bot-chain core.
//!
//! Every failure surfaced to the planner is converted into one of these
//! kinds before it crosses a component boundary — the planner never
//! propagates an unclassified error to the HTTP layer.

/// Error kind taxonomy, used to pick the user-facing apology template and
/// the HTTP status without matching on the full error payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransientUpstream,
    StageMalformed,
    StageRefused,
    ConversationBusy,
    DeadlineExceeded,
    StoreUnavailable,
}

#[derive(thiserror::Error, Debug)]
pub enum CeciError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stage {stage} unreachable: {message}")]
    TransientUpstream { stage: String, message: String },

    #[error("stage {stage} returned a malformed response: {detail}")]
    StageMalformed { stage: String, detail: String },

    #[error("stage {stage} refused the request: status {status}")]
    StageRefused { stage: String, status: u16 },

    #[error("conversation {conv_id} is busy")]
    ConversationBusy { conv_id: String },

    #[error("request deadline exceeded after {elapsed_ms}ms")]
    DeadlineExceeded { elapsed_ms: u64 },

    #[error("conversation store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl CeciError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TransientUpstream { .. } => ErrorKind::TransientUpstream,
            Self::StageMalformed { .. } => ErrorKind::StageMalformed,
            Self::StageRefused { .. } => ErrorKind::StageRefused,
            Self::ConversationBusy { .. } => ErrorKind::ConversationBusy,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Self::Io(_) | Self::Json(_) | Self::Config(_) | Self::Other(_) => {
                ErrorKind::StageMalformed
            }
        }
    }

    /// Hebrew apology text shown to the user when a turn ends in failure.
    /// Kept centralized so every caller formats errors the same way.
    pub fn hebrew_apology(&self) -> &'static str {
        match self.kind() {
            ErrorKind::TransientUpstream => {
                "מצטערים, הייתה תקלה זמנית בעיבוד הבקשה. נסו שוב בעוד רגע."
            }
            ErrorKind::StageMalformed => "מצטערים, לא הצלחנו לעבד את הבקשה כעת.",
            ErrorKind::StageRefused => "מצטערים, לא ניתן לעבד את הבקשה הזו.",
            ErrorKind::ConversationBusy => "השיחה הזו עדיין מעבדת הודעה קודמת, נסו שוב בעוד רגע.",
            ErrorKind::DeadlineExceeded => "מצטערים, עיבוד הבקשה ארך זמן רב מדי.",
            ErrorKind::StoreUnavailable => "מצטערים, חלק מההיסטוריה אינו זמין כרגע.",
        }
    }
}

pub type Result<T> = std::result::Result<T, CeciError>;
