//! Intent classification record and the route-flag signals derived from it.

use serde::{Deserialize, Serialize};

use crate::conversation::EntityFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    DataQuery,
    Analysis,
    Statistical,
    Comparison,
    ResultRef,
    ClarificationNeeded,
    Unclear,
}

impl Intent {
    /// Intents whose answer is safe to memoize whole, per the cacheability
    /// predicate — never ANALYSIS/EVAL/CLARIFICATION/RESULT_REF.
    pub fn is_cacheable_family(self) -> bool {
        matches!(self, Intent::DataQuery | Intent::Statistical)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RouteFlags {
    pub needs_clarification: bool,
    pub has_context: bool,
    pub is_follow_up: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRecord {
    pub intent: Intent,
    pub confidence: f32,
    pub entities: EntityFrame,
    pub route_flags: RouteFlags,
}
