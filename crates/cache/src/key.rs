//! Cache key derivation:
//! `hash(pipeline_version ∥ normalized_text ∥ sorted(entity_frame ∖ reference_kinds))`

use ceci_domain::conversation::EntityFrame;
use sha2::{Digest, Sha256};

/// Collapse whitespace and trim, matching the planner's own clean-text
/// normalization so equivalent phrasing maps to the same key.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn build_cache_key(pipeline_version: &str, normalized_text: &str, entity_frame: &EntityFrame) -> String {
    let relevant = entity_frame.cache_relevant();
    let entity_part = relevant
        .iter()
        .map(|(k, v)| format!("{k:?}={v:?}"))
        .collect::<Vec<_>>()
        .join(",");

    let mut hasher = Sha256::new();
    hasher.update(pipeline_version.as_bytes());
    hasher.update(b"\0");
    hasher.update(normalized_text.as_bytes());
    hasher.update(b"\0");
    hasher.update(entity_part.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceci_domain::conversation::{EntityKind, EntityValue};

    #[test]
    fn same_inputs_produce_same_key() {
        let mut frame = EntityFrame::default();
        frame.set(EntityKind::Topic, EntityValue::Text("education".into()));
        let a = build_cache_key("v1", "כמה החלטות בנושא חינוך", &frame);
        let b = build_cache_key("v1", "כמה החלטות בנושא חינוך", &frame);
        assert_eq!(a, b);
    }

    #[test]
    fn decision_number_excluded_from_key() {
        let mut with_decision = EntityFrame::default();
        with_decision.set(EntityKind::Topic, EntityValue::Text("education".into()));
        with_decision.set(EntityKind::DecisionNumber, EntityValue::Number(100));

        let mut without_decision = EntityFrame::default();
        without_decision.set(EntityKind::Topic, EntityValue::Text("education".into()));

        let a = build_cache_key("v1", "text", &with_decision);
        let b = build_cache_key("v1", "text", &without_decision);
        assert_eq!(a, b, "decision-number is reference-only and excluded from the key");
    }

    #[test]
    fn different_pipeline_version_changes_key() {
        let frame = EntityFrame::default();
        let a = build_cache_key("v1", "text", &frame);
        let b = build_cache_key("v2", "text", &frame);
        assert_ne!(a, b);
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  a   b  c "), "a b c");
    }
}
