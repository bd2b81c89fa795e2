//! Required-slot table for the canonical intents, with the DATA_QUERY
//! family gated on the weaker pre-SQL-GEN signal ("topic OR government OR
//! ministry present") rather than the stricter post-SQL-GEN count-vs-search
//! distinction, since this check only needs to decide whether CLARIFY runs
//! before SQL-GEN has had a chance to run at all.

use ceci_domain::conversation::{EntityFrame, EntityKind};
use ceci_domain::intent::Intent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingSlots(pub Vec<String>);

impl MissingSlots {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Evaluate the required-slot table for `intent` against `frame` (already
/// updated with any reference-resolution results). `subject_count` is the
/// planner's best count of distinguishable subjects named in the utterance,
/// used only for COMPARISON's structural check (at least two distinguishable
/// subjects, enforced separately from simple presence/absence checks).
pub fn missing_slots(intent: Intent, frame: &EntityFrame, subject_count: usize) -> MissingSlots {
    let mut missing = Vec::new();
    match intent {
        Intent::DataQuery | Intent::Statistical => {
            let has_any = frame.get(EntityKind::Topic).is_some()
                || frame.get(EntityKind::GovernmentNumber).is_some()
                || frame.get(EntityKind::MinistrySet).is_some();
            if !has_any {
                missing.push("topic_or_government_or_ministry".to_string());
            }
        }
        Intent::Analysis => {
            if frame.decision_number().is_none() {
                missing.push("decision_number".to_string());
            }
        }
        Intent::ResultRef => {
            if frame.decision_number().is_none() {
                missing.push("resolved_decision_number".to_string());
            }
        }
        Intent::Comparison => {
            if subject_count < 2 {
                missing.push("distinguishable_subjects".to_string());
            }
        }
        Intent::ClarificationNeeded | Intent::Unclear => {
            // CLARIFY is already the destination for these intents; no
            // slot table applies.
        }
    }
    MissingSlots(missing)
}
