//! Scope-break detection: a conversation turn that
//! clearly starts a new topic discards prior entity bindings for the
//! affected kinds and raises the cache-bypass flag for one turn.

use ceci_domain::conversation::{EntityFrame, EntityKind, EntityValue};
use ceci_domain::intent::Intent;

/// Explicit reset cues a user might say ("forget the above", "new
/// question") — a small closed vocabulary, same spirit as the reference
/// scanner's word lists.
const RESET_CUE_WORDS: &[&str] = &["שכח את זה", "שאלה חדשה", "בוא נתחיל מחדש"];

pub struct ScopeBreak {
    pub kinds_reset: Vec<EntityKind>,
}

/// Decide whether `new_entities` (the increment INTENT just extracted) and
/// `raw_text` represent a scope break against `current_frame`. Returns the
/// entity kinds that should be cleared via `update_entities(..., mode =
/// ReplaceScope)` rather than merged.
pub fn detect(
    raw_text: &str,
    intent: Intent,
    has_reference_tokens: bool,
    current_frame: &EntityFrame,
    new_entities: &EntityFrame,
) -> Option<ScopeBreak> {
    if RESET_CUE_WORDS.iter().any(|cue| raw_text.contains(cue)) {
        return Some(ScopeBreak {
            kinds_reset: current_frame.0.keys().copied().collect(),
        });
    }

    // A new specific decision-number replacing an old one is a scope break
    // on the decision-number kind alone — the rest of the frame (topic,
    // government, ministries) still applies to the new subject.
    if let (Some(EntityValue::Number(old)), Some(EntityValue::Number(new))) = (
        current_frame.get(EntityKind::DecisionNumber),
        new_entities.get(EntityKind::DecisionNumber),
    ) {
        if old != new {
            return Some(ScopeBreak {
                kinds_reset: vec![EntityKind::DecisionNumber],
            });
        }
    }

    // intent != RESULT_REF with no reference tokens and a complete
    // independent entity set (at least one of topic/government/ministry)
    // is a fresh, self-sufficient query: treat it as a scope break over
    // the whole frame so stale bindings from an earlier subject don't leak
    // into this turn's answer.
    if intent != Intent::ResultRef && !has_reference_tokens {
        let names_independent_subject = new_entities.get(EntityKind::Topic).is_some()
            || new_entities.get(EntityKind::GovernmentNumber).is_some()
            || new_entities.get(EntityKind::MinistrySet).is_some();
        if names_independent_subject && !current_frame.0.is_empty() {
            return Some(ScopeBreak {
                kinds_reset: current_frame.0.keys().copied().collect(),
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_reset_cue_clears_everything() {
        let mut frame = EntityFrame::default();
        frame.set(EntityKind::Topic, EntityValue::Text("חינוך".to_string()));
        let delta = EntityFrame::default();
        let result = detect("שאלה חדשה בבקשה", Intent::DataQuery, false, &frame, &delta);
        assert!(result.is_some());
        assert_eq!(result.unwrap().kinds_reset, vec![EntityKind::Topic]);
    }

    #[test]
    fn new_decision_number_resets_only_that_kind() {
        let mut frame = EntityFrame::default();
        frame.set(EntityKind::DecisionNumber, EntityValue::Number(2989));
        let mut delta = EntityFrame::default();
        delta.set(EntityKind::DecisionNumber, EntityValue::Number(1234));
        let result = detect("החלטה 1234", Intent::DataQuery, false, &frame, &delta);
        assert_eq!(result.unwrap().kinds_reset, vec![EntityKind::DecisionNumber]);
    }

    #[test]
    fn same_decision_number_is_not_a_scope_break() {
        let mut frame = EntityFrame::default();
        frame.set(EntityKind::DecisionNumber, EntityValue::Number(2989));
        let mut delta = EntityFrame::default();
        delta.set(EntityKind::DecisionNumber, EntityValue::Number(2989));
        assert!(detect("עוד על החלטה 2989", Intent::DataQuery, false, &frame, &delta).is_none());
    }

    #[test]
    fn independent_subject_with_reference_tokens_is_not_a_scope_break() {
        let mut frame = EntityFrame::default();
        frame.set(EntityKind::Topic, EntityValue::Text("חינוך".to_string()));
        let mut delta = EntityFrame::default();
        delta.set(EntityKind::Topic, EntityValue::Text("בריאות".to_string()));
        assert!(detect("תן לי את זה בנושא בריאות", Intent::DataQuery, true, &frame, &delta).is_none());
    }

    #[test]
    fn empty_frame_has_no_scope_break() {
        let frame = EntityFrame::default();
        let mut delta = EntityFrame::default();
        delta.set(EntityKind::Topic, EntityValue::Text("חינוך".to_string()));
        assert!(detect("החלטות בנושא חינוך", Intent::DataQuery, false, &frame, &delta).is_none());
    }
}
