//! Integration tests for the planner's pure decision layer — reference
//! resolution, scope-break detection, the required-slot table, and
//! cacheability — composed together the way a turn would drive them,
//! without needing the nine stage services running.

use ceci_cache::{is_cacheable, CacheabilityInputs};
use ceci_domain::config::ReferenceVocabulary;
use ceci_domain::conversation::{EntityFrame, EntityKind, EntityValue};
use ceci_domain::intent::Intent;
use ceci_planner::reference::ReferenceScanner;
use ceci_planner::scope;
use ceci_planner::slots::missing_slots;

fn scanner() -> ReferenceScanner {
    ReferenceScanner::compile(&ReferenceVocabulary::default())
}

// Scenario 1: "החלטות ממשלה 37 בנושא חינוך" — DATA_QUERY, government+topic,
// no reference tokens, cacheable.
#[test]
fn government_and_topic_query_is_cacheable_data_query() {
    let text = "החלטות ממשלה 37 בנושא חינוך";
    let s = scanner();
    assert!(!s.has_reference_tokens(text));

    let mut frame = EntityFrame::default();
    frame.set(EntityKind::GovernmentNumber, EntityValue::Number(37));
    frame.set(EntityKind::Topic, EntityValue::Text("חינוך".into()));

    assert!(missing_slots(Intent::DataQuery, &frame, 0).is_empty());
    assert!(is_cacheable(&CacheabilityInputs {
        intent: Intent::DataQuery,
        entity_frame: &frame,
        has_reference_tokens: false,
        names_time_relative_operator: false,
    }));
}

// Scenario 4: "נתח את החלטה 2983 של ממשלה 37" — ANALYSIS is never cacheable
// regardless of entity content, and the decision number alone satisfies its
// required slot.
#[test]
fn analysis_of_a_pinned_decision_is_never_cacheable() {
    let mut frame = EntityFrame::default();
    frame.set(EntityKind::DecisionNumber, EntityValue::Number(2983));
    frame.set(EntityKind::GovernmentNumber, EntityValue::Number(37));

    assert!(missing_slots(Intent::Analysis, &frame, 0).is_empty());
    assert!(!is_cacheable(&CacheabilityInputs {
        intent: Intent::Analysis,
        entity_frame: &frame,
        has_reference_tokens: false,
        names_time_relative_operator: false,
    }));
}

// Scenario 3: two-turn ordinal reference. Turn (a) leaves 5 artifacts in the
// Last Result Set; turn (b) "תן לי את השלישית" resolves to the 3rd.
#[test]
fn ordinal_reference_picks_third_of_five() {
    let s = scanner();
    let matched = s.scan("תן לי את השלישית").expect("ordinal token present");
    let ids = vec!["10", "11", "12", "13", "14"];
    match matched {
        ceci_planner::ReferenceMatch::Ordinal(rank) => {
            assert_eq!(ids[rank - 1], "12");
        }
        other => panic!("expected an ordinal match, got {other:?}"),
    }
    // A reference present at all means this turn cannot be cached.
    assert!(s.has_reference_tokens("תן לי את השלישית"));
}

// Scenario 5: "מה?" — no reference, no entities, and CLARIFICATION_NEEDED
// bypasses the slot table entirely (it is already routed to CLARIFY).
#[test]
fn bare_ambiguous_utterance_has_no_missing_slots_to_report() {
    let frame = EntityFrame::default();
    assert!(missing_slots(Intent::ClarificationNeeded, &frame, 0).is_empty());
}

// Scenario 6: turn A pins decision 2989, turn B pins 1234 — a scope break
// must reset DecisionNumber alone, so a subsequent "תן לי את זה" resolves
// against 1234, never 2989, and the conversation must bypass its cache for
// the turn that follows the break.
#[test]
fn decision_number_replacement_resets_only_that_kind_and_flags_bypass() {
    let mut conv_frame = EntityFrame::default();
    conv_frame.set(EntityKind::DecisionNumber, EntityValue::Number(2989));
    conv_frame.set(EntityKind::Topic, EntityValue::Text("חינוך".into()));

    let mut delta = EntityFrame::default();
    delta.set(EntityKind::DecisionNumber, EntityValue::Number(1234));

    let brk = scope::detect("החלטה 1234", Intent::DataQuery, false, &conv_frame, &delta)
        .expect("replacing a pinned decision number is a scope break");
    assert_eq!(brk.kinds_reset, vec![EntityKind::DecisionNumber]);

    // Apply the break the way the planner does: clear the reset kinds, then
    // merge the new decision in.
    for kind in &brk.kinds_reset {
        conv_frame.remove(*kind);
    }
    conv_frame.merge(&delta);

    assert_eq!(conv_frame.decision_number(), Some(1234));
    // Topic survives the break — only the decision number was reset.
    assert!(conv_frame.get(EntityKind::Topic).is_some());
}

// Boundary: an explicit reset cue clears the whole frame, not just one kind.
#[test]
fn explicit_reset_cue_is_a_full_scope_break() {
    let mut frame = EntityFrame::default();
    frame.set(EntityKind::Topic, EntityValue::Text("חינוך".into()));
    frame.set(EntityKind::GovernmentNumber, EntityValue::Number(37));
    let delta = EntityFrame::default();

    let brk = scope::detect("שאלה חדשה בבקשה", Intent::DataQuery, false, &frame, &delta)
        .expect("reset cue triggers a scope break");
    assert_eq!(brk.kinds_reset.len(), 2);
}

// Boundary: Comparison needs two distinguishable subjects; one is not enough.
#[test]
fn comparison_with_single_topic_is_missing_a_subject() {
    let mut frame = EntityFrame::default();
    frame.set(EntityKind::Topic, EntityValue::Text("חינוך".into()));
    assert!(!missing_slots(Intent::Comparison, &frame, 1).is_empty());
}
