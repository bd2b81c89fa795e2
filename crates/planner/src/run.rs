//! The pipeline planner's per-turn algorithm: the 12-step state machine
//! from LOAD through PERSIST/DONE. Spawns one instrumented task per turn,
//! streams progress events over an `mpsc::Sender`, finalizes with a ledger
//! snapshot, and fires a side effect (cache write) on success.

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use ceci_cache::{build_cache_key, is_cacheable, normalize_text, CacheabilityInputs, CacheEntry};
use ceci_dispatch::StageDispatcher;
use ceci_domain::config::StageEndpointConfig;
use ceci_domain::conversation::{
    Conversation, EntityFrame, EntityKind, EntityValue, LastResultSet, Speaker, Turn,
    HARD_RESULT_CAP,
};
use ceci_domain::intent::Intent;
use ceci_domain::stage::{PresentationStyle, ResultArtifact, StageName, StageOutcome, TokenUsage};
use ceci_domain::trace::TraceEvent;
use ceci_domain::{CeciError, ErrorKind, Result};
use ceci_ledger::TokenLedger;
use ceci_store::UpdateMode;

use crate::cancel::CancelToken;
use crate::contracts::{
    ClarifyRequest, ClarifyResponse, EvalRequest, EvalResponse, FormatDataType, FormatRequest,
    FormatResponse, IntentRequest, IntentResponse, RankRequest, RankResponse, RewriteRequest,
    RewriteResponse, SqlExecRequest, SqlExecResponse, SqlGenRequest, SqlGenResponse,
};
use crate::deps::PlannerDeps;
use crate::event::{FinalMetadata, PlannerEvent};
use crate::reference::{ReferenceMatch, ReferenceScanner};
use crate::scope;
use crate::slots;

pub struct TurnInput {
    pub conv_id: String,
    pub message: String,
    pub include_metadata: bool,
}

/// Spawn the per-turn algorithm. Returns the request id (used for
/// cancellation) and the event receiver the HTTP layer streams from.
pub fn run_turn(deps: PlannerDeps, input: TurnInput) -> (Uuid, CancelToken, mpsc::Receiver<PlannerEvent>) {
    let (tx, rx) = mpsc::channel(32);
    let request_id = Uuid::new_v4();
    let cancel = CancelToken::new();
    let cancel_for_task = cancel.clone();

    let span = tracing::info_span!(
        "turn",
        %request_id,
        conv_id = %input.conv_id,
        "otel.kind" = "SERVER",
    );
    tokio::spawn(tracing::Instrument::instrument(
        async move {
            if let Err(e) = run_turn_inner(deps, input, tx.clone(), cancel_for_task, request_id).await {
                tracing::error!(error = %e, "turn aborted");
                let metadata = FinalMetadata {
                    intent: Intent::Unclear,
                    confidence: 0.0,
                    processing_time_ms: 0,
                    service: "ceci-core",
                    token_usage: ceci_ledger::LedgerSnapshot::default(),
                    degraded: false,
                };
                let _ = tx
                    .send(PlannerEvent::final_answer(e.hebrew_apology(), metadata))
                    .await;
            }
        },
        span,
    ));

    (request_id, cancel, rx)
}

async fn call_stage<Req, Resp>(
    deps: &PlannerDeps,
    ledger: &TokenLedger,
    stage: StageName,
    payload: &Req,
    remaining_deadline: Duration,
) -> Result<Resp>
where
    Req: serde::Serialize,
    Resp: serde::de::DeserializeOwned,
{
    let cfg = deps
        .config
        .dispatcher
        .stages
        .get(stage.as_str())
        .cloned()
        .unwrap_or_else(StageEndpointConfig::default);
    let started = Instant::now();

    let result = deps
        .dispatcher
        .call::<Req, Resp>(
            stage,
            &cfg,
            payload,
            deps.config.dispatcher.backoff_ceiling_ms,
            remaining_deadline,
        )
        .await;

    match result {
        Ok(outcome) => {
            ledger.record(
                stage,
                outcome.model.as_deref(),
                outcome.usage.prompt_tokens,
                outcome.usage.completion_tokens,
                outcome.elapsed_ms,
                outcome.outcome,
            );
            TraceEvent::StageCallCompleted {
                stage: stage.as_str().to_string(),
                outcome: "ok".to_string(),
                elapsed_ms: outcome.elapsed_ms,
            }
            .emit();
            Ok(outcome.body)
        }
        Err(e) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let stage_outcome = match e.kind() {
                ErrorKind::DeadlineExceeded => StageOutcome::Timeout,
                ErrorKind::StageMalformed => StageOutcome::Malformed,
                _ => StageOutcome::StageError,
            };
            ledger.record(stage, None, 0, 0, elapsed_ms, stage_outcome);
            TraceEvent::StageCallCompleted {
                stage: stage.as_str().to_string(),
                outcome: format!("{:?}", stage_outcome),
                elapsed_ms,
            }
            .emit();
            Err(e)
        }
    }
}

fn remaining(started: Instant, budget: Duration) -> Result<Duration> {
    let left = budget.checked_sub(started.elapsed()).unwrap_or(Duration::ZERO);
    if left.is_zero() {
        return Err(CeciError::DeadlineExceeded {
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
    }
    Ok(left)
}

async fn run_turn_inner(
    deps: PlannerDeps,
    input: TurnInput,
    tx: mpsc::Sender<PlannerEvent>,
    cancel: CancelToken,
    request_id: Uuid,
) -> Result<()> {
    let started = Instant::now();
    let ledger = TokenLedger::new(deps.config.pricing.clone());
    let mut budget = Duration::from_millis(deps.config.dispatcher.total_request_deadline_ms);
    let scanner = ReferenceScanner::compile(&deps.config.planner.reference_vocabulary);

    // ── Step 1: load context ─────────────────────────────────────────
    let existing = deps.store.load(&input.conv_id).await;
    let is_new = existing.is_none();
    let mut conv = existing.unwrap_or_else(|| Conversation::new(input.conv_id.clone(), Utc::now()));
    TraceEvent::ConversationLoaded {
        conv_id: input.conv_id.clone(),
        is_new,
        turn_count: conv.turns.len(),
    }
    .emit();

    let has_reference_tokens = scanner.has_reference_tokens(&input.message);

    let _ = tx.send(PlannerEvent::progress("טוען הקשר שיחה")).await;

    // ── Step 2: REWRITE (soft-degrade on failure) ───────────────────
    let clean_text = if cancel.is_cancelled() {
        return Ok(());
    } else {
        let payload = RewriteRequest {
            text: &input.message,
            conv_id: &input.conv_id,
        };
        match call_stage::<_, RewriteResponse>(
            &deps,
            &ledger,
            StageName::Rewrite,
            &payload,
            remaining(started, budget)?,
        )
        .await
        {
            Ok(resp) => resp.clean_text,
            Err(e) => {
                tracing::warn!(error = %e, "REWRITE failed, proceeding with raw text");
                input.message.clone()
            }
        }
    };

    let _ = tx.send(PlannerEvent::progress("מסווג כוונה")).await;

    // ── Step 3: INTENT ───────────────────────────────────────────────
    if cancel.is_cancelled() {
        return Ok(());
    }
    let intent_record = call_stage::<_, IntentResponse>(
        &deps,
        &ledger,
        StageName::Intent,
        &IntentRequest {
            clean_text: &clean_text,
            conv_id: &input.conv_id,
            context_digest: None,
        },
        remaining(started, budget)?,
    )
    .await?;

    if intent_record.intent == Intent::Analysis {
        budget = Duration::from_millis(deps.config.dispatcher.eval_route_deadline_ms);
    }

    if intent_record.intent == Intent::Unclear && intent_record.confidence < 0.5 {
        return clarify_and_finish(
            &deps, &tx, &ledger, started, &mut conv, &input, &clean_text, intent_record.intent,
            intent_record.confidence, vec!["intent".to_string()], remaining(started, budget)?,
            None,
        )
        .await;
    }

    // ── Step 4: reference resolution ────────────────────────────────
    let mut effective_frame = conv.entity_frame.clone();
    // Frame as it stood before this turn's own entities merge in — the
    // baseline Step 12's narrowing check compares against.
    let frame_before_turn = effective_frame.clone();
    effective_frame.merge(&intent_record.entities);

    let wants_reference_resolution = deps.config.planner.reference_resolution_enabled
        && (intent_record.intent == Intent::ResultRef || has_reference_tokens);

    if wants_reference_resolution {
        match resolve_reference(&scanner, &input.message, &conv) {
            Ok(Some(decision_number)) => {
                effective_frame.set(EntityKind::DecisionNumber, EntityValue::Number(decision_number));
            }
            Ok(None) => {
                // No reference token present despite the intent check above
                // (intent alone triggered resolution) — nothing to bind.
            }
            Err(ambiguous) => {
                return clarify_and_finish(
                    &deps, &tx, &ledger, started, &mut conv, &input, &clean_text,
                    intent_record.intent, intent_record.confidence,
                    vec![ambiguous.to_string()], remaining(started, budget)?,
                    None,
                )
                .await;
            }
        }
    }

    // ── Step 5: entity frame update + scope-break detection ─────────
    // The in-memory `conv`/`effective_frame` are updated immediately so the
    // rest of this turn sees the new frame, but the write to the backing
    // store is only buffered here — it is committed in Step 12, after the
    // data/format stages below have actually succeeded, so a failure in any
    // of them leaves the persisted entity frame untouched.
    let scope_break = scope::detect(
        &input.message,
        intent_record.intent,
        has_reference_tokens,
        &conv.entity_frame,
        &intent_record.entities,
    );

    let loaded_cache_bypass = conv.cache_bypass;
    let mut cache_bypass_this_turn = loaded_cache_bypass;
    let scope_break_happened = scope_break.is_some();
    let pending_entity_update: (EntityFrame, UpdateMode) = if let Some(brk) = scope_break {
        for kind in &brk.kinds_reset {
            conv.entity_frame.remove(*kind);
            effective_frame.remove(*kind);
        }
        effective_frame.merge(&intent_record.entities);
        conv.entity_frame.merge(&intent_record.entities);
        cache_bypass_this_turn = true;
        TraceEvent::ScopeBreak {
            conv_id: input.conv_id.clone(),
            kinds_reset: brk.kinds_reset.len(),
        }
        .emit();
        (
            intent_record.entities.clone(),
            UpdateMode::ReplaceScope { kinds_reset: brk.kinds_reset },
        )
    } else {
        conv.entity_frame.merge(&intent_record.entities);
        (intent_record.entities.clone(), UpdateMode::Merge)
    };

    // ── Step 6: cacheability check ───────────────────────────────────
    let subject_count = count_distinguishable_subjects(&effective_frame);
    let cacheable = is_cacheable(&CacheabilityInputs {
        intent: intent_record.intent,
        entity_frame: &effective_frame,
        has_reference_tokens,
        names_time_relative_operator: scanner.names_time_relative_operator(&input.message),
    });

    if cacheable && !cache_bypass_this_turn {
        let key = build_cache_key(
            &deps.config.cache.pipeline_version,
            &normalize_text(&clean_text),
            &effective_frame,
        );
        if let Some(entry) = deps.cache.get(&key) {
            TraceEvent::CacheHit {
                key: key.clone(),
                intent: format!("{:?}", intent_record.intent),
            }
            .emit();
            let (delta, mode) = pending_entity_update;
            let _ = deps.store.update_entities(&input.conv_id, &delta, mode).await;
            persist_turn(&deps, &input.conv_id, &clean_text, &entry.formatted_answer, conv.turns.len()).await;
            let metadata = final_metadata(&deps, &ledger, started, intent_record.intent, intent_record.confidence);
            let _ = tx.send(PlannerEvent::final_answer(entry.formatted_answer, metadata)).await;
            return Ok(());
        }
    } else if cache_bypass_this_turn {
        TraceEvent::CacheBypassed {
            conv_id: input.conv_id.clone(),
            reason: "scope_break".to_string(),
        }
        .emit();
    }

    // The flag raised by a scope break this turn carries forward so the
    // *next* turn also bypasses cache reads once; a flag consumed from a
    // prior turn (and not re-raised here) auto-clears now.
    if scope_break_happened {
        deps.store.set_cache_bypass(&input.conv_id, true).await.ok();
    } else if loaded_cache_bypass {
        deps.store.set_cache_bypass(&input.conv_id, false).await.ok();
    }

    // ── Step 7: clarification branch ─────────────────────────────────
    let missing = slots::missing_slots(intent_record.intent, &effective_frame, subject_count);
    if intent_record.intent == Intent::ClarificationNeeded || !missing.is_empty() {
        return clarify_and_finish(
            &deps, &tx, &ledger, started, &mut conv, &input, &clean_text, intent_record.intent,
            intent_record.confidence, missing.0, remaining(started, budget)?,
            Some(pending_entity_update),
        )
        .await;
    }

    let _ = tx.send(PlannerEvent::progress("שולף נתונים")).await;

    // ── Step 8: data stage ────────────────────────────────────────────
    let sqlgen = call_stage::<_, SqlGenResponse>(
        &deps,
        &ledger,
        StageName::SqlGen,
        &SqlGenRequest {
            intent: intent_record.intent,
            entities: &effective_frame,
            conv_id: &input.conv_id,
        },
        remaining(started, budget)?,
    )
    .await?;

    let sqlexec = call_stage::<_, SqlExecResponse>(
        &deps,
        &ledger,
        StageName::SqlExec,
        &SqlExecRequest {
            sql: sqlgen.sql.as_deref(),
            template_id: sqlgen.template_id.as_deref(),
            parameters: &sqlgen.parameters,
        },
        remaining(started, budget)?,
    )
    .await?;

    let declared_limit = match effective_frame.get(EntityKind::ResultLimit) {
        Some(EntityValue::Limit(n)) => (*n as usize).min(HARD_RESULT_CAP),
        _ => HARD_RESULT_CAP,
    };

    let mut artifacts = sqlexec.rows;

    // ── Step 9: ranking (conditional) ─────────────────────────────────
    let listing_intent = matches!(intent_record.intent, Intent::DataQuery | Intent::Statistical);
    if artifacts.len() > declared_limit && listing_intent {
        let _ = tx.send(PlannerEvent::progress("מדרג תוצאות")).await;
        let ranked = call_stage::<_, RankResponse>(
            &deps,
            &ledger,
            StageName::Rank,
            &RankRequest {
                artifacts: &artifacts,
                original_query: &clean_text,
                limit: declared_limit as u32,
            },
            remaining(started, budget)?,
        )
        .await?;
        artifacts = ranked.ranked;
    }
    artifacts.truncate(HARD_RESULT_CAP.min(declared_limit.max(1)));

    // ── Step 10: analysis (conditional) ───────────────────────────────
    let mut eval_result: Option<EvalResponse> = None;
    if intent_record.intent == Intent::Analysis {
        if let Some(first) = artifacts.first() {
            let _ = tx.send(PlannerEvent::progress("מעריך החלטה")).await;
            eval_result = Some(
                call_stage::<_, EvalResponse>(
                    &deps,
                    &ledger,
                    StageName::Eval,
                    &EvalRequest {
                        artifact_id: &first.id,
                        original_query: &clean_text,
                    },
                    remaining(started, budget)?,
                )
                .await?,
            );
        }
    }

    // ── Step 11: formatting ───────────────────────────────────────────
    let (data_type, content, style) = build_format_payload(intent_record.intent, &artifacts, &eval_result);
    let format_result = call_stage::<_, FormatResponse>(
        &deps,
        &ledger,
        StageName::Format,
        &FormatRequest {
            data_type,
            content,
            original_query: &clean_text,
            presentation_style: style,
            conv_id: &input.conv_id,
        },
        remaining(started, budget)?,
    )
    .await?;

    // ── Step 12: persist ───────────────────────────────────────────────
    let (delta, mode) = pending_entity_update;
    let _ = deps.store.update_entities(&input.conv_id, &delta, mode).await;

    let new_ids: Vec<String> = artifacts.iter().map(|a| a.id.clone()).collect();
    // An empty result still overwrites a non-empty Last Result Set when the
    // user's entity frame genuinely narrowed this turn (added a filter that
    // wasn't there before) — that is a deliberate zero-match query, not a
    // stage that came back empty by accident.
    let overwrite_last_result = !new_ids.is_empty()
        || conv.last_result.is_none()
        || frame_strictly_extends(&frame_before_turn, &effective_frame);
    if overwrite_last_result {
        let _ = deps
            .store
            .set_last_result(
                &input.conv_id,
                LastResultSet {
                    ids: new_ids,
                    query: clean_text.clone(),
                },
            )
            .await;
    }
    persist_turn(
        &deps,
        &input.conv_id,
        &clean_text,
        &format_result.formatted_response,
        conv.turns.len(),
    )
    .await;

    if cacheable && !cache_bypass_this_turn {
        let key = build_cache_key(
            &deps.config.cache.pipeline_version,
            &normalize_text(&clean_text),
            &effective_frame,
        );
        let ttl_seconds = match intent_record.intent {
            Intent::Statistical => deps.config.cache.statistical_ttl_seconds,
            _ => deps.config.cache.data_query_ttl_seconds,
        };
        deps.cache.put(
            key,
            format_result.formatted_response.clone(),
            format_result.metadata.clone(),
            Duration::from_secs(ttl_seconds.max(0) as u64),
        );
    }

    let metadata = final_metadata(&deps, &ledger, started, intent_record.intent, intent_record.confidence);
    let _ = tx
        .send(PlannerEvent::final_answer(format_result.formatted_response, metadata))
        .await;
    Ok(())
}

/// Resolve a reference token against the conversation's Last Result Set.
/// `Ok(Some(id))` on success, `Ok(None)` when no reference token is
/// present, `Err(reason)` when resolution is ambiguous or impossible — the
/// caller routes that to CLARIFY, never to a hard error: a circular or
/// self-referential reference triggers clarification, not a failure.
fn resolve_reference(
    scanner: &ReferenceScanner,
    text: &str,
    conv: &Conversation,
) -> std::result::Result<Option<i64>, &'static str> {
    let Some(matched) = scanner.scan(text) else {
        return Ok(None);
    };
    let Some(last_result) = &conv.last_result else {
        return Err("reference_with_empty_last_result");
    };
    if last_result.ids.is_empty() {
        return Err("reference_with_empty_last_result");
    }

    match matched {
        ReferenceMatch::Ordinal(rank) => match last_result.ids.get(rank - 1) {
            Some(id) => Ok(id.parse::<i64>().ok()),
            None => Err("ordinal_out_of_range"),
        },
        ReferenceMatch::LastOrdinal => Ok(last_result.ids.last().and_then(|s| s.parse::<i64>().ok())),
        ReferenceMatch::Demonstrative => {
            if last_result.ids.len() == 1 {
                Ok(last_result.ids[0].parse::<i64>().ok())
            } else {
                Err("ambiguous_demonstrative")
            }
        }
        ReferenceMatch::BackReference => Ok(last_result.ids.first().and_then(|s| s.parse::<i64>().ok())),
    }
}

/// True if `after`'s cache-relevant entries are a strict superset of
/// `before`'s — every kind `before` pinned still carries the same value in
/// `after`, plus at least one kind `before` left unset.
fn frame_strictly_extends(before: &EntityFrame, after: &EntityFrame) -> bool {
    let before_map = before.cache_relevant();
    let after_map = after.cache_relevant();
    if after_map.len() <= before_map.len() {
        return false;
    }
    before_map.iter().all(|(k, v)| after_map.get(k) == Some(v))
}

fn count_distinguishable_subjects(frame: &EntityFrame) -> usize {
    let mut count = 0;
    if frame.get(EntityKind::DecisionNumber).is_some() {
        count += 1;
    }
    if let Some(EntityValue::StringSet(topics)) = frame.get(EntityKind::Topic) {
        count += topics.len();
    } else if frame.get(EntityKind::Topic).is_some() {
        count += 1;
    }
    if let Some(EntityValue::StringSet(ministries)) = frame.get(EntityKind::MinistrySet) {
        count += ministries.len();
    }
    count
}

fn build_format_payload(
    intent: Intent,
    artifacts: &[ResultArtifact],
    eval_result: &Option<EvalResponse>,
) -> (FormatDataType, serde_json::Value, PresentationStyle) {
    if let Some(eval) = eval_result {
        return (
            FormatDataType::Analysis,
            serde_json::json!({ "eval": eval, "artifacts": artifacts }),
            PresentationStyle::Detailed,
        );
    }
    if artifacts.is_empty() {
        return (FormatDataType::Empty, serde_json::json!({}), PresentationStyle::Brief);
    }
    if intent == Intent::Statistical {
        return (
            FormatDataType::Count,
            serde_json::json!({ "count": artifacts.len() }),
            PresentationStyle::Brief,
        );
    }
    let style = if artifacts.len() == 1 {
        PresentationStyle::Detailed
    } else {
        PresentationStyle::Card
    };
    (
        FormatDataType::RankedRows,
        serde_json::json!({ "artifacts": artifacts }),
        style,
    )
}

#[allow(clippy::too_many_arguments)]
async fn clarify_and_finish(
    deps: &PlannerDeps,
    tx: &mpsc::Sender<PlannerEvent>,
    ledger: &TokenLedger,
    started: Instant,
    conv: &mut Conversation,
    input: &TurnInput,
    clean_text: &str,
    intent: Intent,
    confidence: f32,
    missing_slots: Vec<String>,
    remaining_deadline: Duration,
    entity_update: Option<(EntityFrame, UpdateMode)>,
) -> Result<()> {
    let clarify = call_stage::<_, ClarifyResponse>(
        deps,
        ledger,
        StageName::Clarify,
        &ClarifyRequest {
            known_entities: &conv.entity_frame,
            missing_slots: &missing_slots,
            conv_id: &input.conv_id,
        },
        remaining_deadline,
    )
    .await?;

    if let Some((delta, mode)) = entity_update {
        let _ = deps.store.update_entities(&input.conv_id, &delta, mode).await;
    }

    persist_turn(deps, &input.conv_id, clean_text, &clarify.question, conv.turns.len()).await;

    let metadata = final_metadata(deps, ledger, started, intent, confidence);
    let _ = tx.send(PlannerEvent::final_answer(clarify.question, metadata)).await;
    Ok(())
}

async fn persist_turn(deps: &PlannerDeps, conv_id: &str, user_text: &str, system_text: &str, _existing_turns: usize) {
    let max_turns = deps.config.store.max_turns_per_conversation;
    let now = Utc::now();
    let _ = deps
        .store
        .append_turn(
            conv_id,
            Turn {
                turn_id: Uuid::new_v4(),
                speaker: Speaker::User,
                clean_text: user_text.to_string(),
                timestamp: now,
            },
        )
        .await;
    let _ = deps
        .store
        .append_turn(
            conv_id,
            Turn {
                turn_id: Uuid::new_v4(),
                speaker: Speaker::System,
                clean_text: system_text.to_string(),
                timestamp: now,
            },
        )
        .await;
    let _ = max_turns; // trimming is enforced inside append_turn by the store.
}

fn final_metadata(
    deps: &PlannerDeps,
    ledger: &TokenLedger,
    started: Instant,
    intent: Intent,
    confidence: f32,
) -> FinalMetadata {
    FinalMetadata {
        intent,
        confidence,
        processing_time_ms: started.elapsed().as_millis() as u64,
        service: "ceci-core",
        token_usage: ledger.snapshot(),
        degraded: deps.store.is_degraded(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_payload_empty_when_no_artifacts() {
        let (dt, _, style) = build_format_payload(Intent::DataQuery, &[], &None);
        assert_eq!(dt, FormatDataType::Empty);
        assert_eq!(style, PresentationStyle::Brief);
    }

    #[test]
    fn format_payload_count_for_statistical() {
        let artifacts = vec![ResultArtifact {
            id: "1".into(),
            title: "x".into(),
            short_summary: "y".into(),
            long_form: None,
        }];
        let (dt, _, _) = build_format_payload(Intent::Statistical, &artifacts, &None);
        assert_eq!(dt, FormatDataType::Count);
    }

    #[test]
    fn format_payload_analysis_when_eval_present() {
        let eval = EvalResponse {
            score: 0.9,
            relevance_level: "high".into(),
            explanation: "ok".into(),
            criteria_breakdown: vec![],
        };
        let (dt, _, style) = build_format_payload(Intent::Analysis, &[], &Some(eval));
        assert_eq!(dt, FormatDataType::Analysis);
        assert_eq!(style, PresentationStyle::Detailed);
    }

    #[test]
    fn subject_count_counts_topic_set() {
        let mut frame = EntityFrame::default();
        frame.set(
            EntityKind::Topic,
            EntityValue::StringSet(vec!["a".into(), "b".into()]),
        );
        assert_eq!(count_distinguishable_subjects(&frame), 2);
    }

    #[test]
    fn resolve_reference_ordinal_out_of_range_is_err() {
        let scanner = ReferenceScanner::compile(&ceci_domain::config::ReferenceVocabulary::default());
        let mut conv = Conversation::new("c1", Utc::now());
        conv.last_result = Some(LastResultSet {
            ids: vec!["1".into()],
            query: "q".into(),
        });
        assert!(resolve_reference(&scanner, "תן לי את השלישית", &conv).is_err());
    }

    #[test]
    fn resolve_reference_with_empty_last_result_is_err() {
        let scanner = ReferenceScanner::compile(&ceci_domain::config::ReferenceVocabulary::default());
        let conv = Conversation::new("c1", Utc::now());
        assert!(resolve_reference(&scanner, "תן לי את זה", &conv).is_err());
    }

    #[test]
    fn resolve_reference_last_ordinal_tracks_actual_result_length() {
        let scanner = ReferenceScanner::compile(&ceci_domain::config::ReferenceVocabulary::default());
        let mut conv = Conversation::new("c1", Utc::now());
        conv.last_result = Some(LastResultSet {
            ids: vec!["10".into(), "11".into(), "12".into()],
            query: "q".into(),
        });
        assert_eq!(resolve_reference(&scanner, "תן לי את האחרון", &conv), Ok(Some(12)));
    }

    #[test]
    fn resolve_reference_none_when_no_token() {
        let scanner = ReferenceScanner::compile(&ceci_domain::config::ReferenceVocabulary::default());
        let conv = Conversation::new("c1", Utc::now());
        assert_eq!(resolve_reference(&scanner, "החלטות ממשלה 37", &conv), Ok(None));
    }
}
