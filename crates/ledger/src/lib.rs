//! Per-request token and cost accounting.
//!
//! A `TokenLedger` lives exactly as long as one turn, never resets, and
//! preserves the order stages were called in (a `Vec` guarded by a mutex,
//! not a `HashMap`, since call ordering is an invariant callers rely on).

use std::collections::HashSet;

use ceci_domain::config::PriceTable;
use ceci_domain::stage::{StageCallRecord, StageName, StageOutcome};
use parking_lot::Mutex;
use serde::Serialize;

/// Snapshot of a request's accumulated token/cost usage, produced once the
/// route completes or aborts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerSnapshot {
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub per_stage: Vec<StageCallRecord>,
    /// Non-fatal warnings accumulated while pricing calls (e.g.
    /// `model_unknown`).
    pub warnings: Vec<String>,
}

struct Inner {
    calls: Vec<StageCallRecord>,
    seen: HashSet<StageName>,
    warnings: Vec<String>,
}

/// Accumulates prompt/completion tokens and cost per stage for exactly one
/// request. Never shared across requests — construct a fresh one per turn.
pub struct TokenLedger {
    price_table: PriceTable,
    inner: Mutex<Inner>,
}

impl TokenLedger {
    pub fn new(price_table: PriceTable) -> Self {
        Self {
            price_table,
            inner: Mutex::new(Inner {
                calls: Vec::new(),
                seen: HashSet::new(),
                warnings: Vec::new(),
            }),
        }
    }

    /// Record one stage invocation. Idempotent on stage: a second call for
    /// a stage already recorded is dropped silently (and logged) — the
    /// request id is implicit since one ledger exists per request.
    ///
    /// Recording never fails the request: any issue is logged and the
    /// request proceeds.
    pub fn record(
        &self,
        stage: StageName,
        model: Option<&str>,
        prompt_tokens: u32,
        completion_tokens: u32,
        elapsed_ms: u64,
        outcome: StageOutcome,
    ) {
        let mut inner = self.inner.lock();
        if !inner.seen.insert(stage) {
            tracing::warn!(stage = stage.as_str(), "duplicate ledger record dropped");
            return;
        }

        if let Some(model) = model {
            if !model.is_empty() && !self.price_table.is_known(model) {
                inner
                    .warnings
                    .push(format!("model_unknown: {model} (stage {})", stage.as_str()));
            }
        }

        inner.calls.push(StageCallRecord {
            stage,
            model: model.filter(|m| !m.is_empty()).map(str::to_owned),
            prompt_tokens,
            completion_tokens,
            elapsed_ms,
            outcome,
        });
    }

    /// Produce the final accounting for this request.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let inner = self.inner.lock();
        let mut total_prompt = 0u64;
        let mut total_completion = 0u64;
        let mut total_cost = 0.0;

        for call in &inner.calls {
            total_prompt += call.prompt_tokens as u64;
            total_completion += call.completion_tokens as u64;
            if let Some(model) = &call.model {
                total_cost += self
                    .price_table
                    .estimate_cost(model, call.prompt_tokens, call.completion_tokens);
            }
        }

        LedgerSnapshot {
            total_prompt_tokens: total_prompt,
            total_completion_tokens: total_completion,
            total_tokens: total_prompt + total_completion,
            total_cost_usd: total_cost,
            per_stage: inner.calls.clone(),
            warnings: inner.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceci_domain::config::ModelRate;

    fn price_table_with_gpt() -> PriceTable {
        let mut pt = PriceTable::default();
        pt.models.insert(
            "gpt-test".to_string(),
            ModelRate {
                prompt_rate_per_1k: 1.0,
                completion_rate_per_1k: 2.0,
            },
        );
        pt
    }

    #[test]
    fn snapshot_sums_match_per_stage() {
        let ledger = TokenLedger::new(price_table_with_gpt());
        ledger.record(
            StageName::Rewrite,
            Some("gpt-test"),
            100,
            50,
            10,
            StageOutcome::Ok,
        );
        ledger.record(
            StageName::Intent,
            Some("gpt-test"),
            200,
            20,
            15,
            StageOutcome::Ok,
        );

        let snap = ledger.snapshot();
        assert_eq!(snap.total_prompt_tokens, 300);
        assert_eq!(snap.total_completion_tokens, 70);
        assert_eq!(snap.total_tokens, 370);
        assert_eq!(
            snap.total_tokens,
            snap.per_stage
                .iter()
                .map(|c| (c.prompt_tokens + c.completion_tokens) as u64)
                .sum::<u64>()
        );
    }

    #[test]
    fn call_ordering_preserved() {
        let ledger = TokenLedger::new(PriceTable::default());
        ledger.record(StageName::Rewrite, None, 1, 1, 1, StageOutcome::Ok);
        ledger.record(StageName::Intent, None, 1, 1, 1, StageOutcome::Ok);
        ledger.record(StageName::SqlGen, None, 1, 1, 1, StageOutcome::Ok);

        let snap = ledger.snapshot();
        let order: Vec<_> = snap.per_stage.iter().map(|c| c.stage.as_str()).collect();
        assert_eq!(order, vec!["REWRITE", "INTENT", "SQL-GEN"]);
    }

    #[test]
    fn duplicate_stage_record_is_idempotent() {
        let ledger = TokenLedger::new(PriceTable::default());
        ledger.record(StageName::Rewrite, None, 10, 5, 1, StageOutcome::Ok);
        ledger.record(StageName::Rewrite, None, 999, 999, 1, StageOutcome::Ok);

        let snap = ledger.snapshot();
        assert_eq!(snap.per_stage.len(), 1);
        assert_eq!(snap.total_prompt_tokens, 10);
    }

    #[test]
    fn unknown_model_yields_zero_cost_and_warning() {
        let ledger = TokenLedger::new(price_table_with_gpt());
        ledger.record(
            StageName::Format,
            Some("unknown-model"),
            100,
            100,
            1,
            StageOutcome::Ok,
        );

        let snap = ledger.snapshot();
        assert_eq!(snap.total_cost_usd, 0.0);
        assert_eq!(snap.warnings.len(), 1);
        assert!(snap.warnings[0].contains("model_unknown"));
    }

    #[test]
    fn known_model_cost_is_priced() {
        let ledger = TokenLedger::new(price_table_with_gpt());
        ledger.record(
            StageName::Eval,
            Some("gpt-test"),
            1000,
            1000,
            1,
            StageOutcome::Ok,
        );
        let snap = ledger.snapshot();
        assert_eq!(snap.total_cost_usd, 3.0);
        assert!(snap.warnings.is_empty());
    }

    #[test]
    fn absent_model_records_zero_tokens_no_warning() {
        let ledger = TokenLedger::new(price_table_with_gpt());
        ledger.record(StageName::SqlExec, None, 0, 0, 5, StageOutcome::Ok);
        let snap = ledger.snapshot();
        assert_eq!(snap.total_tokens, 0);
        assert!(snap.warnings.is_empty());
    }

    #[test]
    fn empty_ledger_snapshot_is_zeroed() {
        let ledger = TokenLedger::new(PriceTable::default());
        let snap = ledger.snapshot();
        assert_eq!(snap.total_tokens, 0);
        assert_eq!(snap.total_cost_usd, 0.0);
        assert!(snap.per_stage.is_empty());
    }
}
