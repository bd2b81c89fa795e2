//! The Stage Dispatcher: a uniform RPC client for the nine stage services,
//! with timeout, bounded retry with capped exponential backoff, error
//! classification, and token-usage extraction.
//!
//! The retry loop is built directly on `reqwest` + `tokio::time`, with no
//! separate retry crate pulled in.

mod classify;

pub use classify::{classify, classify_reqwest_error, Classified};

use std::time::{Duration, Instant};

use ceci_domain::config::StageEndpointConfig;
use ceci_domain::stage::{StageName, StageOutcome, TokenUsage};
use ceci_domain::{CeciError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// `token_usage` block shared by all nine stage contracts:
/// absence means the ledger records zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenUsageBlock {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    #[serde(default)]
    pub model: Option<String>,
}

/// Generic wrapper: every stage response is `{...stage fields, token_usage?}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(flatten)]
    body: T,
    #[serde(default)]
    token_usage: Option<TokenUsageBlock>,
}

pub struct StageCallOutcome<T> {
    pub body: T,
    pub usage: TokenUsage,
    pub model: Option<String>,
    pub elapsed_ms: u64,
    pub outcome: StageOutcome,
}

pub struct StageDispatcher {
    client: reqwest::Client,
}

impl Default for StageDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl StageDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Invoke `stage` with `payload`, retrying transient failures up to
    /// `cfg.max_retries` times with exponential backoff capped at
    /// `backoff_ceiling_ms`, and honoring `remaining_deadline` (the time
    /// left on the request's total budget).
    pub async fn call<Req, Resp>(
        &self,
        stage: StageName,
        cfg: &StageEndpointConfig,
        payload: &Req,
        backoff_ceiling_ms: u64,
        remaining_deadline: Duration,
    ) -> Result<StageCallOutcome<Resp>>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            let budget_left = remaining_deadline
                .checked_sub(started.elapsed())
                .unwrap_or(Duration::ZERO);
            if budget_left.is_zero() {
                return Err(CeciError::DeadlineExceeded {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
            let per_call_timeout = Duration::from_millis(cfg.timeout_ms).min(budget_left);

            let attempt_result = tokio::time::timeout(
                per_call_timeout,
                self.client.post(&cfg.endpoint).json(payload).send(),
            )
            .await;

            let send_result = match attempt_result {
                Ok(r) => r,
                Err(_elapsed) => {
                    if attempt >= cfg.max_retries {
                        return Err(CeciError::TransientUpstream {
                            stage: stage.as_str().to_string(),
                            message: format!("timeout after {attempt} retries"),
                        });
                    }
                    attempt += 1;
                    sleep_backoff(attempt, cfg.retry_backoff_ms, backoff_ceiling_ms).await;
                    continue;
                }
            };

            match send_result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let text = resp
                            .text()
                            .await
                            .map_err(|e| CeciError::StageMalformed {
                                stage: stage.as_str().to_string(),
                                detail: e.to_string(),
                            })?;
                        let parsed: std::result::Result<Envelope<Resp>, _> =
                            serde_json::from_str(&text);
                        return match parsed {
                            Ok(env) => {
                                let usage = env
                                    .token_usage
                                    .as_ref()
                                    .map(|u| TokenUsage {
                                        prompt_tokens: u.prompt_tokens,
                                        completion_tokens: u.completion_tokens,
                                    })
                                    .unwrap_or_default();
                                let model =
                                    env.token_usage.and_then(|u| u.model).filter(|m| !m.is_empty());
                                Ok(StageCallOutcome {
                                    body: env.body,
                                    usage,
                                    model,
                                    elapsed_ms: started.elapsed().as_millis() as u64,
                                    outcome: StageOutcome::Ok,
                                })
                            }
                            Err(e) => Err(CeciError::StageMalformed {
                                stage: stage.as_str().to_string(),
                                detail: e.to_string(),
                            }),
                        };
                    }

                    let status_code = status.as_u16();
                    match classify::classify(status_code) {
                        Classified::Refused(status) => {
                            return Err(CeciError::StageRefused {
                                stage: stage.as_str().to_string(),
                                status,
                            });
                        }
                        Classified::Transient(_) => {
                            if attempt >= cfg.max_retries {
                                return Err(CeciError::TransientUpstream {
                                    stage: stage.as_str().to_string(),
                                    message: format!("status {status_code} after {attempt} retries"),
                                });
                            }
                            attempt += 1;
                            sleep_backoff(attempt, cfg.retry_backoff_ms, backoff_ceiling_ms).await;
                        }
                    }
                }
                Err(e) => {
                    let classified = classify::classify_reqwest_error(stage.as_str(), &e);
                    if matches!(classified, CeciError::StageRefused { .. }) {
                        return Err(classified);
                    }
                    if attempt >= cfg.max_retries {
                        return Err(classified);
                    }
                    attempt += 1;
                    sleep_backoff(attempt, cfg.retry_backoff_ms, backoff_ceiling_ms).await;
                }
            }
        }
    }
}

async fn sleep_backoff(attempt: u32, base_ms: u64, ceiling_ms: u64) {
    let backoff = base_ms.saturating_mul(1u64 << attempt.min(20)).min(ceiling_ms);
    tokio::time::sleep(Duration::from_millis(backoff)).await;
}
