use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use sha2::{Digest, Sha256};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::EnvFilter;

use ceci_cache::ResponseCache;
use ceci_dispatch::StageDispatcher;
use ceci_domain::config::{Config, ConfigSeverity};
use ceci_planner::CancelMap;
use ceci_store::{ConversationLockMap, ConversationStore, RedisBackend};

use ceci_gateway::api;
use ceci_gateway::cli::{Cli, Command, ConfigCommand};
use ceci_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => {
            init_tracing();
            let (config, _config_path) = ceci_gateway::cli::load_config()?;
            run_server(Arc::new(config)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = ceci_gateway::cli::load_config()?;
            let valid = ceci_gateway::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = ceci_gateway::cli::load_config()?;
            ceci_gateway::cli::config::show(&config);
            Ok(())
        }
    }
}

/// Initialize structured JSON tracing (only for the `serve` command).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ceci_gateway=debug")),
        )
        .json()
        .init();
}

/// Start the gateway server with the given configuration.
async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("CECI gateway starting");

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Conversation store (Redis-backed, degrading to in-memory) ───
    let store = if config.store.backend_url.is_empty() {
        tracing::warn!("store.backend_url empty — running in-memory only, no cross-restart history");
        Arc::new(ConversationStore::in_memory_only(
            config.store.conversation_ttl_seconds,
            config.store.busy_wait_ms,
            config.store.max_turns_per_conversation,
        ))
    } else {
        let backend = RedisBackend::connect(
            &config.store.backend_url,
            "ceci".to_string(),
            config.store.conversation_ttl_seconds,
        )
        .await
        .context("connecting to conversation store backend")?;
        tracing::info!(url = %config.store.backend_url, "conversation store backend ready");
        Arc::new(ConversationStore::new(
            Arc::new(backend),
            config.store.conversation_ttl_seconds,
            config.store.busy_wait_ms,
            config.store.max_turns_per_conversation,
        ))
    };

    // ── Response cache ────────────────────────────────────────────────
    let cache = Arc::new(ResponseCache::new(config.cache.hard_cap_entries));
    tracing::info!(hard_cap = config.cache.hard_cap_entries, "response cache ready");

    // ── Stage dispatcher ──────────────────────────────────────────────
    let dispatcher = Arc::new(StageDispatcher::new());
    tracing::info!(stages = config.dispatcher.stages.len(), "stage dispatcher ready");

    // ── Per-conversation write lock (whole-turn serialization) ──────────
    let conv_locks = Arc::new(ConversationLockMap::new());
    tracing::info!("conversation lock map ready");

    // ── Cancel map (per-turn cancellation) ───────────────────────────
    let cancel_map = Arc::new(CancelMap::new());
    tracing::info!("cancel map ready");

    // ── API token (read once, hash for constant-time comparison) ────
    let api_token_hash = match std::env::var("CECI_API_TOKEN") {
        Ok(token) if !token.is_empty() => {
            tracing::info!("API bearer-token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!("API bearer-token auth DISABLED — set CECI_API_TOKEN to enable");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        store: store.clone(),
        cache: cache.clone(),
        dispatcher,
        conv_locks: conv_locks.clone(),
        cancel_map,
        api_token_hash,
        started_at: Instant::now(),
    };

    // ── Periodic conversation-lock pruning + cache sweep ─────────────
    {
        let conv_locks = conv_locks.clone();
        let cache = cache.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                conv_locks.prune_idle();
                cache.sweep_expired();
            }
        });
    }
    tracing::info!("background maintenance loop started (60s tick)");

    // ── CORS layer ────────────────────────────────────────────────────
    let cors_layer = build_cors_layer(&config.server.cors);

    // ── Concurrency limit (backpressure protection) ──────────────────
    let max_concurrent = std::env::var("CECI_MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(256);
    tracing::info!(max_concurrent, "concurrency limit set");

    // ── Rate-limit layer (per-IP token bucket via governor) ─────────
    let governor_layer = config.server.rate_limit.as_ref().map(|rl| {
        use tower_governor::governor::GovernorConfigBuilder;
        use tower_governor::GovernorLayer;

        let gov_config = GovernorConfigBuilder::default()
            .per_second(rl.requests_per_second)
            .burst_size(rl.burst_size)
            .finish()
            .expect("rate_limit: requests_per_second and burst_size must be > 0");

        tracing::info!(
            requests_per_second = rl.requests_per_second,
            burst_size = rl.burst_size,
            "per-IP rate limiting enabled"
        );

        GovernorLayer {
            config: std::sync::Arc::new(gov_config),
        }
    });
    if governor_layer.is_none() {
        tracing::info!("per-IP rate limiting disabled (no [server.rate_limit] in config)");
    }

    // ── Router ─────────────────────────────────────────────────────────
    let router = api::router(state.clone())
        .layer(cors_layer)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent));
    let app = if let Some(gov) = governor_layer {
        router.layer(gov).with_state(state.clone())
    } else {
        router.with_state(state.clone())
    };

    // ── Bind ─────────────────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "CECI gateway listening");

    axum::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}

/// Build a [`CorsLayer`] from the configured allowed origins.
///
/// Origins may contain a trailing `*` wildcard for the port segment
/// (e.g. `http://localhost:*`). These are expanded into a predicate that
/// matches any port on that host. A literal `"*"` allows all origins.
fn build_cors_layer(cors: &ceci_domain::config::CorsConfig) -> CorsLayer {
    use axum::http::header;

    if cors.allowed_origins.len() == 1 && cors.allowed_origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard \"*\" — all origins allowed");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut wildcard_prefixes: Vec<String> = Vec::new();

    for origin in &cors.allowed_origins {
        if origin.ends_with(":*") {
            let prefix = origin.trim_end_matches('*').to_owned();
            wildcard_prefixes.push(prefix);
        } else if let Ok(hv) = origin.parse::<HeaderValue>() {
            exact.push(hv);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if wildcard_prefixes.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            wildcard_prefixes.iter().any(|prefix| {
                origin_str
                    .strip_prefix(prefix.as_str())
                    .map(|port| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
                    .unwrap_or(false)
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
