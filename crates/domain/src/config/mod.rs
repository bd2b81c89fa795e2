mod cache;
mod dispatcher;
mod planner;
mod pricing;
mod server;
mod store;

pub use cache::CacheConfig;
pub use dispatcher::{DispatcherConfig, StageEndpointConfig};
pub use planner::{PlannerConfig, ReferenceVocabulary};
pub use pricing::{ModelRate, PriceTable};
pub use server::{CorsConfig, RateLimitConfig, ServerConfig};
pub use store::StoreConfig;

use serde::{Deserialize, Serialize};

use crate::stage::StageName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.severity {
            ConfigSeverity::Error => write!(f, "[ERROR] {}: {}", self.field, self.message),
            ConfigSeverity::Warning => write!(f, "[WARN] {}: {}", self.field, self.message),
        }
    }
}

fn err(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError {
        severity: ConfigSeverity::Error,
        field: field.to_string(),
        message: message.into(),
    }
}

fn warn(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError {
        severity: ConfigSeverity::Warning,
        field: field.to_string(),
        message: message.into(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub cache: CacheConfig,
    pub dispatcher: DispatcherConfig,
    pub planner: PlannerConfig,
    pub pricing: PriceTable,
}

fn valid_url_scheme(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// `store.backend_url` is a Redis connection string handed straight to
/// `redis::Client::open`, not an HTTP endpoint.
fn valid_redis_url_scheme(url: &str) -> bool {
    url.starts_with("redis://") || url.starts_with("rediss://")
}

impl Config {
    /// Validate the configuration surface, returning a list of issues. An
    /// empty list means the config is safe to start the server with;
    /// `Error`-severity issues must block startup, `Warning`s are logged
    /// but non-fatal.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(err("server.port", "port must be non-zero"));
        }
        if self.server.host.trim().is_empty() {
            issues.push(err("server.host", "host must not be empty"));
        }
        if self.server.session_key_prefix.trim().is_empty() {
            issues.push(err(
                "server.session_key_prefix",
                "session key prefix must not be empty",
            ));
        }
        if self.server.cors.allowed_origins == vec!["*".to_string()] {
            issues.push(warn(
                "server.cors.allowed_origins",
                "wildcard CORS origin allows any site to call this service",
            ));
        }
        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 {
                issues.push(err(
                    "server.rate_limit.requests_per_second",
                    "requests_per_second must be non-zero",
                ));
            }
            if rl.burst_size == 0 {
                issues.push(err(
                    "server.rate_limit.burst_size",
                    "burst_size must be non-zero",
                ));
            }
        }

        if self.store.max_turns_per_conversation == 0 {
            issues.push(err(
                "store.max_turns_per_conversation",
                "max turns must be non-zero",
            ));
        }
        if self.store.conversation_ttl_seconds <= 0 {
            issues.push(err(
                "store.conversation_ttl_seconds",
                "conversation TTL must be positive",
            ));
        }
        if !self.store.backend_url.is_empty() && !valid_redis_url_scheme(&self.store.backend_url) {
            issues.push(err(
                "store.backend_url",
                "backend_url must use redis:// or rediss://",
            ));
        }

        if self.cache.data_query_ttl_seconds <= 0 {
            issues.push(err(
                "cache.data_query_ttl_seconds",
                "cache TTL must be positive",
            ));
        }
        if self.cache.statistical_ttl_seconds <= 0 {
            issues.push(err(
                "cache.statistical_ttl_seconds",
                "cache TTL must be positive",
            ));
        }
        if self.cache.hard_cap_entries == 0 {
            issues.push(err(
                "cache.hard_cap_entries",
                "cache hard cap must be non-zero",
            ));
        }
        if self.cache.pipeline_version.trim().is_empty() {
            issues.push(err(
                "cache.pipeline_version",
                "pipeline_version must not be empty (needed to invalidate cache on contract changes)",
            ));
        }

        const KNOWN_STAGES: &[StageName] = &[
            StageName::Rewrite,
            StageName::Intent,
            StageName::ContextRoute,
            StageName::Clarify,
            StageName::SqlGen,
            StageName::SqlExec,
            StageName::Rank,
            StageName::Eval,
            StageName::Format,
        ];
        for (id, cfg) in &self.dispatcher.stages {
            if !KNOWN_STAGES.iter().any(|s| s.as_str() == id) {
                issues.push(err(
                    "dispatcher.stages",
                    format!("unknown stage id '{id}' — not in the closed stage alphabet"),
                ));
                continue;
            }
            if !cfg.endpoint.is_empty() && !valid_url_scheme(&cfg.endpoint) {
                issues.push(err(
                    format!("dispatcher.stages.{id}.endpoint").as_str(),
                    "endpoint must use http:// or https://",
                ));
            }
            if cfg.timeout_ms == 0 {
                issues.push(err(
                    format!("dispatcher.stages.{id}.timeout_ms").as_str(),
                    "timeout_ms must be non-zero",
                ));
            }
        }
        if self.dispatcher.total_request_deadline_ms == 0 {
            issues.push(err(
                "dispatcher.total_request_deadline_ms",
                "total request deadline must be non-zero",
            ));
        }
        if self.dispatcher.eval_route_deadline_ms < self.dispatcher.total_request_deadline_ms {
            issues.push(err(
                "dispatcher.eval_route_deadline_ms",
                "the EVAL-route deadline must be at least the default total deadline",
            ));
        }

        if !(0.0..=1.0).contains(&self.planner.fuzzy_threshold) {
            issues.push(err(
                "planner.fuzzy_threshold",
                "fuzzy_threshold must be between 0.0 and 1.0",
            ));
        }
        for (field, patterns) in [
            (
                "planner.reference_vocabulary.decision_patterns",
                &self.planner.reference_vocabulary.decision_patterns,
            ),
            (
                "planner.reference_vocabulary.government_patterns",
                &self.planner.reference_vocabulary.government_patterns,
            ),
            (
                "planner.reference_vocabulary.date_range_patterns",
                &self.planner.reference_vocabulary.date_range_patterns,
            ),
        ] {
            for p in patterns {
                if regex::Regex::new(p).is_err() {
                    issues.push(err(field, format!("invalid regex: {p}")));
                }
            }
        }

        for (model, rate) in &self.pricing.models {
            if rate.prompt_rate_per_1k < 0.0 || rate.completion_rate_per_1k < 0.0 {
                issues.push(err(
                    format!("pricing.models.{model}").as_str(),
                    "rates must be non-negative",
                ));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config::default()
    }

    fn find_issue<'a>(issues: &'a [ConfigError], field_prefix: &str) -> Option<&'a ConfigError> {
        issues.iter().find(|i| i.field.starts_with(field_prefix))
    }

    #[test]
    fn default_config_is_valid() {
        let issues = valid_config().validate();
        assert!(
            issues.iter().all(|i| i.severity == ConfigSeverity::Warning),
            "default config should have no errors: {issues:?}"
        );
    }

    #[test]
    fn server_port_zero_is_error() {
        let mut cfg = valid_config();
        cfg.server.port = 0;
        let issues = cfg.validate();
        let issue = find_issue(&issues, "server.port").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Error);
    }

    #[test]
    fn server_host_empty_is_error() {
        let mut cfg = valid_config();
        cfg.server.host = "  ".to_string();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "server.host").is_some());
    }

    #[test]
    fn cors_wildcard_is_warning() {
        let mut cfg = valid_config();
        cfg.server.cors.allowed_origins = vec!["*".to_string()];
        let issues = cfg.validate();
        let issue = find_issue(&issues, "server.cors").unwrap();
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn rate_limit_zero_rps_is_error() {
        let mut cfg = valid_config();
        cfg.server.rate_limit = Some(RateLimitConfig {
            requests_per_second: 0,
            burst_size: 10,
        });
        let issues = cfg.validate();
        assert!(find_issue(&issues, "server.rate_limit.requests_per_second").is_some());
    }

    #[test]
    fn store_max_turns_zero_is_error() {
        let mut cfg = valid_config();
        cfg.store.max_turns_per_conversation = 0;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "store.max_turns_per_conversation").is_some());
    }

    #[test]
    fn store_ttl_zero_is_error() {
        let mut cfg = valid_config();
        cfg.store.conversation_ttl_seconds = 0;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "store.conversation_ttl_seconds").is_some());
    }

    #[test]
    fn store_backend_url_invalid_scheme_is_error() {
        let mut cfg = valid_config();
        cfg.store.backend_url = "ftp://example.com".to_string();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "store.backend_url").is_some());
    }

    #[test]
    fn store_backend_url_http_scheme_is_also_an_error() {
        // The Redis client never accepts this, even though it passes the
        // dispatcher endpoint check below.
        let mut cfg = valid_config();
        cfg.store.backend_url = "http://example.com".to_string();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "store.backend_url").is_some());
    }

    #[test]
    fn store_backend_url_redis_scheme_is_valid() {
        let mut cfg = valid_config();
        cfg.store.backend_url = "redis://localhost:6379".to_string();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "store.backend_url").is_none());
    }

    #[test]
    fn store_backend_url_rediss_scheme_is_valid() {
        let mut cfg = valid_config();
        cfg.store.backend_url = "rediss://localhost:6380".to_string();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "store.backend_url").is_none());
    }

    #[test]
    fn cache_hard_cap_zero_is_error() {
        let mut cfg = valid_config();
        cfg.cache.hard_cap_entries = 0;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "cache.hard_cap_entries").is_some());
    }

    #[test]
    fn cache_pipeline_version_empty_is_error() {
        let mut cfg = valid_config();
        cfg.cache.pipeline_version = String::new();
        let issues = cfg.validate();
        assert!(find_issue(&issues, "cache.pipeline_version").is_some());
    }

    #[test]
    fn unknown_stage_id_is_error() {
        let mut cfg = valid_config();
        cfg.dispatcher.stages.insert(
            "NOT-A-STAGE".to_string(),
            StageEndpointConfig::default(),
        );
        let issues = cfg.validate();
        assert!(find_issue(&issues, "dispatcher.stages").is_some());
    }

    #[test]
    fn stage_endpoint_invalid_scheme_is_error() {
        let mut cfg = valid_config();
        cfg.dispatcher.stages.insert(
            "REWRITE".to_string(),
            StageEndpointConfig {
                endpoint: "ws://bad".to_string(),
                ..Default::default()
            },
        );
        let issues = cfg.validate();
        assert!(find_issue(&issues, "dispatcher.stages.REWRITE.endpoint").is_some());
    }

    #[test]
    fn eval_deadline_below_default_is_error() {
        let mut cfg = valid_config();
        cfg.dispatcher.eval_route_deadline_ms = 1;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "dispatcher.eval_route_deadline_ms").is_some());
    }

    #[test]
    fn fuzzy_threshold_out_of_range_is_error() {
        let mut cfg = valid_config();
        cfg.planner.fuzzy_threshold = 1.5;
        let issues = cfg.validate();
        assert!(find_issue(&issues, "planner.fuzzy_threshold").is_some());
    }

    #[test]
    fn invalid_regex_pattern_is_error() {
        let mut cfg = valid_config();
        cfg.planner
            .reference_vocabulary
            .decision_patterns
            .push("(unclosed".to_string());
        let issues = cfg.validate();
        assert!(find_issue(&issues, "planner.reference_vocabulary.decision_patterns").is_some());
    }

    #[test]
    fn negative_price_rate_is_error() {
        let mut cfg = valid_config();
        cfg.pricing.models.insert(
            "gpt-x".to_string(),
            ModelRate {
                prompt_rate_per_1k: -1.0,
                completion_rate_per_1k: 0.0,
            },
        );
        let issues = cfg.validate();
        assert!(find_issue(&issues, "pricing.models.gpt-x").is_some());
    }

    #[test]
    fn config_error_display_format() {
        let e = err("x.y", "bad");
        assert_eq!(format!("{e}"), "[ERROR] x.y: bad");
        let w = warn("x.y", "meh");
        assert_eq!(format!("{w}"), "[WARN] x.y: meh");
    }
}
