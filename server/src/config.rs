//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

const DEFAULT_SEARCH_LOGO_URL: &str =
    "https://s.w.org/style/images/about/WordPress-logotype-wmark.png";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// Shared verification token sent by Slack in every event callback
    pub slack_verification_token: String,

    /// Bot token used as bearer credential for Web API calls
    pub slack_bot_token: String,

    /// Signing secret for `X-Slack-Signature` verification (optional)
    pub slack_signing_secret: Option<String>,

    /// Slack Web API base URL (default: `https://slack.com/api`)
    pub slack_api_base_url: String,

    /// WordPress site base URL (e.g., `https://blog.example.com`)
    pub wp_base_url: String,

    /// WordPress basic auth username
    pub wp_username: String,

    /// WordPress basic auth (application) password
    pub wp_password: String,

    /// `PostgreSQL` URL for the usage/error log tables (optional)
    pub database_url: Option<String>,

    /// Redis URL for delivery deduplication (optional)
    pub redis_url: Option<String>,

    /// Lifetime of a dedupe marker in seconds (default: 600)
    pub dedupe_ttl_secs: u64,

    /// Prefix for dedupe keys in Redis
    pub dedupe_key_prefix: String,

    /// Timeout applied to every outbound HTTP call in seconds (default: 10)
    pub http_timeout_secs: u64,

    /// Thread status shown while a search is running
    pub status_text: String,

    /// Image shown next to the result count
    pub search_logo_url: String,

    /// Maximum accepted request body in bytes (default: 1MB)
    pub max_body_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            slack_verification_token: env::var("SLACK_VERIFICATION_TOKEN")
                .context("SLACK_VERIFICATION_TOKEN must be set")?,
            slack_bot_token: env::var("SLACK_BOT_TOKEN").context("SLACK_BOT_TOKEN must be set")?,
            slack_signing_secret: env::var("SLACK_SIGNING_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            slack_api_base_url: env::var("SLACK_API_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://slack.com/api".into()),
            wp_base_url: env::var("WP_BASE_URL")
                .context("WP_BASE_URL must be set")?
                .trim_end_matches('/')
                .to_string(),
            wp_username: env::var("WP_USERNAME").unwrap_or_default(),
            wp_password: env::var("WP_PASSWORD").unwrap_or_default(),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            dedupe_ttl_secs: env::var("DEDUPE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(600), // 10 minutes
            dedupe_key_prefix: env::var("DEDUPE_KEY_PREFIX")
                .unwrap_or_else(|_| "searchbot:dedupe".into()),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(10),
            status_text: env::var("STATUS_TEXT").unwrap_or_else(|_| "Bot is thinking...".into()),
            search_logo_url: env::var("SEARCH_LOGO_URL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_LOGO_URL.into()),
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
        })
    }

    /// Outbound HTTP timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Check if request signature verification is enabled.
    #[must_use]
    pub const fn has_signing_secret(&self) -> bool {
        self.slack_signing_secret.is_some()
    }

    /// Create a default configuration for testing.
    ///
    /// Redis and `PostgreSQL` are left unset so tests run against the
    /// in-memory stores. Backend-specific tests use:
    /// - `PostgreSQL` on port 5434, user/password/db `test` (`postgres:16`), as
    ///   described in `tests/log_store_test.rs`
    /// - Redis: `docker run -d --name searchbot-test-redis -p 6380:6379 redis:7`
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            slack_verification_token: "test-verification-token".into(),
            slack_bot_token: "xoxb-test".into(),
            slack_signing_secret: None,
            slack_api_base_url: "http://127.0.0.1:9/api".into(),
            wp_base_url: "http://127.0.0.1:9".into(),
            wp_username: "user".into(),
            wp_password: "pass".into(),
            database_url: None,
            redis_url: None,
            dedupe_ttl_secs: 600,
            dedupe_key_prefix: "test:dedupe".into(),
            http_timeout_secs: 5,
            status_text: "Bot is thinking...".into(),
            search_logo_url: "https://example.com/logo.png".into(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Tracing and OTLP export settings.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Export spans and logs over OTLP
    pub enabled: bool,
    /// OTLP gRPC collector endpoint
    pub otlp_endpoint: String,
    /// `service.name` resource attribute
    pub service_name: String,
    /// Head sampling ratio for root spans
    pub trace_sample_ratio: f64,
    /// Default filter directive when `RUST_LOG` is unset
    pub log_level: String,
    /// `deployment.environment` resource attribute
    pub environment: String,
}

impl ObservabilityConfig {
    /// Load observability settings from environment variables.
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("OTEL_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".into()),
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "searchbot-server".into()),
            trace_sample_ratio: env::var("OTEL_TRACES_SAMPLER_ARG")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &f64| (0.0..=1.0).contains(v))
                .unwrap_or(0.1),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "searchbot_server=debug,tower_http=debug".into()),
            environment: env::var("DEPLOYMENT_ENVIRONMENT").unwrap_or_else(|_| "local".into()),
        }
    }
}
