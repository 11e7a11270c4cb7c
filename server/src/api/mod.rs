//! API Router and Application State
//!
//! Central routing configuration and shared state.

use axum::{
    extract::DefaultBodyLimit,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    events::{self, DedupeStore},
    logs::LogSink,
    search::SearchClient,
    slack::SlackClient,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Delivery dedupe markers (Redis or in-memory)
    pub dedupe: Arc<dyn DedupeStore>,
    /// Usage/error log sink (`PostgreSQL` or in-memory)
    pub logs: Arc<dyn LogSink>,
    /// Slack Web API client
    pub slack: SlackClient,
    /// WordPress search client
    pub search: SearchClient,
}

/// Inputs for [`AppState::new`].
pub struct AppStateConfig {
    pub config: Config,
    pub http: reqwest::Client,
    pub dedupe: Arc<dyn DedupeStore>,
    pub logs: Arc<dyn LogSink>,
}

impl AppState {
    /// Create new application state. Outbound clients share `http`.
    #[must_use]
    pub fn new(cfg: AppStateConfig) -> Self {
        let AppStateConfig {
            config,
            http,
            dedupe,
            logs,
        } = cfg;

        let slack = SlackClient::new(
            http.clone(),
            config.slack_api_base_url.clone(),
            config.slack_bot_token.clone(),
        );
        let search = SearchClient::new(
            http,
            config.wp_base_url.clone(),
            config.wp_username.clone(),
            config.wp_password.clone(),
            config.search_logo_url.clone(),
        );

        Self {
            config: Arc::new(config),
            dedupe,
            logs,
            slack,
            search,
        }
    }
}

/// Build the shared outbound HTTP client with the configured timeout.
pub fn build_http_client(config: &Config) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http_timeout())
        .user_agent(concat!("searchbot-server/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Slack Events API request URL
        .route("/slack/events", post(events::handlers::receive_event))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Dedupe backend in use
    dedupe: &'static str,
    /// Log store backend in use
    log_store: &'static str,
    /// Whether request signatures are verified
    signature_verification: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        dedupe: state.dedupe.backend(),
        log_store: state.logs.backend(),
        signature_verification: state.config.has_signing_secret(),
    })
}
