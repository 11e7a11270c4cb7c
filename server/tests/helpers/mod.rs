//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router. Slack and WordPress are replaced by `httpmock` servers; dedupe and
//! logs use the in-memory stores so assertions can inspect them directly.
//!
//! ## Payloads
//!
//! Use [`message_payload`], [`thread_summary_payload`], and
//! [`thread_started_payload`] to build Events API envelopes.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use httpmock::MockServer;
use serde_json::{json, Value};
use tower::ServiceExt;

use searchbot_server::api::{build_http_client, create_router, AppState, AppStateConfig};
use searchbot_server::config::Config;
use searchbot_server::events::MemoryDedupeStore;
use searchbot_server::logs::MemoryLogSink;

/// Verification token configured for every test app.
pub const TOKEN: &str = "test-verification-token";

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub config: Arc<Config>,
    pub dedupe: Arc<MemoryDedupeStore>,
    pub logs: Arc<MemoryLogSink>,
    /// Stands in for `https://slack.com/api` (mounted at `/api`).
    pub slack: MockServer,
    /// Stands in for the WordPress site.
    pub wp: MockServer,
}

impl TestApp {
    /// Create a test app with the default test config.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test app after adjusting the default test config.
    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let slack = MockServer::start_async().await;
        let wp = MockServer::start_async().await;

        let mut config = Config::default_for_test();
        config.slack_api_base_url = slack.url("/api");
        config.wp_base_url = wp.base_url();
        adjust(&mut config);

        let dedupe = Arc::new(MemoryDedupeStore::new(Duration::from_secs(
            config.dedupe_ttl_secs,
        )));
        let logs = Arc::new(MemoryLogSink::new());
        let http = build_http_client(&config).expect("Failed to build HTTP client");

        let state = AppState::new(AppStateConfig {
            config: config.clone(),
            http,
            dedupe: dedupe.clone(),
            logs: logs.clone(),
        });
        let router = create_router(state);

        Self {
            router,
            config: Arc::new(config),
            dedupe,
            logs,
            slack,
            wp,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// POST a JSON payload to `/slack/events`.
    pub async fn post_event(&self, payload: &Value) -> Response<Body> {
        let req = Self::request(Method::POST, "/slack/events")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        self.oneshot(req).await
    }

    /// POST raw bytes to `/slack/events` with extra headers.
    pub async fn post_raw(&self, body: &str, headers: &[(&str, &str)]) -> Response<Body> {
        let mut builder = Self::request(Method::POST, "/slack/events")
            .header("Content-Type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }
}

/// Collect a response body as UTF-8 text.
pub async fn body_to_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}

// ============================================================================
// Payload builders
// ============================================================================

/// Wrap an inner event in an `event_callback` envelope.
pub fn callback(token: &str, event_id: &str, event: Value) -> Value {
    json!({
        "token": token,
        "team_id": "T1",
        "api_app_id": "A1",
        "type": "event_callback",
        "event_id": event_id,
        "event_time": 1_700_000_000,
        "event": event,
    })
}

/// A user message inside an assistant thread.
pub fn message_payload(event_id: &str, text: &str, event_ts: &str) -> Value {
    callback(
        TOKEN,
        event_id,
        json!({
            "type": "message",
            "channel": "D1",
            "user": "U1",
            "text": text,
            "ts": event_ts,
            "thread_ts": "100.000",
            "event_ts": event_ts,
            "channel_type": "im",
        }),
    )
}

/// A thread summary update carrying the assistant thread title.
pub fn thread_summary_payload(event_id: &str, title: &str, latest_reply: &str) -> Value {
    callback(
        TOKEN,
        event_id,
        json!({
            "type": "message",
            "subtype": "message_changed",
            "channel": "D1",
            "message": {
                "ts": "100.000",
                "reply_users": ["U1"],
                "reply_users_count": 1,
                "latest_reply": latest_reply,
                "assistant_app_thread": {"title": title},
            },
            "event_ts": latest_reply,
        }),
    )
}

/// A new assistant thread.
pub fn thread_started_payload(event_id: &str, thread_ts: &str) -> Value {
    callback(
        TOKEN,
        event_id,
        json!({
            "type": "assistant_thread_started",
            "assistant_thread": {
                "user_id": "U1",
                "context": {"channel_id": "C9", "team_id": "T1"},
                "channel_id": "D1",
                "thread_ts": thread_ts,
            },
            "event_ts": thread_ts,
        }),
    )
}

/// The `attachments` string Slack should receive for `layout`.
pub fn attachments_for(layout: searchbot_server::slack::MessageLayout) -> String {
    serde_json::to_string(&[layout.into_attachment()]).expect("serialize attachments")
}
