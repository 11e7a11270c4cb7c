//! Slack Web API Client
//!
//! The two Web API calls the bot makes: thread status updates and threaded
//! replies. Both use bearer auth with the bot token and the shared HTTP client
//! timeout.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

use super::blocks::MessageLayout;

/// Slack Web API errors.
#[derive(Error, Debug)]
pub enum SlackError {
    #[error("Slack request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Slack {method} returned HTTP {status}")]
    Status { method: &'static str, status: u16 },
    #[error("Slack {method} failed: {error}")]
    Api { method: &'static str, error: String },
    #[error("Failed to serialize attachments: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Common envelope of every Web API response.
#[derive(Debug, Deserialize)]
struct SlackApiResponse {
    ok: bool,
    error: Option<String>,
}

/// Slack Web API client bound to one bot token.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(
        http: reqwest::Client,
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        }
    }

    /// Set the assistant thread status line (e.g. "Bot is thinking...").
    #[instrument(skip(self, status))]
    pub async fn set_status(
        &self,
        channel_id: &str,
        thread_ts: &str,
        status: &str,
    ) -> Result<(), SlackError> {
        let body = json!({
            "channel_id": channel_id,
            "thread_ts": thread_ts,
            "status": status,
        });
        self.call("assistant.threads.setStatus", &body).await
    }

    /// Post `layout` as an attachment reply in the given thread.
    ///
    /// Slack receives `attachments` as a JSON-encoded string of a one-element
    /// attachment array.
    #[instrument(skip(self, layout), fields(blocks = layout.len()))]
    pub async fn post_reply(
        &self,
        layout: MessageLayout,
        channel_id: &str,
        thread_ts: &str,
    ) -> Result<(), SlackError> {
        let attachments = serde_json::to_string(&[layout.into_attachment()])?;
        let body = json!({
            "thread_ts": thread_ts,
            "channel": channel_id,
            "unfurl_links": true,
            "attachments": attachments,
        });
        self.call("chat.postMessage", &body).await
    }

    async fn call(&self, method: &'static str, body: &serde_json::Value) -> Result<(), SlackError> {
        let response = self
            .http
            .post(format!("{}/{method}", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SlackError::Status {
                method,
                status: status.as_u16(),
            });
        }

        let parsed: SlackApiResponse = response.json().await?;
        if !parsed.ok {
            return Err(SlackError::Api {
                method,
                error: parsed.error.unwrap_or_else(|| "unknown_error".to_string()),
            });
        }

        debug!(method, "Slack API call succeeded");
        Ok(())
    }
}
