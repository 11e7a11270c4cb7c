//! Slack Event Types
//!
//! Inbound Events API payloads decoded into explicit variants. The outer
//! envelope is read loosely before authentication; the inner `event` stays raw
//! JSON until the verification token has been checked, then is decoded
//! strictly by [`CallbackEvent::decode`].

use serde::Deserialize;
use thiserror::Error;

use super::dedupe::DedupeError;
use crate::logs::LogError;
use crate::slack::SlackError;

/// Envelope `type` of the subscription handshake.
pub const URL_VERIFICATION: &str = "url_verification";

/// Envelope `type` of a subscribed event delivery.
pub const EVENT_CALLBACK: &str = "event_callback";

/// Top-level Events API payload.
///
/// Every field is read as raw JSON so that a payload of any shape still
/// reaches the token check. Nothing here is trusted until
/// [`validate`](super::validate::validate) has compared the token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type", default)]
    pub kind: serde_json::Value,
    #[serde(default)]
    pub token: serde_json::Value,
    #[serde(default)]
    pub challenge: serde_json::Value,
    #[serde(default)]
    pub event_id: serde_json::Value,
    #[serde(default)]
    pub team_id: serde_json::Value,
    #[serde(default)]
    pub event: serde_json::Value,
}

impl InboundEvent {
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_str()
    }

    /// The verification token, if the payload carries one as a string.
    pub fn token(&self) -> Option<&str> {
        self.token.as_str()
    }

    /// Challenge text to echo back verbatim.
    pub fn challenge_text(&self) -> String {
        match &self.challenge {
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Split out the delivery fields once the token has been accepted.
    pub fn into_callback(self) -> EventCallback {
        EventCallback {
            event_id: self.event_id.as_str().unwrap_or_default().to_string(),
            team_id: self.team_id.as_str().map(str::to_string),
            event: self.event,
        }
    }
}

/// An authenticated `event_callback` delivery.
#[derive(Debug, Clone)]
pub struct EventCallback {
    pub event_id: String,
    pub team_id: Option<String>,
    /// Raw inner event, decoded strictly by [`CallbackEvent::decode`].
    pub event: serde_json::Value,
}

/// A new assistant thread (`assistant_thread_started`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ThreadEvent {
    pub user_id: String,
    pub channel_id: String,
    pub thread_ts: String,
}

impl ThreadEvent {
    pub fn dedupe_key(&self) -> String {
        format!("{}-{}-{}", self.user_id, self.channel_id, self.thread_ts)
    }
}

/// A message typed by a user in a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub channel: String,
    pub user: String,
    pub thread_ts: String,
    pub text: String,
    pub event_ts: String,
}

/// A thread summary update (`message` sub-field present) carrying the
/// assistant thread title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub channel: String,
    pub reply_users: Vec<String>,
    pub reply_users_count: usize,
    pub ts: String,
    pub latest_reply: String,
    pub title: String,
}

impl ThreadSummary {
    /// The most recent replier.
    pub fn user_id(&self) -> &str {
        // Decoding guarantees `reply_users` is non-empty.
        self.reply_users
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// `message` event variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEvent {
    /// Posted by a bot (including this one); never processed.
    Bot { bot_id: String },
    TopLevel(UserMessage),
    ThreadSummary(ThreadSummary),
}

/// Decoded inner event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    AssistantThreadStarted(ThreadEvent),
    Message(MessageEvent),
    Unsupported,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum RawCallbackEvent {
    #[serde(rename = "assistant_thread_started")]
    AssistantThreadStarted { assistant_thread: ThreadEvent },
    #[serde(rename = "message")]
    Message(RawMessageEvent),
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct RawMessageEvent {
    channel: Option<String>,
    bot_id: Option<String>,
    user: Option<String>,
    text: Option<String>,
    ts: Option<String>,
    thread_ts: Option<String>,
    event_ts: Option<String>,
    message: Option<RawThreadSummary>,
}

#[derive(Deserialize)]
struct RawThreadSummary {
    #[serde(default)]
    reply_users: Vec<String>,
    reply_users_count: Option<usize>,
    ts: Option<String>,
    latest_reply: Option<String>,
    assistant_app_thread: Option<RawAppThread>,
}

#[derive(Deserialize)]
struct RawAppThread {
    #[serde(default)]
    title: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, EventError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EventError::UnexpectedShape(format!("missing field `{field}`")))
}

impl CallbackEvent {
    /// Decode the raw inner event. Payloads matching neither known shape are
    /// rejected with [`EventError::UnexpectedShape`].
    pub fn decode(event: serde_json::Value) -> Result<Self, EventError> {
        let raw: RawCallbackEvent = serde_json::from_value(event)
            .map_err(|e| EventError::UnexpectedShape(e.to_string()))?;

        match raw {
            RawCallbackEvent::AssistantThreadStarted { assistant_thread } => {
                Ok(Self::AssistantThreadStarted(assistant_thread))
            }
            RawCallbackEvent::Message(message) => Ok(Self::Message(message.try_into()?)),
            RawCallbackEvent::Other => Ok(Self::Unsupported),
        }
    }
}

impl TryFrom<RawMessageEvent> for MessageEvent {
    type Error = EventError;

    fn try_from(raw: RawMessageEvent) -> Result<Self, Self::Error> {
        if let Some(bot_id) = raw.bot_id {
            return Ok(Self::Bot { bot_id });
        }

        let channel = required(raw.channel, "event.channel")?;

        if let Some(summary) = raw.message {
            let reply_users = summary.reply_users;
            if reply_users.is_empty() {
                return Err(EventError::UnexpectedShape(
                    "empty `event.message.reply_users`".to_string(),
                ));
            }
            return Ok(Self::ThreadSummary(ThreadSummary {
                channel,
                reply_users_count: summary.reply_users_count.unwrap_or(reply_users.len()),
                reply_users,
                ts: required(summary.ts, "event.message.ts")?,
                latest_reply: required(summary.latest_reply, "event.message.latest_reply")?,
                title: summary
                    .assistant_app_thread
                    .and_then(|t| t.title)
                    .unwrap_or_default(),
            }));
        }

        let event_ts = required(raw.event_ts.or_else(|| raw.ts.clone()), "event.event_ts")?;
        Ok(Self::TopLevel(UserMessage {
            channel,
            user: required(raw.user, "event.user")?,
            // Messages outside a thread start one on themselves.
            thread_ts: raw.thread_ts.or(raw.ts).unwrap_or_else(|| event_ts.clone()),
            text: raw.text.unwrap_or_default(),
            event_ts,
        }))
    }
}

/// Everything needed to answer one message with a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub channel: String,
    pub thread_ts: String,
    pub user_id: String,
    /// Search term with surrounding whitespace removed.
    pub query: String,
    /// Slack timestamp recorded in the usage log and used for dedupe.
    pub event_ts: String,
    /// Whether to show the "thinking" thread status while searching.
    pub show_status: bool,
}

impl SearchRequest {
    pub fn dedupe_key(&self) -> String {
        format!("{}-{}-{}", self.channel, self.thread_ts, self.event_ts)
    }
}

impl From<UserMessage> for SearchRequest {
    fn from(message: UserMessage) -> Self {
        Self {
            channel: message.channel,
            thread_ts: message.thread_ts,
            user_id: message.user,
            query: message.text.trim().to_string(),
            event_ts: message.event_ts,
            show_status: false,
        }
    }
}

impl From<ThreadSummary> for SearchRequest {
    fn from(summary: ThreadSummary) -> Self {
        Self {
            user_id: summary.user_id().to_string(),
            channel: summary.channel,
            thread_ts: summary.ts,
            query: summary.title.trim().to_string(),
            event_ts: summary.latest_reply,
            show_status: true,
        }
    }
}

/// Failures while handling an authenticated event. Every variant ends up as
/// one error log row; none changes the HTTP response.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("Unexpected event shape: {0}")]
    UnexpectedShape(String),
    #[error("Dedupe store error: {0}")]
    Dedupe(#[from] DedupeError),
    #[error("{0}")]
    Slack(#[from] SlackError),
    #[error("Log store error: {0}")]
    Log(#[from] LogError),
}
