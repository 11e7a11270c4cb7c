//! Slack Event Handler
//!
//! `POST /slack/events`. Every path ends in `200 OK` with a plain-text body so
//! Slack never redelivers because of a failure that retrying cannot fix.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use tracing::{debug, error, info, instrument, warn};

use super::types::{
    CallbackEvent, EventCallback, EventError, InboundEvent, MessageEvent, SearchRequest,
    ThreadEvent,
};
use super::validate::{validate, Verdict, INVALID_TOKEN_MESSAGE};
use crate::api::AppState;
use crate::logs::{ErrorLogRow, UsageLogRow};
use crate::slack::{blocks, signing};

/// Acknowledgment body for every processed, skipped, or failed event.
pub const ACK_MESSAGE: &str = "OK";

/// Plain-text body returned when the request signature does not verify.
pub const INVALID_SIGNATURE_MESSAGE: &str = "Invalid request signature.";

const SIGNATURE_HEADER: &str = "x-slack-signature";
const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const RETRY_NUM_HEADER: &str = "x-slack-retry-num";

/// How a dispatched event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Greeted,
    Answered,
    Duplicate,
    IgnoredBot,
    Unsupported,
}

fn ack(body: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::OK, body.into())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /slack/events
#[instrument(
    skip(state, headers, body),
    fields(retry_num = header_str(&headers, RETRY_NUM_HEADER))
)]
pub async fn receive_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    if let Some(secret) = state.config.slack_signing_secret.as_deref() {
        if let Err(e) = signing::verify_request(
            secret,
            header_str(&headers, TIMESTAMP_HEADER),
            header_str(&headers, SIGNATURE_HEADER),
            &body,
            chrono::Utc::now().timestamp(),
        ) {
            warn!(error = %e, "Rejected Slack request signature");
            return ack(INVALID_SIGNATURE_MESSAGE);
        }
    }

    // A body that is not JSON carries no token and fails validation below.
    let inbound: InboundEvent = serde_json::from_slice(&body).unwrap_or_else(|e| {
        warn!(error = %e, "Unparseable event payload");
        InboundEvent::default()
    });

    match validate(inbound, &state.config.slack_verification_token) {
        Verdict::Challenge(challenge) => {
            info!("Answering URL verification challenge");
            ack(challenge)
        }
        Verdict::InvalidToken => {
            warn!("Rejected event with invalid verification token");
            ack(INVALID_TOKEN_MESSAGE)
        }
        Verdict::Ignored => {
            debug!("Ignoring unsupported envelope type");
            ack(ACK_MESSAGE)
        }
        Verdict::Accepted(callback) => {
            let event_id = callback.event_id.clone();
            match dispatch(&state, callback).await {
                Ok(outcome) => debug!(event_id = %event_id, ?outcome, "Event handled"),
                Err(e) => {
                    error!(event_id = %event_id, error = %e, "Event handling failed");
                    record_error(&state, &e).await;
                }
            }
            ack(ACK_MESSAGE)
        }
    }
}

/// Decode and route an authenticated event.
async fn dispatch(state: &AppState, callback: EventCallback) -> Result<Outcome, EventError> {
    let EventCallback {
        event_id,
        team_id,
        event,
    } = callback;
    debug!(event_id = %event_id, team_id = ?team_id, "Dispatching event");

    match CallbackEvent::decode(event)? {
        CallbackEvent::AssistantThreadStarted(thread) => greet(state, &event_id, &thread).await,
        CallbackEvent::Message(MessageEvent::Bot { bot_id }) => {
            debug!(bot_id = %bot_id, "Ignoring bot message");
            Ok(Outcome::IgnoredBot)
        }
        CallbackEvent::Message(MessageEvent::TopLevel(message)) => {
            answer(state, &event_id, message.into()).await
        }
        CallbackEvent::Message(MessageEvent::ThreadSummary(summary)) => {
            answer(state, &event_id, summary.into()).await
        }
        CallbackEvent::Unsupported => Ok(Outcome::Unsupported),
    }
}

/// Greet the user in a freshly opened assistant thread.
async fn greet(
    state: &AppState,
    event_id: &str,
    thread: &ThreadEvent,
) -> Result<Outcome, EventError> {
    if state
        .dedupe
        .seen_or_record(&thread.dedupe_key(), event_id)
        .await?
    {
        return Ok(Outcome::Duplicate);
    }

    state
        .slack
        .post_reply(
            blocks::greeting(&thread.user_id),
            &thread.channel_id,
            &thread.thread_ts,
        )
        .await?;

    info!(user_id = %thread.user_id, channel_id = %thread.channel_id, "Greeted new thread");
    Ok(Outcome::Greeted)
}

/// Search for the message text and reply in its thread.
async fn answer(
    state: &AppState,
    event_id: &str,
    request: SearchRequest,
) -> Result<Outcome, EventError> {
    if state
        .dedupe
        .seen_or_record(&request.dedupe_key(), event_id)
        .await?
    {
        return Ok(Outcome::Duplicate);
    }

    if request.show_status {
        if let Err(e) = state
            .slack
            .set_status(&request.channel, &request.thread_ts, &state.config.status_text)
            .await
        {
            // Status is cosmetic; the reply still goes out.
            warn!(channel = %request.channel, error = %e, "Failed to set thread status");
            record_error(state, &e.into()).await;
        }
    }

    let layout = state.search.search_layout(&request.query).await;
    state
        .slack
        .post_reply(layout, &request.channel, &request.thread_ts)
        .await?;

    state
        .logs
        .append_usage(UsageLogRow {
            user_id: request.user_id,
            query: request.query,
            event_ts: request.event_ts,
        })
        .await?;

    Ok(Outcome::Answered)
}

/// Append one error row; a failing log store is only traced.
async fn record_error(state: &AppState, err: &EventError) {
    if let Err(log_err) = state.logs.append_error(ErrorLogRow::new(err.to_string())).await {
        error!(error = %log_err, original = %err, "Failed to append error log");
    }
}
