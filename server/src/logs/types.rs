//! Log Row Types

use thiserror::Error;

/// One successful search: who asked, what, and when (Slack timestamp).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageLogRow {
    pub user_id: String,
    pub query: String,
    pub event_ts: String,
}

/// One failure recorded by the event handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLogRow {
    pub message: String,
}

impl ErrorLogRow {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Log store errors.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
