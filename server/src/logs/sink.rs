//! Log Sinks
//!
//! `PgLogSink` writes to the `usage_logs`/`error_logs` tables. `MemoryLogSink`
//! keeps rows in process and is used when no database is configured.

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;
use tracing::info;

use super::queries;
use super::types::{ErrorLogRow, LogError, UsageLogRow};

/// Append-only destination for usage and error rows.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append_usage(&self, row: UsageLogRow) -> Result<(), LogError>;

    async fn append_error(&self, row: ErrorLogRow) -> Result<(), LogError>;

    /// Backend name reported by the health check.
    fn backend(&self) -> &'static str;
}

/// `PostgreSQL`-backed log sink.
#[derive(Clone)]
pub struct PgLogSink {
    pool: PgPool,
}

impl PgLogSink {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogSink for PgLogSink {
    async fn append_usage(&self, row: UsageLogRow) -> Result<(), LogError> {
        queries::insert_usage_log(&self.pool, &row.user_id, &row.query, &row.event_ts).await?;
        Ok(())
    }

    async fn append_error(&self, row: ErrorLogRow) -> Result<(), LogError> {
        queries::insert_error_log(&self.pool, &row.message).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// In-process log sink. Rows are also emitted as `info` events so they are
/// not lost when no database is configured.
#[derive(Default)]
pub struct MemoryLogSink {
    usage: Mutex<Vec<UsageLogRow>>,
    errors: Mutex<Vec<ErrorLogRow>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the usage rows appended so far.
    pub async fn usage_rows(&self) -> Vec<UsageLogRow> {
        self.usage.lock().await.clone()
    }

    /// Snapshot of the error rows appended so far.
    pub async fn error_rows(&self) -> Vec<ErrorLogRow> {
        self.errors.lock().await.clone()
    }
}

#[async_trait]
impl LogSink for MemoryLogSink {
    async fn append_usage(&self, row: UsageLogRow) -> Result<(), LogError> {
        info!(user_id = %row.user_id, query = %row.query, event_ts = %row.event_ts, "usage log");
        self.usage.lock().await.push(row);
        Ok(())
    }

    async fn append_error(&self, row: ErrorLogRow) -> Result<(), LogError> {
        info!(error_message = %row.message, "error log");
        self.errors.lock().await.push(row);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
