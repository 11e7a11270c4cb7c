//! Usage & Error Logs
//!
//! Append-only log rows recorded per handled event. Rows are never read back
//! by the handler.

pub mod queries;
pub mod sink;
pub mod types;

pub use sink::{LogSink, MemoryLogSink, PgLogSink};
pub use types::{ErrorLogRow, LogError, UsageLogRow};
