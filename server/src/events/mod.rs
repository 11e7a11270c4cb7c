//! Slack Events API Endpoint
//!
//! Validation, deduplication, and dispatch of inbound event callbacks.

pub mod dedupe;
pub mod handlers;
pub mod types;
pub mod validate;

pub use dedupe::{DedupeError, DedupeStore, MemoryDedupeStore, RedisDedupeStore};
pub use types::{CallbackEvent, EventError, InboundEvent, MessageEvent};
