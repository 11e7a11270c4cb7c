//! Searchbot Server
//!
//! Slack Events API endpoint that answers assistant-thread questions with
//! WordPress search results posted back into the thread.

pub mod api;
pub mod config;
pub mod db;
pub mod events;
pub mod logs;
pub mod observability;
pub mod search;
pub mod slack;
