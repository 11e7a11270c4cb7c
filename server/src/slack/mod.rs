//! Slack Integration
//!
//! Block Kit layouts, the Web API client used for replies and status updates,
//! and verification of Slack request signatures.

pub mod blocks;
pub mod client;
pub mod signing;

pub use blocks::MessageLayout;
pub use client::{SlackClient, SlackError};
