//! Request Validation
//!
//! Classifies a parsed envelope before any side effect happens.

use super::types::{EventCallback, InboundEvent, EVENT_CALLBACK, URL_VERIFICATION};

/// Plain-text body returned for a token mismatch.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid verification token.";

/// Outcome of validating an inbound envelope.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Subscription handshake; respond with the challenge verbatim.
    Challenge(String),
    /// Token does not match the configured verification token.
    InvalidToken,
    /// Authenticated event to dispatch.
    Accepted(EventCallback),
    /// Envelope type this endpoint does not handle.
    Ignored,
}

/// Validate an envelope against the configured verification token.
///
/// The handshake is answered regardless of token. Every other payload must
/// carry the token as a string, whatever its `type` or shape. The comparison
/// is a plain equality: the token is a static shared value, not a signature.
pub fn validate(inbound: InboundEvent, verification_token: &str) -> Verdict {
    if inbound.kind() == Some(URL_VERIFICATION) {
        return Verdict::Challenge(inbound.challenge_text());
    }

    if inbound.token() != Some(verification_token) {
        return Verdict::InvalidToken;
    }

    match inbound.kind() {
        Some(EVENT_CALLBACK) => Verdict::Accepted(inbound.into_callback()),
        _ => Verdict::Ignored,
    }
}
