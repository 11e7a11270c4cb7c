//! Slack Request Signing
//!
//! Verifies the `X-Slack-Signature` header: `v0=` followed by the hex
//! HMAC-SHA256 of `v0:{timestamp}:{raw body}` keyed with the app's signing
//! secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Signature scheme version prefix.
const VERSION: &str = "v0";

/// Requests whose timestamp is further than this from now are rejected (replay guard).
pub const MAX_CLOCK_SKEW_SECS: i64 = 60 * 5;

/// Signature verification failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing signature headers")]
    MissingHeaders,
    #[error("Malformed request timestamp")]
    BadTimestamp,
    #[error("Request timestamp outside the allowed window")]
    Stale,
    #[error("Signature mismatch")]
    Mismatch,
}

/// Compute the `v0=<hex>` signature for a request body.
pub fn sign_request(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("{VERSION}={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify a Slack request signature against the raw body.
///
/// `now` is the current Unix time in seconds.
pub fn verify_request(
    secret: &str,
    timestamp: Option<&str>,
    signature: Option<&str>,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
        return Err(SignatureError::MissingHeaders);
    };

    let sent_at: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::BadTimestamp)?;
    if (now - sent_at).abs() > MAX_CLOCK_SKEW_SECS {
        return Err(SignatureError::Stale);
    }

    let expected = sign_request(secret, timestamp.trim(), body);
    // Constant-time comparison
    let matches = expected.len() == signature.len()
        && expected
            .as_bytes()
            .iter()
            .zip(signature.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0;

    if matches {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
