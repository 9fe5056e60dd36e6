//! Unverified bearer-token claims.
//!
//! Reads the `exp` claim out of a JWT-shaped token without checking its
//! signature. The result is only good for cosmetic decisions such as hiding
//! admin links ahead of time. Whether a token is actually valid is decided by
//! the backend, through the profile check in [`crate::session`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<f64>,
}

/// Read the expiry claim of `token`, if it has one.
///
/// Returns `None` for opaque tokens, malformed payloads, and tokens without
/// `exp`.
pub fn peek_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&bytes).ok()?;
    let exp = claim.exp?;
    if !exp.is_finite() {
        return None;
    }
    DateTime::from_timestamp(exp as i64, 0)
}

/// Whether the token's own claim says it expired before `now`.
///
/// Tokens without a readable expiry are reported as not expired: the UI
/// stays optimistic and the backend gets the final word.
pub fn appears_expired(token: &str, now: DateTime<Utc>) -> bool {
    peek_expiry(token).is_some_and(|exp| exp <= now)
}
