//! Minimal JWT inspection
//!
//! Only the `exp` claim is read, to warn about expired tokens before they
//! are sent anywhere. Signatures are not verified here; the motley_cue
//! service does that.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Expiry (`exp`, seconds since epoch) of a JWT, or `None` when the token
/// is not a JWT or carries no expiry.
pub fn expires_at(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    claims.exp
}

/// Seconds until the token expires (negative once expired)
pub fn seconds_left(token: &str, now: i64) -> Option<i64> {
    expires_at(token).map(|exp| exp - now)
}

/// Current time in seconds since the epoch
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) fn make_token(claims: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims);
    format!("{}.{}.sig", header, payload)
}
