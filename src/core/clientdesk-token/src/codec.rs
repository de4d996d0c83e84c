//! Payload segment decoding.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::{Map, Value};
use tracing::debug;

/// Decoded payload claims, keyed by claim name.
pub type Claims = Map<String, Value>;

/// Decodes the payload segment of `token` without verifying it.
///
/// Returns `None` when the token has no second segment, the segment is not
/// base64 (URL-safe or standard alphabet, padding optional), or the bytes
/// are not a JSON object.
pub fn decode(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1)?;
    let bytes = decode_segment(payload)?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Some(claims),
        Ok(_) => {
            debug!("Token payload is not a JSON object");
            None
        },
        Err(e) => {
            debug!(error = %e, "Token payload is not valid JSON");
            None
        },
    }
}

/// Returns the `exp` claim in epoch seconds, if it is a number.
pub fn expires_at(claims: &Claims) -> Option<f64> {
    claims.get("exp").and_then(Value::as_f64)
}

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let trimmed = segment.trim_end_matches('=');
    if trimmed.is_empty() {
        return None;
    }

    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| debug!(error = %e, "Token payload is not base64"))
        .ok()
}
