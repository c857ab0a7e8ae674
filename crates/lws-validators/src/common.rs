//! Pre-checks shared by every subject-token validator (§4.4 "Common pre-checks").

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use lws_core::ValidatorError;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct JwtParts<'a> {
    pub header_b64: &'a str,
    pub payload_b64: &'a str,
    pub signature_b64: &'a str,
    pub header: Value,
    pub claims: Value,
}

/// Splits, base64url-decodes and JSON-parses a JWT's header and payload. Fails `Malformed` if
/// the token is not exactly three base64url segments.
pub fn parse(token: &str) -> Result<JwtParts<'_>, ValidatorError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(ValidatorError::Malformed)?;
    let payload_b64 = parts.next().ok_or(ValidatorError::Malformed)?;
    let signature_b64 = parts.next().ok_or(ValidatorError::Malformed)?;
    if parts.next().is_some() {
        return Err(ValidatorError::Malformed);
    }
    if header_b64.is_empty() || payload_b64.is_empty() {
        return Err(ValidatorError::Malformed);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| ValidatorError::Malformed)?;
    let header: Value =
        serde_json::from_slice(&header_bytes).map_err(|_| ValidatorError::Malformed)?;

    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| ValidatorError::Malformed)?;
    let claims: Value =
        serde_json::from_slice(&payload_bytes).map_err(|_| ValidatorError::Malformed)?;

    if !header.is_object() || !claims.is_object() {
        return Err(ValidatorError::Malformed);
    }

    Ok(JwtParts {
        header_b64,
        payload_b64,
        signature_b64,
        header,
        claims,
    })
}

/// Rejects `alg: "none"` unconditionally, independent of whitespace/case (§4.4, §8).
pub fn reject_alg_none(header: &Value) -> Result<(), ValidatorError> {
    let alg = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or(ValidatorError::Malformed)?;
    if alg.trim().eq_ignore_ascii_case("none") {
        return Err(ValidatorError::DisallowedAlg);
    }
    Ok(())
}

#[must_use]
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Validates the `iat`/`exp` temporal claims common to every suite (§4.4).
pub fn check_temporal_claims(claims: &Value, skew_secs: i64, now: i64) -> Result<(), ValidatorError> {
    let iat = claims
        .get("iat")
        .and_then(Value::as_i64)
        .ok_or(ValidatorError::MissingClaim("iat"))?;
    let exp = claims
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or(ValidatorError::MissingClaim("exp"))?;

    if exp <= now - skew_secs {
        return Err(ValidatorError::TokenExpired);
    }
    if iat > now + skew_secs {
        return Err(ValidatorError::InvalidIat);
    }
    Ok(())
}

/// The `aud` claim must contain the realm: equal if a string, an element if an array (§4.4).
#[must_use]
pub fn audience_contains_realm(claims: &Value, realm: &str) -> bool {
    match claims.get("aud") {
        Some(Value::String(s)) => s == realm,
        Some(Value::Array(items)) => items.iter().any(|v| v.as_str() == Some(realm)),
        _ => false,
    }
}

#[must_use]
pub fn required_string<'a>(claims: &'a Value, key: &'static str) -> Option<&'a str> {
    claims.get(key).and_then(Value::as_str)
}
