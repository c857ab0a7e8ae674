//! Challenge Middleware (C7, §4.7): extracts the bearer token, runs §4.6 validation, and attaches
//! a [`ValidatedRequest`] extension or answers with a 401 challenge.

use crate::resource::ResourceState;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
/// `WWW-Authenticate: Bearer as_uri="...", realm="..."[, error="..."]` (§4.7).
#[must_use]
pub fn challenge_header(as_uri: &str, realm: &str, error: Option<&str>) -> HeaderValue {
    let value = match error {
        Some(e) => format!(r#"Bearer as_uri="{as_uri}", realm="{realm}", error="{e}""#),
        None => format!(r#"Bearer as_uri="{as_uri}", realm="{realm}""#),
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("Bearer"))
}

fn unauthorized(state: &ResourceState, error: Option<&str>) -> Response {
    let mut resp = StatusCode::UNAUTHORIZED.into_response();
    resp.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        challenge_header(&state.authorization_server_uri, &state.realm, error),
    );
    resp
}

fn extract_bearer(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Runs the §4.7 state machine: missing/malformed header → `invalid_token`; otherwise defers to
/// §4.6 and maps its error to the matching `error=` value.
pub async fn enforce(
    State(state): State<ResourceState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_bearer(&req) else {
        return unauthorized(&state, Some("invalid_token"));
    };
    let token = token.to_string();

    let method = req.method().as_str().to_string();
    let resource = format!(
        "{}{}",
        state.realm.trim_end_matches('/'),
        req.uri().path()
    );

    match state.validator.validate(&token, &method, &resource).await {
        Ok(validated) => {
            req.extensions_mut().insert(validated);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!(error = e.code(), "access token validation failed");
            unauthorized(&state, Some(e.challenge_error()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_without_error() {
        let h = challenge_header("https://as.example", "https://storage.example", None);
        assert_eq!(
            h.to_str().unwrap(),
            r#"Bearer as_uri="https://as.example", realm="https://storage.example""#
        );
    }

    #[test]
    fn header_with_error() {
        let h = challenge_header("https://as.example", "https://storage.example", Some("token_replay"));
        assert_eq!(
            h.to_str().unwrap(),
            r#"Bearer as_uri="https://as.example", realm="https://storage.example", error="token_replay""#
        );
    }
}
