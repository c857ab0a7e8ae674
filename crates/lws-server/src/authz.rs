//! HTTP surface of the authorization server (§6): token exchange plus discovery metadata.

use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use lws_core::{GRANT_TYPE_TOKEN_EXCHANGE, TOKEN_TYPE_ID_TOKEN, TOKEN_TYPE_JWT};
use lws_exchange::{TokenExchangeHandler, TokenExchangeRequest};
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthzState {
    pub realm: String,
    pub authorization_server_uri: String,
    pub handler: Arc<TokenExchangeHandler>,
    pub jwks_json: Arc<serde_json::Value>,
}

pub fn router(state: AuthzState) -> Router {
    Router::new()
        .route("/token", post(token))
        .route("/.well-known/lws-configuration", get(well_known_config))
        .route("/jwks", get(jwks))
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    error_description: String,
}

async fn token(State(state): State<AuthzState>, Form(req): Form<TokenExchangeRequest>) -> Response {
    match state.handler.exchange(&req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            let status = match e.oauth_error() {
                "invalid_request" | "invalid_grant" | "unsupported_token_type" => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.oauth_error(),
                    error_description: e.description().to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
struct WellKnownConfig {
    issuer: String,
    token_endpoint: String,
    jwks_uri: String,
    grant_types_supported: Vec<&'static str>,
    subject_token_types_supported: Vec<&'static str>,
}

async fn well_known_config(State(state): State<AuthzState>) -> Response {
    let base = state.authorization_server_uri.trim_end_matches('/');
    Json(WellKnownConfig {
        issuer: state.realm.clone(),
        token_endpoint: format!("{base}/token"),
        jwks_uri: format!("{base}/jwks"),
        grant_types_supported: vec![GRANT_TYPE_TOKEN_EXCHANGE],
        subject_token_types_supported: vec![TOKEN_TYPE_ID_TOKEN, TOKEN_TYPE_JWT],
    })
    .into_response()
}

async fn jwks(State(state): State<AuthzState>) -> Response {
    Json((*state.jwks_json).clone()).into_response()
}
