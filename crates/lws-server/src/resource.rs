//! HTTP surface of the resource server (§6): every path under the realm requires a valid access
//! token (§4.6, enforced by [`crate::challenge::enforce`]); `.well-known` is exempt.

use crate::challenge::{self, challenge_header};
use crate::storage::{self, StorageBackend, StorageError};
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router, middleware};
use lws_access::AccessTokenValidator;
use lws_core::ValidatedRequest;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone)]
pub struct ResourceState {
    pub realm: String,
    pub authorization_server_uri: String,
    pub validator: Arc<AccessTokenValidator>,
    pub backend: Arc<dyn StorageBackend>,
}

pub fn router(state: ResourceState) -> Router {
    let protected = Router::new()
        .route("/{*path}", any(handle_storage_request))
        .route("/", any(handle_storage_request))
        .layer(middleware::from_fn_with_state(state.clone(), challenge::enforce));

    Router::new()
        .route(
            "/.well-known/lws-storage-server",
            axum::routing::get(well_known),
        )
        .merge(protected)
        .with_state(state)
}

#[derive(Serialize)]
struct WellKnown {
    as_uri: String,
    realm: String,
}

async fn well_known(State(state): State<ResourceState>) -> Response {
    let mut resp = Json(WellKnown {
        as_uri: state.authorization_server_uri.clone(),
        realm: state.realm.clone(),
    })
    .into_response();
    resp.headers_mut().insert(
        axum::http::header::WWW_AUTHENTICATE,
        challenge_header(&state.authorization_server_uri, &state.realm, None),
    );
    resp
}

async fn handle_storage_request(
    State(state): State<ResourceState>,
    Extension(validated): Extension<ValidatedRequest>,
    body: axum::body::Bytes,
) -> Response {
    match storage::dispatch(state.backend.as_ref(), &validated, body.to_vec()).await {
        Ok(bytes) => (StatusCode::OK, bytes).into_response(),
        Err(StorageError::NotFound) => StatusCode::NOT_FOUND.into_response(),
        Err(StorageError::AlreadyExists) => StatusCode::CONFLICT.into_response(),
    }
}
