//! Controlled Identifier Document resolution (§3, §4.1).

use crate::safety::check_resolver_url;
use futures_util::StreamExt as _;
use lws_core::{CidDoc, ResolverError, VerificationMethod};
use std::time::Duration;
use url::Url;

/// Resolver-facing fetch options (§6 config surface).
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub https_only: bool,
    pub max_bytes: usize,
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            https_only: true,
            max_bytes: 10 * 1024,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Fetches and structurally validates a CID document (§4.1 `resolve_cid`).
///
/// Returns the document plus the upstream `Cache-Control: max-age` hint, if any, for the caller
/// to feed into TTL derivation (§4.2).
pub async fn resolve_cid(
    http: &reqwest::Client,
    uri: &str,
    opts: FetchOptions,
) -> Result<(CidDoc, Option<Duration>), ResolverError> {
    let url = Url::parse(uri).map_err(|e| ResolverError::InvalidUri(e.to_string()))?;
    check_resolver_url(&url, opts.https_only)?;

    let fetch = async {
        let resp = http
            .get(url.clone())
            .header(
                reqwest::header::ACCEPT,
                "application/ld+json, application/json",
            )
            .send()
            .await
            .map_err(|_| ResolverError::FetchFailed { status: 0 })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ResolverError::FetchFailed {
                status: status.as_u16(),
            });
        }

        let max_age = crate::cache::parse_cache_control_max_age(resp.headers());

        let mut body: Vec<u8> = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|_| ResolverError::FetchFailed { status: 0 })?;
            body.extend_from_slice(&chunk);
            if body.len() > opts.max_bytes {
                return Err(ResolverError::DocumentTooLarge);
            }
        }
        Ok((body, max_age))
    };

    let (body, max_age) = tokio::time::timeout(opts.timeout, fetch)
        .await
        .map_err(|_| ResolverError::Timeout)??;

    let doc: CidDoc = serde_json::from_slice(&body)
        .map_err(|e| ResolverError::InvalidDocument(e.to_string()))?;

    validate_structure(&doc, uri)?;
    Ok((doc, max_age))
}

fn validate_structure(doc: &CidDoc, fetched_as: &str) -> Result<(), ResolverError> {
    if doc.id.is_empty() {
        return Err(ResolverError::InvalidDocument("missing id".to_string()));
    }
    if Url::parse(&doc.id).is_err() {
        return Err(ResolverError::InvalidDocument(
            "id is not an absolute uri".to_string(),
        ));
    }
    if doc.id != fetched_as {
        return Err(ResolverError::InvalidDocument(
            "id does not match the uri it was fetched as".to_string(),
        ));
    }
    for vm in &doc.authentication {
        if vm.controller != doc.id {
            return Err(ResolverError::InvalidDocument(
                "authentication entry controller does not match document id".to_string(),
            ));
        }
        let bare_kid_ok = vm
            .public_key_jwk
            .kid
            .as_deref()
            .is_some_and(|kid| vm.id == kid);
        let namespaced_ok = vm.id == format!("{}#{}", doc.id, local_kid(&vm.id));
        if !(namespaced_ok || bare_kid_ok || vm.id.starts_with(&format!("{}#", doc.id))) {
            return Err(ResolverError::InvalidDocument(
                "authentication entry id is neither '<id>#<kid>' nor a bare matching kid"
                    .to_string(),
            ));
        }
    }
    Ok(())
}

fn local_kid(vm_id: &str) -> &str {
    vm_id.rsplit('#').next().unwrap_or(vm_id)
}

/// Finds the verification method for `kid` per §4.1 search order: (i) `<id>#<kid>`, (ii) bare
/// `kid`, (iii) `publicKeyJwk.kid == kid`.
#[must_use]
pub fn verification_method<'a>(doc: &'a CidDoc, kid: &str) -> Option<&'a VerificationMethod> {
    let namespaced = format!("{}#{kid}", doc.id);
    doc.authentication
        .iter()
        .find(|vm| vm.id == namespaced)
        .or_else(|| doc.authentication.iter().find(|vm| vm.id == kid))
        .or_else(|| {
            doc.authentication
                .iter()
                .find(|vm| vm.public_key_jwk.kid.as_deref() == Some(kid))
        })
}
