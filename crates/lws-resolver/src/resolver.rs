//! High-level resolver: ties CID fetch, `did:key` decode, and the document cache together.

use crate::cache::{DocumentCache, derive_cid_ttl};
use crate::cid::{self, FetchOptions};
use crate::did_key;
use lws_core::{CidDoc, Jwk, ResolverError};
use std::sync::Arc;
use std::time::Duration;

/// Bounds used in TTL derivation (§4.2).
#[derive(Debug, Clone, Copy)]
pub struct TtlBounds {
    pub min: Duration,
    pub max: Duration,
    pub default: Duration,
}

pub struct IdentifierResolver {
    http: reqwest::Client,
    cache: Arc<dyn DocumentCache>,
    fetch_opts: FetchOptions,
    ttl: TtlBounds,
}

impl IdentifierResolver {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        cache: Arc<dyn DocumentCache>,
        fetch_opts: FetchOptions,
        ttl: TtlBounds,
    ) -> Self {
        Self {
            http,
            cache,
            fetch_opts,
            ttl,
        }
    }

    /// Resolves a CID document, consulting the cache first (§4.1, §4.2).
    ///
    /// The cache is never authoritative for security: callers must still re-verify signatures
    /// against whatever key material comes back (§4.2).
    pub async fn resolve_cid(&self, uri: &str) -> Result<CidDoc, ResolverError> {
        if let Some(cached) = self.cache.get(uri).await
            && let Ok(doc) = serde_json::from_slice::<CidDoc>(&cached)
        {
            return Ok(doc);
        }

        let (doc, max_age) = cid::resolve_cid(&self.http, uri, self.fetch_opts).await?;
        let ttl = derive_cid_ttl(max_age, self.ttl.min, self.ttl.max, self.ttl.default);
        if let Ok(bytes) = serde_json::to_vec(&doc) {
            self.cache.put(uri, bytes, ttl).await;
        }
        Ok(doc)
    }

    /// Decodes a `did:key` identifier. Pure and uncached (§8).
    pub fn resolve_did_key(&self, did: &str) -> Result<Jwk, ResolverError> {
        did_key::resolve_did_key(did)
    }

    /// Resolves a verification key for `(subject_uri, kid)`: dispatches to CID or `did:key`
    /// resolution depending on the identifier's scheme (§4.1).
    pub async fn resolve_verification_key(
        &self,
        subject_uri: &str,
        kid: &str,
    ) -> Result<Jwk, ResolverError> {
        if subject_uri.starts_with("did:key:") {
            return self.resolve_did_key(subject_uri);
        }

        let doc = self.resolve_cid(subject_uri).await?;
        let vm = cid::verification_method(&doc, kid).ok_or(ResolverError::NoVerificationMethod)?;
        Ok(vm.public_key_jwk.clone())
    }
}
