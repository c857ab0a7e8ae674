//! Caches the authorization server's JWKS (§4.6 step 2), keyed by realm. Reuses the §4.2 document
//! cache abstraction instead of inventing a second caching story.

use lws_resolver::cache::{DocumentCache, derive_cid_ttl, parse_cache_control_max_age};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
struct JwksResponse {
    keys: Vec<lws_core::Jwk>,
}

pub struct RealmJwks {
    http: reqwest::Client,
    cache: Arc<dyn DocumentCache>,
    ttl: Duration,
}

impl RealmJwks {
    #[must_use]
    pub fn new(http: reqwest::Client, cache: Arc<dyn DocumentCache>, default_ttl: Duration) -> Self {
        Self {
            http,
            cache,
            ttl: default_ttl,
        }
    }

    /// Returns the key matching `kid` from `jwks_uri`, consulting the cache before fetching.
    pub async fn key_for(&self, jwks_uri: &str, kid: &str) -> Option<lws_core::Jwk> {
        if let Some(cached) = self.cache.get(jwks_uri).await
            && let Ok(jwks) = serde_json::from_slice::<JwksResponse>(&cached)
            && let Some(key) = jwks.keys.into_iter().find(|k| k.kid.as_deref() == Some(kid))
        {
            return Some(key);
        }

        let resp = self
            .http
            .get(jwks_uri)
            .send()
            .await
            .inspect_err(|e| tracing::warn!(jwks_uri, error = %e, "jwks fetch failed"))
            .ok()?
            .error_for_status()
            .inspect_err(|e| tracing::warn!(jwks_uri, error = %e, "jwks endpoint returned an error status"))
            .ok()?;
        let max_age = parse_cache_control_max_age(resp.headers());
        let bytes = resp.bytes().await.ok()?.to_vec();
        let jwks: JwksResponse = serde_json::from_slice(&bytes)
            .inspect_err(|e| tracing::warn!(jwks_uri, error = %e, "jwks response failed to parse"))
            .ok()?;

        let ttl = derive_cid_ttl(max_age, Duration::from_secs(30), self.ttl, self.ttl);
        self.cache.put(jwks_uri, bytes, ttl).await;

        jwks.keys.into_iter().find(|k| k.kid.as_deref() == Some(kid))
    }
}
