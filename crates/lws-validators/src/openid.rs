//! OpenID `id_token` validator (§4.4 suite "openid"). JWKS discovery/fetch/cache is grounded on
//! the same discovery-then-fetch-then-cache shape used for other OIDC-backed verifiers in this
//! codebase, generalized to the full alg set and the self-issued/third-party disambiguation
//! `azp` vs `client_id` from §9.

use crate::common;
use crate::jwk;
use lws_core::{AuthSuite, Jwk, Principal, ValidatorError};
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_REFRESH_AFTER: Duration = Duration::from_secs(600);
const DEFAULT_SKEW_SECS: i64 = 60;

#[derive(Deserialize)]
struct OidcDiscovery {
    jwks_uri: String,
}

#[derive(Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Default)]
struct JwksCache {
    next_refresh_after: Option<Instant>,
    last_refresh_attempt: Option<Instant>,
    keys_by_kid: HashMap<String, Jwk>,
}

/// Validates OpenID `id_token`s for a single configured issuer (§4.4).
///
/// `azp` (not `client_id`) carries the relying-party identifier in this suite, per §9's fixed
/// ambiguity resolution — `id_token`s are issued to a client on a user's behalf, and `azp` is the
/// claim OIDC core reserves for "who this token was authorized for".
pub struct OpenIdValidator {
    issuer: String,
    jwks_uri: String,
    http: reqwest::Client,
    skew_secs: i64,
    cache: RwLock<JwksCache>,
}

impl OpenIdValidator {
    #[must_use]
    pub fn new(issuer: String, jwks_uri: String, http: reqwest::Client) -> Self {
        Self {
            issuer,
            jwks_uri,
            http,
            skew_secs: DEFAULT_SKEW_SECS,
            cache: RwLock::new(JwksCache::default()),
        }
    }

    /// Resolves `jwks_uri` from `{issuer}/.well-known/openid-configuration` discovery (§4.4).
    ///
    /// # Errors
    /// Returns an error if discovery fails or the document carries no `jwks_uri`.
    pub async fn discover(issuer: String, http: reqwest::Client) -> anyhow::Result<Self> {
        let trimmed = issuer.trim_end_matches('/');
        let url = format!("{trimmed}/.well-known/openid-configuration");
        let doc: OidcDiscovery = http.get(&url).send().await?.error_for_status()?.json().await?;
        anyhow::ensure!(!doc.jwks_uri.trim().is_empty(), "discovery returned empty jwks_uri");
        Ok(Self::new(issuer, doc.jwks_uri, http))
    }

    #[must_use]
    pub fn token_type_uri(&self) -> &'static str {
        lws_core::TOKEN_TYPE_ID_TOKEN
    }

    /// Validates an `id_token` and produces a [`Principal`] bound to `realm` (§4.4, §4.5).
    pub async fn validate(&self, token: &str, realm: &str) -> Result<Principal, ValidatorError> {
        let parts = common::parse(token)?;
        common::reject_alg_none(&parts.header)?;

        let alg = parts
            .header
            .get("alg")
            .and_then(|v| v.as_str())
            .ok_or(ValidatorError::Malformed)?;
        let kid = parts.header.get("kid").and_then(|v| v.as_str());

        let sub = common::required_string(&parts.claims, "sub")
            .ok_or(ValidatorError::MissingClaim("sub"))?
            .to_string();
        let iss = common::required_string(&parts.claims, "iss")
            .ok_or(ValidatorError::MissingClaim("iss"))?
            .to_string();
        let azp = common::required_string(&parts.claims, "azp")
            .ok_or(ValidatorError::MissingClaim("azp"))?
            .to_string();

        if iss != self.issuer {
            return Err(ValidatorError::InvalidIssuer);
        }
        if !common::audience_contains_realm(&parts.claims, realm) {
            return Err(ValidatorError::InvalidAudience);
        }
        common::check_temporal_claims(&parts.claims, self.skew_secs, common::now_unix())?;

        let signing_input = format!("{}.{}", parts.header_b64, parts.payload_b64);
        let key = self.resolve_key(kid).await?;
        jwk::verify_signature(&key, alg, &signing_input, parts.signature_b64)?;

        let jti = common::required_string(&parts.claims, "jti")
            .map(str::to_string)
            .unwrap_or_default();

        Ok(Principal {
            subject: sub,
            issuer: iss,
            client_id: azp,
            auth_suite: AuthSuite::Openid,
            subject_token_id: jti,
        })
    }

    /// Resolves the verification key for `kid` (§4.4 table). When `kid` is absent, falls back to
    /// the sole entry in the cached JWKS, per the "optional if only one key" rule — erroring if
    /// the JWKS holds zero or more than one candidate.
    async fn resolve_key(&self, kid: Option<&str>) -> Result<Jwk, ValidatorError> {
        if let Some(kid) = kid {
            if let Some(key) = self.cache.read().keys_by_kid.get(kid).cloned() {
                return Ok(key);
            }
            self.refresh(Some(kid)).await;
            return self
                .cache
                .read()
                .keys_by_kid
                .get(kid)
                .cloned()
                .ok_or_else(|| ValidatorError::KeyNotFound(kid.to_string()));
        }

        if let Some(key) = self.sole_cached_key()? {
            return Ok(key);
        }
        self.refresh(None).await;
        self.sole_cached_key()?.ok_or_else(|| ValidatorError::KeyNotFound("no kid in token and jwks is empty".to_string()))
    }

    /// Returns the single cached key, or `None` if the cache hasn't been populated yet.
    /// Errors if more than one key is cached, since there is then no way to pick one without `kid`.
    fn sole_cached_key(&self) -> Result<Option<Jwk>, ValidatorError> {
        let cache = self.cache.read();
        match cache.keys_by_kid.len() {
            0 => Ok(None),
            1 => Ok(cache.keys_by_kid.values().next().cloned()),
            _ => Err(ValidatorError::KeyNotFound(
                "no kid in token and jwks has multiple keys".to_string(),
            )),
        }
    }

    async fn refresh(&self, maybe_kid: Option<&str>) {
        let now = Instant::now();
        {
            let cache = self.cache.read();
            let stale = cache.next_refresh_after.is_none_or(|t| now >= t);
            let missing = maybe_kid.is_some_and(|kid| !cache.keys_by_kid.contains_key(kid));
            if !stale && !missing {
                return;
            }
            if let Some(last) = cache.last_refresh_attempt
                && now.duration_since(last) < MIN_REFRESH_INTERVAL
            {
                return;
            }
        }
        self.cache.write().last_refresh_attempt = Some(now);

        let resp = match self.http.get(&self.jwks_uri).send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(issuer = %self.issuer, error = %e, "jwks fetch failed");
                return;
            }
        };
        let resp = match resp.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(issuer = %self.issuer, error = %e, "jwks endpoint returned an error status");
                return;
            }
        };
        let jwks = match resp.json::<JwksResponse>().await {
            Ok(jwks) => jwks,
            Err(e) => {
                tracing::warn!(issuer = %self.issuer, error = %e, "jwks response failed to parse");
                return;
            }
        };

        let mut by_kid = HashMap::new();
        for key in jwks.keys {
            if let Some(kid) = key.kid.clone() {
                by_kid.insert(kid, key);
            }
        }

        let mut cache = self.cache.write();
        cache.keys_by_kid = by_kid;
        cache.next_refresh_after = Some(now + DEFAULT_REFRESH_AFTER);
    }
}

/// Recognized JWS algorithms for OpenID `id_token`s (RS/PS/ES/EdDSA; no `none`, no HMAC).
#[must_use]
pub fn supported_algorithm(alg: &str) -> bool {
    matches!(
        alg,
        "RS256" | "RS384" | "RS512" | "PS256" | "PS384" | "PS512" | "ES256" | "ES384" | "EdDSA"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use ed25519_dalek::Signer as _;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn discovery_and_refresh_populate_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jwks_uri": format!("{}/jwks", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [{ "kty": "RSA", "kid": "k1", "n": "abc", "e": "AQAB" }]
            })))
            .mount(&server)
            .await;

        let validator = OpenIdValidator::discover(server.uri(), reqwest::Client::new())
            .await
            .expect("discovery succeeds");
        validator.refresh(Some("k1")).await;
        assert!(validator.cache.read().keys_by_kid.contains_key("k1"));
    }

    fn sign_token(signing_key: &ed25519_dalek::SigningKey, kid: &str, claims: serde_json::Value) -> String {
        let header = json!({ "alg": "EdDSA", "kid": kid });
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature = signing_key.sign(signing_input.as_bytes());
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
    }

    async fn setup() -> (OpenIdValidator, ed25519_dalek::SigningKey, MockServer) {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jwks_uri": format!("{}/jwks", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "keys": [{
                    "kty": "OKP",
                    "crv": "Ed25519",
                    "kid": "k1",
                    "x": URL_SAFE_NO_PAD.encode(verifying_key.to_bytes()),
                }]
            })))
            .mount(&server)
            .await;

        let validator = OpenIdValidator::discover(server.uri(), reqwest::Client::new())
            .await
            .expect("discovery succeeds");
        (validator, signing_key, server)
    }

    #[tokio::test]
    async fn rejects_missing_azp() {
        let (validator, signing_key, _server) = setup().await;
        let now = common::now_unix();
        let token = sign_token(
            &signing_key,
            "k1",
            json!({
                "sub": "alice",
                "iss": validator.issuer.clone(),
                "aud": "http://localhost:3001/storage",
                "iat": now,
                "exp": now + 300,
                "jti": "11111111-1111-1111-1111-111111111111",
            }),
        );

        let err = validator
            .validate(&token, "http://localhost:3001/storage")
            .await
            .unwrap_err();
        assert_eq!(err, ValidatorError::MissingClaim("azp"));
    }

    #[tokio::test]
    async fn accepts_missing_kid_with_single_key_jwks() {
        let (validator, signing_key, _server) = setup().await;
        let now = common::now_unix();
        let header = json!({ "alg": "EdDSA" });
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
        let claims = json!({
            "sub": "alice",
            "iss": validator.issuer.clone(),
            "aud": "http://localhost:3001/storage",
            "azp": "https://client",
            "iat": now,
            "exp": now + 300,
            "jti": "22222222-2222-2222-2222-222222222222",
        });
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature = signing_key.sign(signing_input.as_bytes());
        let token = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()));

        let principal = validator
            .validate(&token, "http://localhost:3001/storage")
            .await
            .expect("kid-less token validates against a single-key jwks");
        assert_eq!(principal.subject, "alice");
        assert_eq!(principal.client_id, "https://client");
    }
}
