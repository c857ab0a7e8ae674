//! Access-Token Validator (C6, §4.6): the ordered, short-circuiting request pipeline enforced on
//! every resource-server request.

pub mod jwks_cache;

use jwks_cache::RealmJwks;
use lws_core::{Action, AccessTokenError, ValidatedRequest, uri};
use lws_replay::JtiStore;
use lws_validators::jwk;
use std::sync::Arc;

pub struct AccessTokenValidatorConfig {
    pub realm: String,
    pub jwks_uri: String,
    pub clock_skew_secs: i64,
}

pub struct AccessTokenValidator {
    config: AccessTokenValidatorConfig,
    jwks: RealmJwks,
    jti_store: Arc<dyn JtiStore>,
}

impl AccessTokenValidator {
    #[must_use]
    pub fn new(
        config: AccessTokenValidatorConfig,
        jwks: RealmJwks,
        jti_store: Arc<dyn JtiStore>,
    ) -> Self {
        Self {
            config,
            jwks,
            jti_store,
        }
    }

    /// Validates `token` against `resource` requested with HTTP `method`, executing §4.6 steps
    /// 1-9 in order with short-circuiting failure.
    pub async fn validate(
        &self,
        token: &str,
        method: &str,
        resource: &str,
    ) -> Result<ValidatedRequest, AccessTokenError> {
        // Step 1: parse.
        let parts = lws_validators::common::parse(token)
            .map_err(|e| AccessTokenError::InvalidToken(e.to_string()))?;
        lws_validators::common::reject_alg_none(&parts.header)
            .map_err(|_| AccessTokenError::InvalidToken("alg=none".to_string()))?;

        let alg = parts
            .header
            .get("alg")
            .and_then(|v| v.as_str())
            .ok_or(AccessTokenError::InvalidToken("missing alg".to_string()))?;
        let kid = parts
            .header
            .get("kid")
            .and_then(|v| v.as_str())
            .ok_or(AccessTokenError::InvalidToken("missing kid".to_string()))?;

        // Step 2: resolve signing key via the cached JWKS and verify signature.
        let key = self
            .jwks
            .key_for(&self.config.jwks_uri, kid)
            .await
            .ok_or_else(|| AccessTokenError::InvalidToken("unknown kid".to_string()))?;
        let signing_input = format!("{}.{}", parts.header_b64, parts.payload_b64);
        jwk::verify_signature(&key, alg, &signing_input, parts.signature_b64)
            .map_err(|_| AccessTokenError::InvalidSignature)?;

        // Step 3: required claims.
        let sub = require_str(&parts.claims, "sub")?;
        let iss = require_str(&parts.claims, "iss")?;
        let aud = require_str(&parts.claims, "aud")?;
        let iat = require_i64(&parts.claims, "iat")?;
        let exp = require_i64(&parts.claims, "exp")?;
        let jti = require_str(&parts.claims, "jti")?;
        let client_id = parts
            .claims
            .get("client_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        // Step 4: issuer.
        if iss != self.config.realm {
            return Err(AccessTokenError::InvalidIssuer);
        }

        // Step 5: lifetime cap, re-enforced at validation per §8.
        if exp - iat > 300 {
            return Err(AccessTokenError::LifetimeExceeded);
        }

        // Step 6: expiry / iat skew.
        let now = lws_validators::common::now_unix();
        let skew = self.config.clock_skew_secs;
        if exp < now - skew {
            return Err(AccessTokenError::TokenExpired);
        }
        if iat > now + skew {
            return Err(AccessTokenError::InvalidIat);
        }

        // Step 7: audience containment.
        if !uri::audience_contains(&aud, resource) {
            return Err(AccessTokenError::InvalidAudience);
        }

        // Step 8: replay. The set-if-absent claim is the serialisation point across requests.
        let remaining = (exp - now).max(1) as u64;
        if !self
            .jti_store
            .try_claim(&jti, std::time::Duration::from_secs(remaining))
            .await
        {
            return Err(AccessTokenError::TokenReplay);
        }

        // Step 9: map the HTTP method to an action tag. Policy beyond audience containment is
        // deferred (§9 "non-duplicated policy layer").
        let action = Action::from_http_method(method)
            .ok_or_else(|| AccessTokenError::InvalidToken("unsupported method".to_string()))?;

        Ok(ValidatedRequest {
            principal_subject: sub,
            client_id,
            action,
            resource_path: resource.to_string(),
        })
    }
}

fn require_str(claims: &serde_json::Value, key: &'static str) -> Result<String, AccessTokenError> {
    claims
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or(AccessTokenError::MissingClaim(key))
}

fn require_i64(claims: &serde_json::Value, key: &'static str) -> Result<i64, AccessTokenError> {
    claims
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or(AccessTokenError::MissingClaim(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use ed25519_dalek::Signer as _;
    use lws_resolver::InProcessCache;
    use lws_replay::InProcessJtiStore;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sign_token(signing_key: &ed25519_dalek::SigningKey, kid: &str, claims: serde_json::Value) -> String {
        let header = json!({ "alg": "EdDSA", "kid": kid });
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap());
        let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature = signing_key.sign(signing_input.as_bytes());
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
    }

    async fn setup() -> (AccessTokenValidator, ed25519_dalek::SigningKey, MockServer) {
        let mut csprng = rand::rngs::OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();

        let server = MockServer::start().await;
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

        let config = AccessTokenValidatorConfig {
            realm: "http://localhost:8080/realms/lws".to_string(),
            jwks_uri: format!("{}/jwks", server.uri()),
            clock_skew_secs: 60,
        };
        let jwks = RealmJwks::new(
            reqwest::Client::new(),
            Arc::new(InProcessCache::new()),
            std::time::Duration::from_secs(3600),
        );
        let validator = AccessTokenValidator::new(
            config,
            jwks,
            Arc::new(InProcessJtiStore::new()),
        );
        (validator, signing_key, server)
    }

    #[tokio::test]
    async fn happy_path_validates_and_maps_action() {
        let (validator, signing_key, _server) = setup().await;
        let now = lws_validators::common::now_unix();
        let token = sign_token(
            &signing_key,
            "k1",
            json!({
                "sub": "alice",
                "iss": "http://localhost:8080/realms/lws",
                "aud": "http://localhost:3001/storage",
                "client_id": "https://client",
                "iat": now,
                "exp": now + 300,
                "jti": "11111111-1111-1111-1111-111111111111",
            }),
        );

        let result = validator
            .validate(&token, "GET", "http://localhost:3001/storage")
            .await
            .expect("valid token");
        assert_eq!(result.principal_subject, "alice");
        assert_eq!(result.action, Action::Read);
    }

    #[tokio::test]
    async fn replay_fails_second_use() {
        let (validator, signing_key, _server) = setup().await;
        let now = lws_validators::common::now_unix();
        let token = sign_token(
            &signing_key,
            "k1",
            json!({
                "sub": "alice",
                "iss": "http://localhost:8080/realms/lws",
                "aud": "http://localhost:3001/storage",
                "client_id": "https://client",
                "iat": now,
                "exp": now + 300,
                "jti": "22222222-2222-2222-2222-222222222222",
            }),
        );

        validator
            .validate(&token, "GET", "http://localhost:3001/storage")
            .await
            .expect("first use succeeds");
        let err = validator
            .validate(&token, "GET", "http://localhost:3001/storage")
            .await
            .unwrap_err();
        assert_eq!(err, AccessTokenError::TokenReplay);
    }

    #[tokio::test]
    async fn lifetime_cap_rejects_over_300() {
        let (validator, signing_key, _server) = setup().await;
        let token = sign_token(
            &signing_key,
            "k1",
            json!({
                "sub": "alice",
                "iss": "http://localhost:8080/realms/lws",
                "aud": "http://localhost:3001/storage",
                "client_id": "https://client",
                "iat": 0,
                "exp": 400,
                "jti": "33333333-3333-3333-3333-333333333333",
            }),
        );
        let err = validator
            .validate(&token, "GET", "http://localhost:3001/storage")
            .await
            .unwrap_err();
        assert_eq!(err, AccessTokenError::LifetimeExceeded);
    }

    #[tokio::test]
    async fn audience_mismatch_rejected() {
        let (validator, signing_key, _server) = setup().await;
        let now = lws_validators::common::now_unix();
        let token = sign_token(
            &signing_key,
            "k1",
            json!({
                "sub": "alice",
                "iss": "http://localhost:8080/realms/lws",
                "aud": "http://localhost:3001/storage",
                "client_id": "https://client",
                "iat": now,
                "exp": now + 300,
                "jti": "44444444-4444-4444-4444-444444444444",
            }),
        );
        let err = validator
            .validate(&token, "GET", "http://other:3001/storage")
            .await
            .unwrap_err();
        assert_eq!(err, AccessTokenError::InvalidAudience);
    }
}
