//! Token-Exchange Handler (C5, §4.5): validates an inbound subject token, mints an LWS access
//! token bound to the requested `resource`, and caps its lifetime at 300 seconds.

pub mod signing_key;

use lws_core::{
    AccessTokenClaims, ExchangeError, GRANT_TYPE_TOKEN_EXCHANGE, LwsConfig,
    REQUESTED_TOKEN_TYPE_ACCESS_TOKEN,
};
use lws_validators::ValidatorRegistry;
use signing_key::SigningKey;
use uuid::Uuid;

/// The `application/x-www-form-urlencoded` body of a `POST /token` request (§4.5, §6).
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TokenExchangeRequest {
    pub grant_type: String,
    pub subject_token: String,
    pub subject_token_type: String,
    pub resource: String,
    #[serde(default)]
    pub requested_token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// The JSON body returned on a successful exchange (§4.5 step 6).
#[derive(Debug, Clone, serde::Serialize)]
pub struct TokenExchangeResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u32,
}

pub struct TokenExchangeHandler {
    realm: String,
    config: LwsConfig,
    registry: ValidatorRegistry,
    signing_key: SigningKey,
}

impl TokenExchangeHandler {
    #[must_use]
    pub fn new(
        realm: String,
        config: LwsConfig,
        registry: ValidatorRegistry,
        signing_key: SigningKey,
    ) -> Self {
        Self {
            realm,
            config,
            registry,
            signing_key,
        }
    }

    /// Runs the §4.5 algorithm end to end. Stateless beyond the realm's configuration, signing
    /// key, and validator registry: two concurrent calls never produce colliding `jti`s, since
    /// each mints its own UUIDv4.
    pub async fn exchange(
        &self,
        req: &TokenExchangeRequest,
    ) -> Result<TokenExchangeResponse, ExchangeError> {
        if req.grant_type != GRANT_TYPE_TOKEN_EXCHANGE {
            return Err(ExchangeError::InvalidRequest(
                "unsupported grant_type".to_string(),
            ));
        }
        if let Some(requested) = &req.requested_token_type
            && requested != REQUESTED_TOKEN_TYPE_ACCESS_TOKEN
        {
            return Err(ExchangeError::InvalidRequest(
                "unsupported requested_token_type".to_string(),
            ));
        }

        let validator = self.registry.get(&req.subject_token_type).ok_or_else(|| {
            ExchangeError::UnsupportedTokenType("Unsupported subject_token_type".to_string())
        })?;

        let principal = validator
            .validate(&req.subject_token, &self.realm)
            .await
            .map_err(|e| {
                tracing::warn!(subject_token_type = %req.subject_token_type, error = %e, "subject token rejected");
                ExchangeError::InvalidGrant(truncate(&e.to_string()))
            })?;

        let lifetime = self.config.effective_max_lifetime_s();
        let iat = lws_validators::common::now_unix();
        let exp = iat + i64::from(lifetime);

        let claims = AccessTokenClaims {
            iss: self.realm.clone(),
            sub: principal.subject,
            client_id: principal.client_id,
            aud: req.resource.clone(),
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
            auth_suite: principal.auth_suite,
            subject_token_id: principal.subject_token_id,
        };

        let access_token = self
            .signing_key
            .sign(&claims)
            .map_err(|e| ExchangeError::ServerError(e.to_string()))?;

        Ok(TokenExchangeResponse {
            access_token,
            token_type: "Bearer",
            expires_in: lifetime,
        })
    }
}

/// Caps a validator error's textual reason for inclusion in `invalid_grant` (§4.5 step 3, §7).
fn truncate(reason: &str) -> String {
    const MAX: usize = 200;
    if reason.len() <= MAX {
        reason.to_string()
    } else {
        format!("{}...", &reason[..MAX])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_reasons_intact() {
        assert_eq!(truncate("disallowed signing algorithm"), "disallowed signing algorithm");
    }

    #[test]
    fn truncate_caps_long_reasons() {
        let long = "x".repeat(500);
        assert_eq!(truncate(&long).len(), 203);
    }
}
