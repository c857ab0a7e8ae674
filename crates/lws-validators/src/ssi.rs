//! Self-issued suites: SSI-CID and SSI-DID-Key (§4.4). Both present the same
//! `subject_token_type` URI and the same claim shape; they differ only in the form of `sub`
//! (an `https:` controlled-identifier URI vs a `did:key:` identifier), so one validator handles
//! both and tags the resulting [`Principal`] accordingly.

use crate::common;
use crate::jwk;
use lws_core::{AuthSuite, Principal, ValidatorError};
use lws_resolver::IdentifierResolver;
use std::sync::Arc;

pub struct SelfIssuedValidator {
    resolver: Arc<IdentifierResolver>,
    skew_secs: i64,
}

impl SelfIssuedValidator {
    #[must_use]
    pub fn new(resolver: Arc<IdentifierResolver>) -> Self {
        Self {
            resolver,
            skew_secs: 60,
        }
    }

    #[must_use]
    pub fn token_type_uri(&self) -> &'static str {
        lws_core::TOKEN_TYPE_JWT
    }

    /// Validates a self-issued JWT and produces a [`Principal`] bound to `realm` (§4.4, §4.5).
    pub async fn validate(&self, token: &str, realm: &str) -> Result<Principal, ValidatorError> {
        let parts = common::parse(token)?;
        common::reject_alg_none(&parts.header)?;

        let alg = parts
            .header
            .get("alg")
            .and_then(|v| v.as_str())
            .ok_or(ValidatorError::Malformed)?;
        let kid = parts
            .header
            .get("kid")
            .and_then(|v| v.as_str())
            .ok_or(ValidatorError::MissingClaim("kid"))?;

        let sub = common::required_string(&parts.claims, "sub")
            .ok_or(ValidatorError::MissingClaim("sub"))?
            .to_string();
        let iss = common::required_string(&parts.claims, "iss")
            .ok_or(ValidatorError::MissingClaim("iss"))?
            .to_string();
        let client_id = common::required_string(&parts.claims, "client_id")
            .ok_or(ValidatorError::MissingClaim("client_id"))?
            .to_string();
        let jti = common::required_string(&parts.claims, "jti")
            .ok_or(ValidatorError::MissingClaim("jti"))?
            .to_string();

        // Self-issued invariant: the token's subject is its own issuer and its own client.
        if sub != iss || sub != client_id {
            return Err(ValidatorError::SelfIssuedMismatch);
        }
        if !common::audience_contains_realm(&parts.claims, realm) {
            return Err(ValidatorError::InvalidAudience);
        }
        common::check_temporal_claims(&parts.claims, self.skew_secs, common::now_unix())?;

        let auth_suite = if sub.starts_with("did:key:") {
            AuthSuite::SsiDidKey
        } else {
            AuthSuite::SsiCid
        };

        // `resolve_verification_key` dispatches on the URI scheme: did:key decode vs CID
        // document fetch + verification-method lookup (§4.1).
        let key = self
            .resolver
            .resolve_verification_key(&sub, kid)
            .await
            .map_err(ValidatorError::from)?;

        let signing_input = format!("{}.{}", parts.header_b64, parts.payload_b64);
        jwk::verify_signature(&key, alg, &signing_input, parts.signature_b64)?;

        Ok(Principal {
            subject: sub,
            issuer: iss,
            client_id,
            auth_suite,
            subject_token_id: jti,
        })
    }
}
