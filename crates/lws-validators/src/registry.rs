//! Pluggable subject-token validator registry, keyed by `subject_token_type` (§9 design note:
//! "the exchange handler should hold a registry keyed by token_type_uri rather than branching on
//! suite name").

use crate::openid::OpenIdValidator;
use crate::ssi::SelfIssuedValidator;
use lws_core::{Principal, ValidatorError};
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait SubjectTokenValidator: Send + Sync {
    fn token_type_uri(&self) -> &'static str;
    async fn validate(&self, token: &str, realm: &str) -> Result<Principal, ValidatorError>;
}

#[async_trait::async_trait]
impl SubjectTokenValidator for OpenIdValidator {
    fn token_type_uri(&self) -> &'static str {
        OpenIdValidator::token_type_uri(self)
    }

    async fn validate(&self, token: &str, realm: &str) -> Result<Principal, ValidatorError> {
        OpenIdValidator::validate(self, token, realm).await
    }
}

#[async_trait::async_trait]
impl SubjectTokenValidator for SelfIssuedValidator {
    fn token_type_uri(&self) -> &'static str {
        SelfIssuedValidator::token_type_uri(self)
    }

    async fn validate(&self, token: &str, realm: &str) -> Result<Principal, ValidatorError> {
        SelfIssuedValidator::validate(self, token, realm).await
    }
}

/// Looks validators up by the `subject_token_type` presented at `/token` (§4.5 step 2).
///
/// SSI-CID and SSI-DID-Key share one entry: both present
/// `urn:ietf:params:oauth:token-type:jwt` and are disambiguated inside
/// [`SelfIssuedValidator`] by the form of `sub`, not at the registry level.
#[derive(Default, Clone)]
pub struct ValidatorRegistry {
    by_token_type: HashMap<&'static str, Arc<dyn SubjectTokenValidator>>,
}

impl ValidatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, validator: Arc<dyn SubjectTokenValidator>) {
        self.by_token_type
            .insert(validator.token_type_uri(), validator);
    }

    #[must_use]
    pub fn get(&self, subject_token_type: &str) -> Option<Arc<dyn SubjectTokenValidator>> {
        self.by_token_type.get(subject_token_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lws_resolver::IdentifierResolver;

    fn dummy_resolver() -> Arc<IdentifierResolver> {
        Arc::new(IdentifierResolver::new(
            reqwest::Client::new(),
            Arc::new(lws_resolver::InProcessCache::new()),
            lws_resolver::FetchOptions::default(),
            lws_resolver::TtlBounds {
                min: std::time::Duration::from_secs(60),
                max: std::time::Duration::from_secs(3600),
                default: std::time::Duration::from_secs(300),
            },
        ))
    }

    #[test]
    fn unknown_token_type_returns_none() {
        let mut registry = ValidatorRegistry::new();
        registry.register(Arc::new(SelfIssuedValidator::new(dummy_resolver())));
        assert!(registry.get("urn:ietf:params:oauth:token-type:id_token").is_none());
        assert!(registry
            .get("urn:ietf:params:oauth:token-type:jwt")
            .is_some());
    }
}
