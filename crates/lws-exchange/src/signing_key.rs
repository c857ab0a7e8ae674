//! The authorization server's current signing key (§4.5 step 6, §6 `/jwks`).

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use lws_core::Jwk;

/// An Ed25519 signing key published under `kid` in the realm's JWKS. Rotation is not modeled
/// here: operators deploy a new key under a new `kid` and phase out the old one once clients
/// have picked up the refreshed JWKS (mirrors the degrade-window shape used elsewhere for cache
/// refresh, not a hard guarantee).
pub struct SigningKey {
    pub kid: String,
    encoding_key: EncodingKey,
    public_jwk: Jwk,
}

impl SigningKey {
    /// Builds a signing key from a PKCS8-DER-encoded Ed25519 private key plus the matching raw
    /// public key bytes.
    #[must_use]
    pub fn from_ed25519(kid: String, pkcs8_der: &[u8], public_key: &[u8]) -> Self {
        use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
        let encoding_key = EncodingKey::from_ed_der(pkcs8_der);
        let public_jwk = Jwk {
            kty: "OKP".to_string(),
            crv: Some("Ed25519".to_string()),
            n: None,
            e: None,
            x: Some(URL_SAFE_NO_PAD.encode(public_key)),
            y: None,
            kid: Some(kid.clone()),
            alg: Some("EdDSA".to_string()),
        };
        Self {
            kid,
            encoding_key,
            public_jwk,
        }
    }

    #[must_use]
    pub fn public_jwk(&self) -> &Jwk {
        &self.public_jwk
    }

    /// Signs `claims` as a compact JWT, stamping `kid` into the header (§4.5 step 6).
    ///
    /// # Errors
    /// Returns an error only if claim serialization fails.
    pub fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String, jsonwebtoken::errors::Error> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());
        jsonwebtoken::encode(&header, claims, &self.encoding_key)
    }
}
