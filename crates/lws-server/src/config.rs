//! Environment/CLI configuration shared by both LWS binaries (§6 "Configuration inputs").

use anyhow::Context as _;
use clap::Parser;
use lws_core::LwsConfig;

#[derive(Debug, Parser)]
pub struct ServerArgs {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "LWS_BIND_ADDR", default_value = "127.0.0.1:0")]
    pub bind_addr: String,

    /// The authorization server's realm URI; used as `iss` on minted access tokens and checked
    /// against `iss` at validation. Distinct from `storage_realm_uri` (§8 scenarios 1/2/4 run
    /// these as two different origins).
    #[arg(long, env = "LWS_REALM_URI")]
    pub realm_uri: String,

    /// The resource server's storage realm URI, the audience authority checked by origin and
    /// path-prefix containment against `aud`. Defaults to `realm_uri` for single-origin
    /// deployments; set distinctly when the authorization server and resource server live at
    /// different origins.
    #[arg(long, env = "LWS_STORAGE_REALM_URI")]
    pub storage_realm_uri: Option<String>,

    /// The authorization server's public URI (for discovery metadata and `as_uri` challenges).
    #[arg(long, env = "LWS_AUTHORIZATION_SERVER_URI")]
    pub authorization_server_uri: String,

    #[arg(long, env = "LWS_ACCESS_TOKEN_MAX_LIFETIME_S", default_value_t = 300)]
    pub access_token_max_lifetime_s: u32,

    #[arg(long, env = "LWS_CLOCK_SKEW_TOLERANCE_S", default_value_t = 60)]
    pub clock_skew_tolerance_s: u32,

    #[arg(long, env = "LWS_CID_HTTPS_ONLY", default_value_t = true)]
    pub cid_https_only: bool,

    #[arg(long, env = "LWS_CID_MAX_BYTES", default_value_t = 10 * 1024)]
    pub cid_max_bytes: u32,

    #[arg(long, env = "LWS_CID_FETCH_TIMEOUT_MS", default_value_t = 5_000)]
    pub cid_fetch_timeout_ms: u32,

    #[arg(long, env = "LWS_CID_DEFAULT_TTL_S", default_value_t = 3_600)]
    pub cid_default_ttl_s: u32,

    /// Redis endpoint for the single-use `jti` replay store; omitted runs in-process only.
    #[arg(long, env = "LWS_JTI_STORE_ENDPOINT")]
    pub jti_store_endpoint: Option<String>,

    /// Redis endpoint for the CID/JWKS document cache; omitted runs in-process only.
    #[arg(long, env = "LWS_DOCUMENT_CACHE_ENDPOINT")]
    pub document_cache_endpoint: Option<String>,

    /// Base64-encoded PKCS8 DER Ed25519 signing key. Required by the authorization server binary
    /// only; generated ephemerally (with a loud warning) when absent, for local development.
    #[arg(long, env = "LWS_SIGNING_KEY_PKCS8_B64")]
    pub signing_key_pkcs8_b64: Option<String>,

    /// `kid` to stamp on tokens signed with `signing_key_pkcs8_b64`.
    #[arg(long, env = "LWS_SIGNING_KEY_ID", default_value = "default")]
    pub signing_key_id: String,

    /// The resource server's upstream JWKS URI (defaults to `{authorization_server_uri}/jwks`).
    #[arg(long, env = "LWS_JWKS_URI")]
    pub jwks_uri: Option<String>,

    /// OpenID issuer accepted for `id_token` subject tokens. Omit to run OpenID-less (SSI only).
    #[arg(long, env = "LWS_OIDC_ISSUER")]
    pub oidc_issuer: Option<String>,
}

impl ServerArgs {
    #[must_use]
    pub fn lws_config(&self) -> LwsConfig {
        LwsConfig {
            realm_uri: self.realm_uri.clone(),
            authorization_server_uri: self.authorization_server_uri.clone(),
            access_token_max_lifetime_s: self.access_token_max_lifetime_s,
            clock_skew_tolerance_s: self.clock_skew_tolerance_s,
            cid_https_only: self.cid_https_only,
            cid_max_bytes: self.cid_max_bytes,
            cid_fetch_timeout_ms: self.cid_fetch_timeout_ms,
            cid_default_ttl_s: self.cid_default_ttl_s,
            jti_store_endpoint: self.jti_store_endpoint.clone(),
            document_cache_endpoint: self.document_cache_endpoint.clone(),
        }
    }

    #[must_use]
    pub fn effective_jwks_uri(&self) -> String {
        self.jwks_uri
            .clone()
            .unwrap_or_else(|| format!("{}/jwks", self.authorization_server_uri.trim_end_matches('/')))
    }

    #[must_use]
    pub fn effective_storage_realm_uri(&self) -> String {
        self.storage_realm_uri.clone().unwrap_or_else(|| self.realm_uri.clone())
    }

    /// # Errors
    /// Returns an error if `signing_key_pkcs8_b64` is set but not valid base64.
    pub fn decode_signing_key_der(&self) -> anyhow::Result<Option<Vec<u8>>> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        self.signing_key_pkcs8_b64
            .as_deref()
            .map(|s| STANDARD.decode(s).context("decode LWS_SIGNING_KEY_PKCS8_B64"))
            .transpose()
    }
}
