use serde::{Deserialize, Serialize};

/// Recognized configuration inputs (§6). Loaded from env vars by each binary; see
/// `lws-server::config` for the `LWS_*` mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LwsConfig {
    pub realm_uri: String,
    pub authorization_server_uri: String,
    #[serde(default = "default_max_lifetime")]
    pub access_token_max_lifetime_s: u32,
    #[serde(default = "default_skew")]
    pub clock_skew_tolerance_s: u32,
    #[serde(default = "default_true")]
    pub cid_https_only: bool,
    #[serde(default = "default_max_bytes")]
    pub cid_max_bytes: u32,
    #[serde(default = "default_timeout_ms")]
    pub cid_fetch_timeout_ms: u32,
    #[serde(default = "default_ttl")]
    pub cid_default_ttl_s: u32,
    #[serde(default)]
    pub jti_store_endpoint: Option<String>,
    #[serde(default)]
    pub document_cache_endpoint: Option<String>,
}

const fn default_max_lifetime() -> u32 {
    300
}
const fn default_skew() -> u32 {
    60
}
const fn default_true() -> bool {
    true
}
const fn default_max_bytes() -> u32 {
    10 * 1024
}
const fn default_timeout_ms() -> u32 {
    5_000
}
const fn default_ttl() -> u32 {
    3_600
}

impl LwsConfig {
    /// The hard cap from §6 (`access_token_max_lifetime_s` may only lower it).
    pub const HARD_MAX_LIFETIME_S: u32 = 300;

    #[must_use]
    pub fn effective_max_lifetime_s(&self) -> u32 {
        self.access_token_max_lifetime_s.min(Self::HARD_MAX_LIFETIME_S)
    }
}
