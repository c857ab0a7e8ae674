use serde::{Deserialize, Serialize};

/// Which authentication suite produced a [`Principal`] (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthSuite {
    Openid,
    SsiCid,
    SsiDidKey,
}

impl AuthSuite {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Openid => "openid",
            Self::SsiCid => "ssi-cid",
            Self::SsiDidKey => "ssi-did-key",
        }
    }
}

/// The `subject_token_type` URIs recognized at the exchange endpoint (§4.4, §6).
pub const TOKEN_TYPE_ID_TOKEN: &str = "urn:ietf:params:oauth:token-type:id_token";
pub const TOKEN_TYPE_JWT: &str = "urn:ietf:params:oauth:token-type:jwt";
pub const GRANT_TYPE_TOKEN_EXCHANGE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
pub const REQUESTED_TOKEN_TYPE_ACCESS_TOKEN: &str =
    "urn:ietf:params:oauth:token-type:access_token";

/// Normalised identity, produced by a validator and consumed by the exchange handler (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub issuer: String,
    pub client_id: String,
    pub auth_suite: AuthSuite,
    pub subject_token_id: String,
}

/// A public JWK as carried inside a `VerificationMethod` or a JWKS response (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

/// A `VerificationMethod` entry inside a [`CidDoc`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    pub public_key_jwk: Jwk,
}

/// A service endpoint entry. Carried through but not interpreted by the core (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub id: String,
    #[serde(rename = "type")]
    pub endpoint_type: String,
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

/// A Controlled Identifier Document (§3). `context` preserves ordering from the wire document;
/// invariants (`id` absolute, `authentication[*].controller == id`) are checked at parse time by
/// the resolver, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CidDoc {
    #[serde(rename = "@context", default)]
    pub context: Vec<String>,
    pub id: String,
    #[serde(default)]
    pub authentication: Vec<VerificationMethod>,
    #[serde(default)]
    pub service: Vec<ServiceEndpoint>,
}

/// Claims carried by an LWS access token (§3). `aud` is always a single string on the outgoing
/// side even though incoming subject tokens may use a string-or-array `aud` (§9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub sub: String,
    pub client_id: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub auth_suite: AuthSuite,
    pub subject_token_id: String,
}

/// The HTTP-method-derived action tag used by the storage collaborator (§4.6 step 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Create,
    Update,
    Append,
    Delete,
}

impl Action {
    /// Maps an HTTP method to an action tag per §4.6 step 9. Unknown/unsupported methods map to
    /// `None`; callers should treat that as 405.
    #[must_use]
    pub fn from_http_method(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" | "OPTIONS" => Some(Self::Read),
            "PUT" => Some(Self::Update),
            "POST" => Some(Self::Create),
            "PATCH" => Some(Self::Append),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Emitted by the access-token validator (C6) on success, consumed by the storage collaborator
/// (§4.6, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedRequest {
    pub principal_subject: String,
    pub client_id: String,
    pub action: Action,
    pub resource_path: String,
}
