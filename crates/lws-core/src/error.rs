use thiserror::Error;

/// Failures from identifier resolution (CID fetch, `did:key` decode, key lookup).
///
/// Variant names intentionally mirror the wire-visible error codes so handlers can map them
/// without a separate lookup table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("invalid identifier uri: {0}")]
    InvalidUri(String),
    #[error("https required for this identifier")]
    HttpsRequired,
    #[error("document exceeded the configured size limit")]
    DocumentTooLarge,
    #[error("resolution timed out")]
    Timeout,
    #[error("upstream fetch failed with status {status}")]
    FetchFailed { status: u16 },
    #[error("document failed structural validation: {0}")]
    InvalidDocument(String),
    #[error("unsupported did:key multicodec prefix")]
    UnsupportedKeyType,
    #[error("unsupported key encoding (e.g. compressed point)")]
    UnsupportedKeyFormat,
    #[error("no verification method matched kid")]
    NoVerificationMethod,
}

impl ResolverError {
    /// The stable upper-snake-case code used in logs and internal responses (§7).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidUri(_) => "INVALID_URI",
            Self::HttpsRequired => "HTTPS_REQUIRED",
            Self::DocumentTooLarge => "DOCUMENT_TOO_LARGE",
            Self::Timeout => "TIMEOUT",
            Self::FetchFailed { .. } => "FETCH_FAILED",
            Self::InvalidDocument(_) => "INVALID_DOCUMENT",
            Self::UnsupportedKeyType => "UNSUPPORTED_KEY_TYPE",
            Self::UnsupportedKeyFormat => "UNSUPPORTED_KEY_FORMAT",
            Self::NoVerificationMethod => "NO_VERIFICATION_METHOD",
        }
    }
}

/// Failures from subject-token validation (§4.4). A single taxonomy shared by every suite.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("token is not a well-formed JWT")]
    Malformed,
    #[error("disallowed signing algorithm")]
    DisallowedAlg,
    #[error("missing required claim: {0}")]
    MissingClaim(&'static str),
    #[error("issuer does not match the expected authority")]
    InvalidIssuer,
    #[error("audience does not contain the realm")]
    InvalidAudience,
    #[error("token has expired")]
    TokenExpired,
    #[error("iat is too far in the future")]
    InvalidIat,
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("verification key not found: {0}")]
    KeyNotFound(String),
    #[error("self-issued token identity mismatch (sub/iss/client_id)")]
    SelfIssuedMismatch,
    #[error("algorithm is inconsistent with the key type")]
    AlgKeyMismatch,
}

impl ValidatorError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed => "MALFORMED",
            Self::DisallowedAlg => "DISALLOWED_ALG",
            Self::MissingClaim(_) => "MISSING_CLAIM",
            Self::InvalidIssuer => "INVALID_ISSUER",
            Self::InvalidAudience => "INVALID_AUDIENCE",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidIat => "INVALID_IAT",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::KeyNotFound(_) => "KEY_NOT_FOUND",
            Self::SelfIssuedMismatch => "SELF_ISSUED_MISMATCH",
            Self::AlgKeyMismatch => "ALG_KEY_MISMATCH",
        }
    }
}

impl From<ResolverError> for ValidatorError {
    fn from(e: ResolverError) -> Self {
        match e {
            ResolverError::NoVerificationMethod => Self::KeyNotFound("no match".to_string()),
            other => Self::KeyNotFound(other.to_string()),
        }
    }
}

/// Errors returned from `/token` (§7, exchange errors). `error_description` is filled in by the
/// handler from the underlying cause.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
    #[error("invalid_grant: {0}")]
    InvalidGrant(String),
    #[error("unsupported_token_type: {0}")]
    UnsupportedTokenType(String),
    #[error("server_error: {0}")]
    ServerError(String),
}

impl ExchangeError {
    #[must_use]
    pub fn oauth_error(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidGrant(_) => "invalid_grant",
            Self::UnsupportedTokenType(_) => "unsupported_token_type",
            Self::ServerError(_) => "server_error",
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        match self {
            Self::InvalidRequest(m)
            | Self::InvalidGrant(m)
            | Self::UnsupportedTokenType(m)
            | Self::ServerError(m) => m,
        }
    }
}

/// Failures from access-token enforcement (§4.6, §7 resource-access errors).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessTokenError {
    #[error("invalid_token: {0}")]
    InvalidToken(String),
    #[error("invalid_signature")]
    InvalidSignature,
    #[error("missing_claim: {0}")]
    MissingClaim(&'static str),
    #[error("invalid_issuer")]
    InvalidIssuer,
    #[error("lifetime_exceeded")]
    LifetimeExceeded,
    #[error("token_expired")]
    TokenExpired,
    #[error("invalid_iat")]
    InvalidIat,
    #[error("invalid_audience")]
    InvalidAudience,
    #[error("token_replay")]
    TokenReplay,
}

impl AccessTokenError {
    /// Lowercase `error=` value for the `WWW-Authenticate` challenge (§4.7, §7).
    #[must_use]
    pub fn challenge_error(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => "invalid_token",
            Self::InvalidSignature => "invalid_signature",
            Self::MissingClaim(_) => "missing_claim",
            Self::InvalidIssuer => "invalid_token",
            Self::LifetimeExceeded => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::InvalidIat => "invalid_token",
            Self::InvalidAudience => "invalid_audience",
            Self::TokenReplay => "token_replay",
        }
    }

    /// Stable machine-readable code for logging (§10.1), distinct from the wire-facing
    /// `challenge_error()` so causes collapsed onto the same `error=` value stay distinguishable.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::MissingClaim(_) => "MISSING_CLAIM",
            Self::InvalidIssuer => "INVALID_ISSUER",
            Self::LifetimeExceeded => "LIFETIME_EXCEEDED",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidIat => "INVALID_IAT",
            Self::InvalidAudience => "INVALID_AUDIENCE",
            Self::TokenReplay => "TOKEN_REPLAY",
        }
    }
}
