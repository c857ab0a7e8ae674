pub mod config;
pub mod error;
pub mod model;
pub mod uri;

pub use config::LwsConfig;
pub use error::{AccessTokenError, ExchangeError, ResolverError, ValidatorError};
pub use model::{
    AccessTokenClaims, Action, AuthSuite, CidDoc, Jwk, Principal, ServiceEndpoint,
    ValidatedRequest, VerificationMethod, GRANT_TYPE_TOKEN_EXCHANGE,
    REQUESTED_TOKEN_TYPE_ACCESS_TOKEN, TOKEN_TYPE_ID_TOKEN, TOKEN_TYPE_JWT,
};
