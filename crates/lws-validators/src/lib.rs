pub mod common;
pub mod jwk;
pub mod openid;
pub mod registry;
pub mod ssi;

pub use openid::OpenIdValidator;
pub use registry::{SubjectTokenValidator, ValidatorRegistry};
pub use ssi::SelfIssuedValidator;
