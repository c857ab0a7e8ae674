pub mod cache;
pub mod cid;
pub mod did_key;
pub mod resolver;
pub mod safety;

pub use cache::{DocumentCache, InProcessCache, RedisDocumentCache};
pub use cid::{FetchOptions, resolve_cid, verification_method};
pub use did_key::resolve_did_key;
pub use resolver::{IdentifierResolver, TtlBounds};
