pub mod authz;
pub mod challenge;
pub mod config;
pub mod resource;
pub mod storage;

pub use config::ServerArgs;
