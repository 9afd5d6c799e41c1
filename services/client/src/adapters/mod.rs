//! services/client/src/adapters/mod.rs
//!
//! Concrete implementations of the core ports for production use.

pub mod http;
pub mod keychain;

pub use http::ReqwestTransport;
pub use keychain::FileKeychain;
