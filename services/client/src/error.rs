//! services/client/src/error.rs
//!
//! Defines the primary error type for the entire `client` service.

use crate::config::ConfigError;
use eventbook_core::ports::{ApiError, StorageError};

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from the remote resource
    /// gateway or one of the stores built on it.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Represents an error from the secure on-device storage collaborator.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
