//! crates/eventbook_core/src/ports.rs
//!
//! Defines the service contracts (traits) at the boundary of the client core.
//! These traits keep the core independent of the concrete HTTP stack and of
//! whatever the host platform uses for secure on-device storage.

use async_trait::async_trait;

//=========================================================================================
// Error Taxonomy
//=========================================================================================

/// The error taxonomy shared by every layer of the client.
///
/// `Clone` so that callers coalesced onto a single in-flight request can all
/// receive the same failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for {0}")]
    AlreadyExists(String),

    /// No response was received at all.
    #[error("Network error occurred: {0}")]
    Network(String),

    /// The call was cancelled after the configured deadline. Distinct from
    /// `Network`, which means the connection itself failed.
    #[error("Request timeout")]
    Timeout,

    /// A response arrived with a non-2xx status.
    #[error("{message}")]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The response body was not valid structured data.
    #[error("Invalid JSON response: {0}")]
    Decode(String),

    #[error("Not authenticated")]
    Unauthenticated,

    /// The event has no available spots left. Raised locally, before any
    /// network call is dispatched.
    #[error("Event is sold out")]
    EventFull,
}

impl ApiError {
    /// Only idempotent server-side failures are worth retrying: 5xx or
    /// rate limiting. Client errors and connection failures propagate
    /// immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Http { status, .. } if *status >= 500 || *status == 429)
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A convenience type alias for `Result<T, ApiError>`.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures of the secure on-device storage collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Corrupted entry under key {0}")]
    Corrupted(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

//=========================================================================================
// Transport Port
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// One outgoing HTTP request, fully assembled by the gateway.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// The raw response a transport hands back. Status interpretation, decoding
/// and retry classification all happen in the gateway.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub body: String,
}

impl WireResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The thin REST transport the gateway is built on.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a single request and returns whatever the server said.
    /// Implementations must not retry or enforce deadlines on their own;
    /// that policy belongs to the gateway.
    async fn send(&self, request: WireRequest) -> ApiResult<WireResponse>;
}

//=========================================================================================
// Secure Storage Port
//=========================================================================================

/// Secure on-device key/value storage (platform keychain or equivalent).
/// The client persists exactly two keys through this port: the auth token
/// and the serialized current-user record.
#[async_trait]
pub trait SecureStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    async fn remove_item(&self, key: &str) -> StorageResult<()>;
}

//=========================================================================================
// Token Source
//=========================================================================================

/// Supplies the bearer token attached to outgoing requests. Implemented by
/// the session context; the gateway only ever sees this seam.
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification_covers_server_errors_and_rate_limiting() {
        let http = |status| ApiError::Http {
            status,
            code: None,
            message: String::new(),
        };
        assert!(http(500).is_retryable());
        assert!(http(503).is_retryable());
        assert!(http(429).is_retryable());
        assert!(!http(404).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(!ApiError::Timeout.is_retryable());
        assert!(!ApiError::Network("refused".to_string()).is_retryable());
    }
}
