//! services/client/src/gateway.rs
//!
//! The remote resource gateway: a uniform request/response wrapper over the
//! remote collection store. Applies default headers and the session bearer
//! token, enforces the request deadline, retries retryable failures with
//! exponential backoff and normalizes every failure into the shared error
//! taxonomy. Stateless apart from its configuration.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use eventbook_core::ports::{
    ApiError, ApiResult, HttpTransport, Method, TokenProvider, WireRequest, WireResponse,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;

/// Per-request overrides of the configured timeout/retry policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub max_retries: Option<u32>,
}

/// Shape of a structured error body, when the server sends one.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
}

pub struct ApiGateway {
    transport: Arc<dyn HttpTransport>,
    token_provider: OnceLock<Arc<dyn TokenProvider>>,
    base_url: String,
    default_timeout: Duration,
    default_retries: u32,
    retry_base_delay: Duration,
}

impl ApiGateway {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            token_provider: OnceLock::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_timeout: config.request_timeout,
            default_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        }
    }

    /// Wires in the token source once the session context exists. Later
    /// calls are ignored.
    pub fn set_token_provider(&self, provider: Arc<dyn TokenProvider>) {
        let _ = self.token_provider.set(provider);
    }

    //=====================================================================================
    // Request pipeline
    //=====================================================================================

    /// Issues a request and returns the decoded JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ApiResult<Value> {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let max_retries = options.max_retries.unwrap_or(self.default_retries);

        let request = WireRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            headers: self.build_headers(),
            body: body.map(|value| value.to_string()),
        };

        let mut attempt: u32 = 0;
        let mut delay = self.retry_base_delay;
        loop {
            match self.execute_once(request.clone(), timeout).await {
                Err(error) if attempt < max_retries && error.is_retryable() => {
                    warn!(
                        url = %request.url,
                        attempt = attempt + 1,
                        error = %error,
                        "retryable request failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn execute_once(&self, request: WireRequest, timeout: Duration) -> ApiResult<Value> {
        debug!(method = request.method.as_str(), url = %request.url, "dispatching request");

        let response = match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(ApiError::Timeout),
        };

        if !response.is_success() {
            return Err(Self::normalize_failure(&response));
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    fn build_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        let token = self
            .token_provider
            .get()
            .and_then(|provider| provider.bearer_token());
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        headers
    }

    /// A structured error body refines the message and code; anything else
    /// falls back to the generic status line.
    fn normalize_failure(response: &WireResponse) -> ApiError {
        let fallback = format!("HTTP error! status: {}", response.status);
        let (message, code) = match serde_json::from_str::<ErrorBody>(&response.body) {
            Ok(body) => (body.message.unwrap_or(fallback), body.code),
            Err(_) => (fallback, None),
        };
        ApiError::Http {
            status: response.status,
            code,
            message,
        }
    }

    //=====================================================================================
    // Convenience methods
    //=====================================================================================

    pub async fn get(&self, path: &str) -> ApiResult<Value> {
        self.request(Method::Get, path, None, RequestOptions::default())
            .await
    }

    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.request(Method::Post, path, Some(to_value(body)?), RequestOptions::default())
            .await
    }

    pub async fn put<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.request(Method::Put, path, Some(to_value(body)?), RequestOptions::default())
            .await
    }

    pub async fn patch<B: Serialize>(&self, path: &str, body: &B) -> ApiResult<Value> {
        self.request(Method::Patch, path, Some(to_value(body)?), RequestOptions::default())
            .await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.request(Method::Delete, path, None, RequestOptions::default())
            .await
    }
}

fn to_value<B: Serialize>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Decodes a gateway response value into a typed record.
pub fn decode<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{test_config, ScriptedTransport};
    use serde_json::json;

    fn gateway(transport: &Arc<ScriptedTransport>) -> ApiGateway {
        ApiGateway::new(transport.clone(), &test_config())
    }

    struct FixedToken(&'static str);
    impl TokenProvider for FixedToken {
        fn bearer_token(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_success() {
        let transport = ScriptedTransport::new();
        transport.push_raw(500, "boom");
        transport.push_raw(502, "boom");
        transport.push_ok(json!({"ok": true}));

        let value = gateway(&transport).get("/events").await.unwrap();
        assert_eq!(value, json!({"ok": true}));
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn rate_limiting_is_retried() {
        let transport = ScriptedTransport::new();
        transport.push_raw(429, "slow down");
        transport.push_ok(json!([]));

        gateway(&transport).get("/events").await.unwrap();
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn client_errors_propagate_immediately() {
        let transport = ScriptedTransport::new();
        transport.push_json(404, json!({"message": "no such event", "code": "not_found"}));

        let error = gateway(&transport).get("/events/9").await.unwrap_err();
        match error {
            ApiError::Http { status, code, message } => {
                assert_eq!(status, 404);
                assert_eq!(code.as_deref(), Some("not_found"));
                assert_eq!(message, "no such event");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn retries_are_bounded_by_the_configured_maximum() {
        let transport = ScriptedTransport::new();
        for _ in 0..10 {
            transport.push_raw(500, "boom");
        }

        let error = gateway(&transport).get("/events").await.unwrap_err();
        assert_eq!(error.http_status(), Some(500));
        // One initial attempt plus max_retries.
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn deadline_overrun_surfaces_as_timeout() {
        let transport = ScriptedTransport::new();
        transport.push_pending();

        let error = gateway(&transport)
            .request(
                Method::Get,
                "/events",
                None,
                RequestOptions {
                    timeout: Some(Duration::from_millis(20)),
                    max_retries: Some(0),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(error, ApiError::Timeout);
    }

    #[tokio::test]
    async fn network_failures_are_not_retried() {
        let transport = ScriptedTransport::new();
        transport.push_error(ApiError::Network("connection refused".to_string()));

        let error = gateway(&transport).get("/events").await.unwrap_err();
        assert!(matches!(error, ApiError::Network(_)));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn malformed_bodies_surface_as_decode_errors() {
        let transport = ScriptedTransport::new();
        transport.push_raw(200, "not json at all");

        let error = gateway(&transport).get("/events").await.unwrap_err();
        assert!(matches!(error, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_bodies_decode_to_null() {
        let transport = ScriptedTransport::new();
        transport.push_raw(200, "");

        let value = gateway(&transport).delete("/registrations/1").await.unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn bearer_token_is_attached_when_a_provider_is_wired() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!([]));
        transport.push_ok(json!([]));

        let gateway = gateway(&transport);
        gateway.get("/events").await.unwrap();
        let headers = transport.request(0).headers;
        assert!(!headers.iter().any(|(name, _)| name == "Authorization"));

        gateway.set_token_provider(Arc::new(FixedToken("tok.u1.123")));
        gateway.get("/events").await.unwrap();
        let headers = transport.request(1).headers;
        assert!(headers
            .iter()
            .any(|(name, value)| name == "Authorization" && value == "Bearer tok.u1.123"));
    }

    #[tokio::test]
    async fn requests_carry_the_default_content_type_and_base_url() {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!([]));

        gateway(&transport).get("/events?page=1").await.unwrap();
        let request = transport.request(0);
        assert_eq!(request.url, "http://testhost/api/v1/events?page=1");
        assert!(request
            .headers
            .iter()
            .any(|(name, value)| name == "Content-Type" && value == "application/json"));
    }
}
