//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The
//! `.env` file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// The hosted development backend the original app shipped against.
pub const DEFAULT_BASE_URL: &str = "https://68b8cb55b715405043291bcf.mockapi.io/api/v1";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which persistence strategy backs registration mutations.
///
/// `Dedicated` is canonical. `Mirrored` projects registrations out of the
/// user document's `registeredEventIds` list and exists for backends that
/// never grew a registrations collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationStrategy {
    #[default]
    Dedicated,
    Mirrored,
}

/// How long each query class may serve a cached value before a background
/// refresh is triggered.
#[derive(Debug, Clone)]
pub struct StalePolicy {
    pub event_list: Duration,
    pub event_detail: Duration,
    pub event_search: Duration,
    pub featured: Duration,
    pub upcoming: Duration,
    pub user_registrations: Duration,
    pub registration_status: Duration,
}

impl Default for StalePolicy {
    fn default() -> Self {
        Self {
            event_list: Duration::from_secs(2 * 60),
            event_detail: Duration::from_secs(5 * 60),
            event_search: Duration::from_secs(60),
            featured: Duration::from_secs(10 * 60),
            upcoming: Duration::from_secs(5 * 60),
            user_registrations: Duration::from_secs(2 * 60),
            registration_status: Duration::from_secs(60),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub registration_strategy: RegistrationStrategy,
    pub keychain_dir: PathBuf,
    pub log_level: Level,
    pub stale: StalePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_millis(10_000),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1_000),
            registration_strategy: RegistrationStrategy::default(),
            keychain_dir: PathBuf::from("./.eventbook"),
            log_level: Level::INFO,
            stale: StalePolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for
    /// development, but this is skipped in test environments to ensure tests
    /// are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let base_url = std::env::var("EVENTBOOK_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let request_timeout =
            Duration::from_millis(parse_var("EVENTBOOK_REQUEST_TIMEOUT_MS", 10_000)?);
        let max_retries = parse_var("EVENTBOOK_MAX_RETRIES", 3)?;
        let retry_base_delay =
            Duration::from_millis(parse_var("EVENTBOOK_RETRY_BASE_DELAY_MS", 1_000)?);

        let registration_strategy = match std::env::var("EVENTBOOK_REGISTRATION_BACKEND") {
            Err(_) => RegistrationStrategy::default(),
            Ok(raw) => match raw.to_lowercase().as_str() {
                "dedicated" => RegistrationStrategy::Dedicated,
                "mirrored" => RegistrationStrategy::Mirrored,
                other => {
                    return Err(ConfigError::InvalidValue(
                        "EVENTBOOK_REGISTRATION_BACKEND".to_string(),
                        format!("'{}' is not a known registration backend", other),
                    ))
                }
            },
        };

        let keychain_dir = std::env::var("EVENTBOOK_KEYCHAIN_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.eventbook"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            base_url,
            request_timeout,
            max_retries,
            retry_base_delay,
            registration_strategy,
            keychain_dir,
            log_level,
            stale: StalePolicy::default(),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' failed to parse", raw))
        }),
    }
}
