//! services/client/src/lib.rs
//!
//! The EventBook client data-synchronization layer: remote resource gateway,
//! entity transformers, local user store, query cache with its mutation
//! orchestrators, and the session context. Consumed as a library by a host
//! application shell that owns navigation and rendering.

pub mod adapters;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod gateway;
pub mod state;
pub mod store;
pub mod sync;
pub mod transformers;
pub mod validation;

#[cfg(test)]
pub(crate) mod testkit;

pub use config::{ClientConfig, ConfigError, RegistrationStrategy, StalePolicy};
pub use error::ClientError;
pub use gateway::{ApiGateway, RequestOptions};
pub use state::AppState;
pub use store::{LocalUserStore, StorePhase};
pub use sync::{
    CacheTransaction, DashboardEntry, DedicatedBackend, EventQueries, MirroredBackend,
    QueryCache, QueryKey, QueryStatus, RegistrationBackend, RegistrationQueries, SessionContext,
    SessionPhase,
};

/// Installs the global tracing subscriber. The host shell calls this once at
/// startup; tests and embedders that manage their own subscriber skip it.
pub fn init_tracing(level: tracing::Level) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
