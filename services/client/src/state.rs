//! services/client/src/state.rs
//!
//! Defines the shared application state: every component wired together
//! once, handed to the host shell as a single handle.

use std::sync::Arc;

use eventbook_core::ports::{HttpTransport, SecureStorage};

use crate::adapters::{FileKeychain, ReqwestTransport};
use crate::config::{ClientConfig, RegistrationStrategy};
use crate::gateway::ApiGateway;
use crate::store::LocalUserStore;
use crate::sync::cache::QueryCache;
use crate::sync::events::EventQueries;
use crate::sync::registrations::{
    DedicatedBackend, MirroredBackend, RegistrationBackend, RegistrationQueries,
};
use crate::sync::session::SessionContext;

/// The shared application state, created once at startup.
pub struct AppState {
    pub config: Arc<ClientConfig>,
    pub gateway: Arc<ApiGateway>,
    pub cache: Arc<QueryCache>,
    pub users: Arc<LocalUserStore>,
    pub session: Arc<SessionContext>,
    pub events: Arc<EventQueries>,
    pub registrations: Arc<RegistrationQueries>,
}

impl AppState {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn SecureStorage>,
    ) -> Self {
        let config = Arc::new(config);
        let gateway = Arc::new(ApiGateway::new(transport, &config));
        let cache = Arc::new(QueryCache::new());
        let users = Arc::new(LocalUserStore::new(gateway.clone()));
        let session = Arc::new(SessionContext::new(
            gateway.clone(),
            users.clone(),
            storage,
        ));
        gateway.set_token_provider(session.clone());

        let events = Arc::new(EventQueries::new(gateway.clone(), cache.clone(), &config));
        let backend: Arc<dyn RegistrationBackend> = match config.registration_strategy {
            RegistrationStrategy::Dedicated => Arc::new(DedicatedBackend::new(gateway.clone())),
            RegistrationStrategy::Mirrored => {
                Arc::new(MirroredBackend::new(gateway.clone(), users.clone()))
            }
        };
        let registrations = Arc::new(RegistrationQueries::new(
            cache.clone(),
            session.clone(),
            events.clone(),
            backend,
            &config,
        ));

        Self {
            config,
            gateway,
            cache,
            users,
            session,
            events,
            registrations,
        }
    }

    /// Production wiring: reqwest transport and the file keychain rooted at
    /// the configured directory.
    pub fn with_defaults(config: ClientConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::new());
        let storage = Arc::new(FileKeychain::new(config.keychain_dir.clone()));
        Self::new(config, transport, storage)
    }

    /// Startup sequence: primes the user cache and restores the session.
    pub async fn initialize(&self) {
        self.session.initialize().await;
    }

    /// Ends the session and drops every cached query result.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.cache.clear();
    }
}
