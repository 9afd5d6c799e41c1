//! services/client/src/sync/session.rs
//!
//! The session/auth context: holds the current authenticated identity and
//! token, persists them to secure on-device storage, and exposes the derived
//! authentication state to the rest of the client.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use eventbook_core::domain::{LoginCredentials, Session, SignupCredentials, User};
use eventbook_core::ports::{ApiError, SecureStorage, TokenProvider};
use tracing::{error, info, warn};

use crate::endpoints;
use crate::error::ClientError;
use crate::gateway::{decode, ApiGateway};
use crate::store::LocalUserStore;
use crate::transformers::WireUser;

/// The two keys this client keeps in secure storage. Absence of either
/// forces the unauthenticated state.
pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const USER_DATA_KEY: &str = "user_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Initializing,
    Authenticated,
    Unauthenticated,
}

struct SessionState {
    phase: SessionPhase,
    session: Session,
}

pub struct SessionContext {
    gateway: Arc<ApiGateway>,
    store: Arc<LocalUserStore>,
    storage: Arc<dyn SecureStorage>,
    state: RwLock<SessionState>,
}

impl SessionContext {
    pub fn new(
        gateway: Arc<ApiGateway>,
        store: Arc<LocalUserStore>,
        storage: Arc<dyn SecureStorage>,
    ) -> Self {
        Self {
            gateway,
            store,
            storage,
            state: RwLock::new(SessionState {
                phase: SessionPhase::Initializing,
                session: Session::default(),
            }),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> SessionPhase {
        self.read_state().phase
    }

    pub fn current_user(&self) -> Option<User> {
        self.read_state().session.user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.read_state().session.token.clone()
    }

    /// Derived, never stored: authenticated means both parts are present.
    pub fn is_authenticated(&self) -> bool {
        self.read_state().session.is_authenticated()
    }

    //=====================================================================================
    // Lifecycle
    //=====================================================================================

    /// Startup path: primes the user cache, then restores a persisted
    /// `{token, user}` pair. Every failure mode degrades to the
    /// unauthenticated state rather than aborting startup.
    pub async fn initialize(&self) {
        self.write_state().phase = SessionPhase::Initializing;

        if let Err(err) = self.store.ensure_initialized().await {
            error!(error = %err, "startup priming failed; clearing stored session");
            self.clear().await;
            return;
        }

        match self.restore_from_storage().await {
            Ok(Some((user, token))) => {
                info!(user_id = %user.id, "restored persisted session");
                let mut state = self.write_state();
                state.session = Session {
                    user: Some(user),
                    token: Some(token),
                };
                state.phase = SessionPhase::Authenticated;
            }
            Ok(None) => {
                let mut state = self.write_state();
                state.session = Session::default();
                state.phase = SessionPhase::Unauthenticated;
            }
            Err(err) => {
                warn!(error = %err, "stored session unusable; clearing");
                self.clear().await;
            }
        }
    }

    async fn restore_from_storage(&self) -> Result<Option<(User, String)>, ClientError> {
        let token = self.storage.get_item(AUTH_TOKEN_KEY).await?;
        let user_json = self.storage.get_item(USER_DATA_KEY).await?;
        let (Some(token), Some(user_json)) = (token, user_json) else {
            return Ok(None);
        };
        let user = serde_json::from_str::<User>(&user_json)
            .map_err(|e| ClientError::Internal(format!("stored user record: {}", e)))?;
        Ok(Some((user, token)))
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, ClientError> {
        let auth = self
            .store
            .login(&credentials.email, &credentials.password)
            .await?;
        self.persist(&auth.user, &auth.token).await?;
        self.set_authenticated(auth.user.clone(), auth.token);
        Ok(auth.user)
    }

    pub async fn signup(&self, credentials: &SignupCredentials) -> Result<User, ClientError> {
        let auth = self
            .store
            .signup(&credentials.name, &credentials.email, &credentials.password)
            .await?;
        self.persist(&auth.user, &auth.token).await?;
        self.set_authenticated(auth.user.clone(), auth.token);
        Ok(auth.user)
    }

    pub async fn logout(&self) {
        self.clear().await;
    }

    /// Re-reads the authenticated user's profile from the remote store.
    /// Any failure is treated as an authoritative invalid-session signal:
    /// the persisted pair is cleared and the state flips to unauthenticated.
    pub async fn refresh_user(&self) -> Result<User, ClientError> {
        let Some(current) = self.current_user() else {
            return Err(ClientError::Api(ApiError::Unauthenticated));
        };

        match self.fetch_profile(&current.id).await {
            Ok(user) => {
                self.store.upsert(user.clone()).await;
                if let Err(err) = self
                    .storage
                    .set_item(USER_DATA_KEY, &serialize_user(&user)?)
                    .await
                {
                    warn!(error = %err, "failed to persist refreshed profile");
                }
                self.write_state().session.user = Some(user.clone());
                Ok(user)
            }
            Err(err) => {
                warn!(error = %err, "profile refresh failed; treating session as invalid");
                self.clear().await;
                Err(ClientError::Api(err))
            }
        }
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<User, ApiError> {
        let value = self.gateway.get(&endpoints::user_by_id(user_id)).await?;
        Ok(decode::<WireUser>(value)?.to_domain())
    }

    //=====================================================================================
    // Persistence helpers
    //=====================================================================================

    /// Storage first, state second: the in-memory session only flips once
    /// the pair is durably saved.
    async fn persist(&self, user: &User, token: &str) -> Result<(), ClientError> {
        self.storage.set_item(AUTH_TOKEN_KEY, token).await?;
        self.storage
            .set_item(USER_DATA_KEY, &serialize_user(user)?)
            .await?;
        Ok(())
    }

    fn set_authenticated(&self, user: User, token: String) {
        let mut state = self.write_state();
        state.session = Session {
            user: Some(user),
            token: Some(token),
        };
        state.phase = SessionPhase::Authenticated;
    }

    async fn clear(&self) {
        if let Err(err) = self.storage.remove_item(AUTH_TOKEN_KEY).await {
            warn!(error = %err, "failed to clear stored token");
        }
        if let Err(err) = self.storage.remove_item(USER_DATA_KEY).await {
            warn!(error = %err, "failed to clear stored user");
        }
        let mut state = self.write_state();
        state.session = Session::default();
        state.phase = SessionPhase::Unauthenticated;
    }
}

fn serialize_user(user: &User) -> Result<String, ClientError> {
    serde_json::to_string(user)
        .map_err(|e| ClientError::Internal(format!("user record serialization: {}", e)))
}

impl TokenProvider for SessionContext {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{test_config, wire_user, MemoryKeychain, ScriptedTransport};
    use serde_json::json;

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        storage: Arc<MemoryKeychain>,
        session: SessionContext,
    }

    fn fixture() -> Fixture {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!([
            wire_user("1", "Client", "client@test.com", "123123", &[]),
        ]));
        let gateway = Arc::new(ApiGateway::new(transport.clone(), &test_config()));
        let store = Arc::new(LocalUserStore::new(gateway.clone()));
        let storage = MemoryKeychain::new();
        let session = SessionContext::new(gateway, store, storage.clone());
        Fixture {
            transport,
            storage,
            session,
        }
    }

    fn stored_user_json() -> String {
        let user = serde_json::from_value::<WireUser>(wire_user(
            "1",
            "Client",
            "client@test.com",
            "123123",
            &[],
        ))
        .unwrap()
        .to_domain();
        serde_json::to_string(&user).unwrap()
    }

    #[tokio::test]
    async fn initialize_restores_a_persisted_pair() {
        let f = fixture();
        f.storage.set_item(AUTH_TOKEN_KEY, "tok.1.42").await.unwrap();
        f.storage
            .set_item(USER_DATA_KEY, &stored_user_json())
            .await
            .unwrap();

        f.session.initialize().await;
        assert_eq!(f.session.phase(), SessionPhase::Authenticated);
        assert!(f.session.is_authenticated());
        assert_eq!(f.session.token().as_deref(), Some("tok.1.42"));
    }

    #[tokio::test]
    async fn initialize_without_both_keys_is_unauthenticated() {
        let f = fixture();
        f.storage.set_item(AUTH_TOKEN_KEY, "tok.1.42").await.unwrap();

        f.session.initialize().await;
        assert_eq!(f.session.phase(), SessionPhase::Unauthenticated);
        assert!(!f.session.is_authenticated());
    }

    #[tokio::test]
    async fn corrupted_stored_user_clears_the_session() {
        let f = fixture();
        f.storage.set_item(AUTH_TOKEN_KEY, "tok.1.42").await.unwrap();
        f.storage.set_item(USER_DATA_KEY, "{not json").await.unwrap();

        f.session.initialize().await;
        assert_eq!(f.session.phase(), SessionPhase::Unauthenticated);
        assert!(f.storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn login_persists_the_pair_and_flips_the_phase() {
        let f = fixture();
        f.session.initialize().await;

        let user = f
            .session
            .login(&LoginCredentials {
                email: "client@test.com".to_string(),
                password: "123123".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user.id, "1");
        assert_eq!(f.session.phase(), SessionPhase::Authenticated);

        let stored = f.storage.snapshot();
        assert!(stored.contains_key(AUTH_TOKEN_KEY));
        assert!(stored.contains_key(USER_DATA_KEY));
        let token = &stored[AUTH_TOKEN_KEY];
        assert!(!token.contains("client@test.com"));
        assert!(!token.contains("123123"));
    }

    #[tokio::test]
    async fn logout_clears_storage_and_state() {
        let f = fixture();
        f.session.initialize().await;
        f.session
            .login(&LoginCredentials {
                email: "client@test.com".to_string(),
                password: "123123".to_string(),
            })
            .await
            .unwrap();

        f.session.logout().await;
        assert_eq!(f.session.phase(), SessionPhase::Unauthenticated);
        assert!(f.session.current_user().is_none());
        assert!(f.storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn refresh_failure_invalidates_the_session() {
        let f = fixture();
        f.session.initialize().await;
        f.session
            .login(&LoginCredentials {
                email: "client@test.com".to_string(),
                password: "123123".to_string(),
            })
            .await
            .unwrap();

        f.transport.push_json(404, json!({"message": "gone"}));
        let error = f.session.refresh_user().await.unwrap_err();
        assert!(matches!(error, ClientError::Api(ApiError::Http { status: 404, .. })));
        assert_eq!(f.session.phase(), SessionPhase::Unauthenticated);
        assert!(f.storage.snapshot().is_empty());
    }

    #[tokio::test]
    async fn refresh_success_updates_state_and_storage() {
        let f = fixture();
        f.session.initialize().await;
        f.session
            .login(&LoginCredentials {
                email: "client@test.com".to_string(),
                password: "123123".to_string(),
            })
            .await
            .unwrap();

        f.transport
            .push_ok(wire_user("1", "Renamed", "client@test.com", "123123", &[]));
        let user = f.session.refresh_user().await.unwrap();
        assert_eq!(user.name, "Renamed");
        assert_eq!(f.session.current_user().unwrap().name, "Renamed");
        assert!(f.storage.snapshot()[USER_DATA_KEY].contains("Renamed"));
    }

    #[tokio::test]
    async fn refresh_without_a_session_is_rejected() {
        let f = fixture();
        f.session.initialize().await;
        let error = f.session.refresh_user().await.unwrap_err();
        assert!(matches!(error, ClientError::Api(ApiError::Unauthenticated)));
    }
}
