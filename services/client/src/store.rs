//! services/client/src/store.rs
//!
//! The local user store / auth simulator: a process-wide cache of the full
//! user collection, fetched once and used for credential checks, signup and
//! profile mutation. Remote persistence is write-through and best-effort;
//! the in-memory list is the source of truth for lookups.

use std::sync::Arc;

use chrono::Utc;
use eventbook_core::domain::{AuthResponse, User, UserPatch};
use eventbook_core::ports::{ApiError, ApiResult};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::endpoints;
use crate::gateway::{decode, ApiGateway};
use crate::transformers::{dedupe_ids, WireUser, WireUserPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

pub struct LocalUserStore {
    gateway: Arc<ApiGateway>,
    phase: RwLock<StorePhase>,
    users: RwLock<Vec<User>>,
    init_lock: Mutex<()>,
}

impl LocalUserStore {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self {
            gateway,
            phase: RwLock::new(StorePhase::Uninitialized),
            users: RwLock::new(Vec::new()),
            init_lock: Mutex::new(()),
        }
    }

    pub async fn phase(&self) -> StorePhase {
        *self.phase.read().await
    }

    /// Primes the store from `GET /users`. Runs the fetch at most once:
    /// `Ready` is terminal, concurrent callers coalesce on the init lock,
    /// and only a `Failed` store will try again on a later call.
    pub async fn ensure_initialized(&self) -> ApiResult<()> {
        if *self.phase.read().await == StorePhase::Ready {
            return Ok(());
        }
        let _guard = self.init_lock.lock().await;
        if *self.phase.read().await == StorePhase::Ready {
            return Ok(());
        }

        *self.phase.write().await = StorePhase::Loading;
        match self.fetch_all().await {
            Ok(users) => {
                info!(count = users.len(), "local user store primed");
                *self.users.write().await = users;
                *self.phase.write().await = StorePhase::Ready;
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "failed to prime local user store");
                *self.phase.write().await = StorePhase::Failed;
                Err(err)
            }
        }
    }

    async fn fetch_all(&self) -> ApiResult<Vec<User>> {
        let value = self.gateway.get(endpoints::USERS).await?;
        let wire: Vec<WireUser> = decode(value)?;
        Ok(wire.iter().map(WireUser::to_domain).collect())
    }

    /// Tears the store back down to its pristine state. Test isolation hook.
    pub async fn reset(&self) {
        let _guard = self.init_lock.lock().await;
        self.users.write().await.clear();
        *self.phase.write().await = StorePhase::Uninitialized;
    }

    /// Pure cache lookup; never touches the network once the store is ready.
    pub async fn find_by_email(&self, email: &str) -> Option<User> {
        self.users
            .read()
            .await
            .iter()
            .find(|u| u.email == email)
            .cloned()
    }

    pub async fn find_by_id(&self, id: &str) -> Option<User> {
        self.users.read().await.iter().find(|u| u.id == id).cloned()
    }

    pub async fn all_users(&self) -> Vec<User> {
        self.users.read().await.clone()
    }

    //=====================================================================================
    // Auth operations
    //=====================================================================================

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        self.ensure_initialized().await?;
        let user = self
            .find_by_email(email)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("No account for {}", email)))?;
        // Development-mode simulation: the backing fixture stores plaintext
        // passwords, so this is a plain equality check. Not for production.
        if user.password != password {
            return Err(ApiError::InvalidCredentials);
        }
        Ok(AuthResponse {
            token: issue_token(&user.id),
            user,
        })
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> ApiResult<AuthResponse> {
        self.ensure_initialized().await?;
        if self.find_by_email(email).await.is_some() {
            return Err(ApiError::AlreadyExists(email.to_string()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            avatar: None,
            registered_event_ids: Vec::new(),
            created_at: Utc::now(),
        };

        // Local-first: insert before the remote write so a login in the same
        // session succeeds even if persistence fails.
        self.users.write().await.push(user.clone());

        if let Err(err) = self
            .gateway
            .post(endpoints::USERS, &WireUserPatch::from_new_user(&user))
            .await
        {
            warn!(error = %err, email, "write-through of new user failed; keeping local copy");
        }

        Ok(AuthResponse {
            token: issue_token(&user.id),
            user,
        })
    }

    pub async fn update_profile(&self, id: &str, patch: UserPatch) -> ApiResult<User> {
        self.ensure_initialized().await?;
        let updated = {
            let mut users = self.users.write().await;
            let user = users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| ApiError::NotFound(format!("No user with id {}", id)))?;
            apply_patch(user, &patch);
            user.clone()
        };

        if let Err(err) = self
            .gateway
            .put(&endpoints::user_by_id(id), &WireUserPatch::from_patch(&patch))
            .await
        {
            warn!(error = %err, id, "write-through of profile update failed; keeping local copy");
        }

        Ok(updated)
    }

    /// Replaces the cached copy of a user after an authoritative profile
    /// refresh, or appends it if the priming fetch predates the account.
    pub async fn upsert(&self, user: User) {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(existing) => *existing = user,
            None => users.push(user),
        }
    }

    /// Brings the in-memory copy of a user's registered-event list in line
    /// with what the mirrored registration backend just persisted.
    pub async fn sync_registered_events(&self, user_id: &str, ids: Vec<String>) {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == user_id) {
            user.registered_event_ids = dedupe_ids(&ids);
        }
    }
}

fn apply_patch(user: &mut User, patch: &UserPatch) {
    if let Some(name) = &patch.name {
        user.name = name.clone();
    }
    if let Some(email) = &patch.email {
        user.email = email.clone();
    }
    if let Some(password) = &patch.password {
        user.password = password.clone();
    }
    if let Some(avatar) = &patch.avatar {
        user.avatar = Some(avatar.clone());
    }
    if let Some(ids) = &patch.registered_event_ids {
        user.registered_event_ids = dedupe_ids(ids);
    }
}

/// Tokens are opaque development placeholders: user id plus issuance
/// timestamp, no credential material, nothing verifiable.
fn issue_token(user_id: &str) -> String {
    format!("tok.{}.{}", user_id, Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{test_config, wire_user, ScriptedTransport};
    use serde_json::json;

    fn store_with(transport: &Arc<ScriptedTransport>) -> LocalUserStore {
        let gateway = Arc::new(ApiGateway::new(transport.clone(), &test_config()));
        LocalUserStore::new(gateway)
    }

    fn seeded_transport() -> Arc<ScriptedTransport> {
        let transport = ScriptedTransport::new();
        transport.push_ok(json!([
            wire_user("1", "Client", "client@test.com", "123123", &[]),
            wire_user("2", "Other", "other@test.com", "qwerty", &["e1"]),
        ]));
        transport
    }

    #[tokio::test]
    async fn initialization_fetches_the_collection_exactly_once() {
        let transport = seeded_transport();
        let store = store_with(&transport);

        let (a, b) = tokio::join!(store.ensure_initialized(), store.ensure_initialized());
        a.unwrap();
        b.unwrap();
        store.ensure_initialized().await.unwrap();

        assert_eq!(transport.request_count(), 1);
        assert_eq!(store.phase().await, StorePhase::Ready);
    }

    #[tokio::test]
    async fn lookups_never_hit_the_network_once_ready() {
        let transport = seeded_transport();
        let store = store_with(&transport);
        store.ensure_initialized().await.unwrap();

        assert!(store.find_by_email("client@test.com").await.is_some());
        assert!(store.find_by_email("missing@test.com").await.is_none());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn failed_initialization_may_retry_later() {
        let transport = ScriptedTransport::new();
        transport.push_json(400, json!({"message": "nope"}));
        transport.push_ok(json!([]));
        let store = store_with(&transport);

        assert!(store.ensure_initialized().await.is_err());
        assert_eq!(store.phase().await, StorePhase::Failed);

        store.ensure_initialized().await.unwrap();
        assert_eq!(store.phase().await, StorePhase::Ready);
    }

    #[tokio::test]
    async fn login_succeeds_against_the_preloaded_fixture() {
        let store = store_with(&seeded_transport());
        let auth = store.login("client@test.com", "123123").await.unwrap();
        assert_eq!(auth.user.id, "1");
        assert!(!auth.token.is_empty());
        assert!(!auth.token.contains("client@test.com"));
        assert!(!auth.token.contains("123123"));
    }

    #[tokio::test]
    async fn login_distinguishes_missing_accounts_from_bad_passwords() {
        let store = store_with(&seeded_transport());
        assert!(matches!(
            store.login("nobody@test.com", "123123").await.unwrap_err(),
            ApiError::NotFound(_)
        ));
        assert_eq!(
            store.login("client@test.com", "wrong").await.unwrap_err(),
            ApiError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn signup_then_login_returns_the_same_identity() {
        let transport = seeded_transport();
        transport.push_ok(json!({}));
        let store = store_with(&transport);

        let created = store
            .signup("New User", "new@test.com", "hunter2")
            .await
            .unwrap();
        let logged_in = store.login("new@test.com", "hunter2").await.unwrap();
        assert_eq!(created.user.id, logged_in.user.id);
    }

    #[tokio::test]
    async fn signup_with_existing_email_never_mutates_the_store() {
        let transport = seeded_transport();
        let store = store_with(&transport);
        store.ensure_initialized().await.unwrap();
        let before = store.all_users().await.len();

        let error = store
            .signup("Dup", "client@test.com", "whatever")
            .await
            .unwrap_err();
        assert_eq!(error, ApiError::AlreadyExists("client@test.com".to_string()));
        assert_eq!(store.all_users().await.len(), before);
        // Only the priming fetch went out; no write was attempted.
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn signup_survives_a_failed_write_through() {
        let transport = seeded_transport();
        transport.push_json(400, json!({"message": "storage offline"}));
        let store = store_with(&transport);

        let created = store
            .signup("Offline", "offline@test.com", "pw1234")
            .await
            .unwrap();
        // The local insert stands, so a login in the same session works.
        let auth = store.login("offline@test.com", "pw1234").await.unwrap();
        assert_eq!(auth.user.id, created.user.id);
    }

    #[tokio::test]
    async fn minted_ids_are_not_sequential() {
        let transport = seeded_transport();
        transport.push_ok(json!({}));
        let store = store_with(&transport);

        let created = store.signup("New", "n@test.com", "pw1234").await.unwrap();
        assert_ne!(created.user.id, "3");
        assert!(created.user.id.len() >= 32);
    }

    #[tokio::test]
    async fn update_profile_merges_and_write_through_is_best_effort() {
        let transport = seeded_transport();
        transport.push_json(400, json!({"message": "nope"}));
        let store = store_with(&transport);
        store.ensure_initialized().await.unwrap();

        let updated = store
            .update_profile(
                "2",
                UserPatch {
                    name: Some("Renamed".to_string()),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, "other@test.com");
        assert_eq!(
            store.find_by_id("2").await.unwrap().name,
            "Renamed".to_string()
        );
    }

    #[tokio::test]
    async fn update_profile_of_unknown_id_fails() {
        let store = store_with(&seeded_transport());
        let error = store
            .update_profile("missing", UserPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(error, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn reset_returns_the_store_to_pristine_state() {
        let transport = seeded_transport();
        transport.push_ok(json!([]));
        let store = store_with(&transport);
        store.ensure_initialized().await.unwrap();

        store.reset().await;
        assert_eq!(store.phase().await, StorePhase::Uninitialized);
        assert!(store.all_users().await.is_empty());

        store.ensure_initialized().await.unwrap();
        assert_eq!(transport.request_count(), 2);
    }
}
