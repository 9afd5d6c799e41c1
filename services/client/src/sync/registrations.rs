//! services/client/src/sync/registrations.rs
//!
//! The registration protocol: one canonical `Registration` model over a
//! pluggable persistence seam, optimistic cache mutation as an explicit
//! transaction, and the invalidation cascade that forces authoritative
//! refetches after every successful write.

use std::sync::Arc;

use async_trait::async_trait;
use eventbook_core::domain::{Event, Registration, RegistrationStatus, User};
use eventbook_core::ports::{ApiError, ApiResult};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::config::{ClientConfig, StalePolicy};
use crate::endpoints;
use crate::gateway::{decode, ApiGateway};
use crate::store::LocalUserStore;
use crate::sync::cache::{CacheTransaction, QueryCache};
use crate::sync::events::EventQueries;
use crate::sync::keys::{event_keys, registration_keys};
use crate::sync::session::SessionContext;
use crate::transformers::{WireRegistration, WireRegistrationCreate, WireUser, WireUserPatch};

//=========================================================================================
// Persistence seam
//=========================================================================================

/// Where registrations live remotely. The orchestrator is agnostic: both
/// implementations speak the canonical `Registration` model.
#[async_trait]
pub trait RegistrationBackend: Send + Sync {
    async fn register(&self, user: &User, event_id: &str) -> ApiResult<Registration>;

    async fn cancel(&self, user: &User, registration: &Registration) -> ApiResult<()>;

    async fn registrations_for_user(&self, user_id: &str) -> ApiResult<Vec<Registration>>;

    async fn registrations_for_event(&self, event_id: &str) -> ApiResult<Vec<Registration>>;
}

/// The canonical strategy: a dedicated `/registrations` resource.
pub struct DedicatedBackend {
    gateway: Arc<ApiGateway>,
}

impl DedicatedBackend {
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl RegistrationBackend for DedicatedBackend {
    async fn register(&self, user: &User, event_id: &str) -> ApiResult<Registration> {
        let payload = WireRegistrationCreate::with_user_details(event_id, user);
        let value = self.gateway.post(endpoints::REGISTRATIONS, &payload).await?;
        Ok(decode::<WireRegistration>(value)?.to_domain())
    }

    async fn cancel(&self, _user: &User, registration: &Registration) -> ApiResult<()> {
        self.gateway
            .delete(&endpoints::registration_by_id(&registration.id))
            .await?;
        Ok(())
    }

    async fn registrations_for_user(&self, user_id: &str) -> ApiResult<Vec<Registration>> {
        let query = endpoints::build_query(&[("userId", Some(user_id.to_string()))]);
        let value = self
            .gateway
            .get(&format!("{}{}", endpoints::REGISTRATIONS, query))
            .await?;
        Ok(decode::<Vec<WireRegistration>>(value)?
            .iter()
            .map(WireRegistration::to_domain)
            .collect())
    }

    async fn registrations_for_event(&self, event_id: &str) -> ApiResult<Vec<Registration>> {
        let query = endpoints::build_query(&[("eventId", Some(event_id.to_string()))]);
        let value = self
            .gateway
            .get(&format!("{}{}", endpoints::REGISTRATIONS, query))
            .await?;
        Ok(decode::<Vec<WireRegistration>>(value)?
            .iter()
            .map(WireRegistration::to_domain)
            .collect())
    }
}

/// The mirrored strategy: registrations are a pure projection of the user
/// document's `registeredEventIds` list. Never a second source of truth —
/// every read derives from the document, every write goes through it.
pub struct MirroredBackend {
    gateway: Arc<ApiGateway>,
    store: Arc<LocalUserStore>,
}

impl MirroredBackend {
    pub fn new(gateway: Arc<ApiGateway>, store: Arc<LocalUserStore>) -> Self {
        Self { gateway, store }
    }

    /// Authoritative read of the user document; the local cache may lag
    /// behind another device.
    async fn fetch_user(&self, user_id: &str) -> ApiResult<User> {
        let value = self.gateway.get(&endpoints::user_by_id(user_id)).await?;
        Ok(decode::<WireUser>(value)?.to_domain())
    }

    async fn write_ids(&self, user_id: &str, ids: Vec<String>) -> ApiResult<()> {
        self.gateway
            .put(
                &endpoints::user_by_id(user_id),
                &WireUserPatch::registered_events(ids.clone()),
            )
            .await?;
        self.store.sync_registered_events(user_id, ids).await;
        Ok(())
    }
}

fn project(user: &User, event_id: &str) -> Registration {
    Registration {
        // Composite key: the mirror has no registration ids of its own.
        id: format!("{}-{}", user.id, event_id),
        user_id: user.id.clone(),
        event_id: event_id.to_string(),
        // The mirror carries no timestamps; reuse the document's.
        registered_at: user.created_at,
        status: RegistrationStatus::Confirmed,
    }
}

#[async_trait]
impl RegistrationBackend for MirroredBackend {
    async fn register(&self, user: &User, event_id: &str) -> ApiResult<Registration> {
        let current = self.fetch_user(&user.id).await?;
        let mut ids = current.registered_event_ids.clone();
        if !ids.iter().any(|id| id == event_id) {
            ids.push(event_id.to_string());
        }
        self.write_ids(&user.id, ids).await?;
        Ok(project(&current, event_id))
    }

    async fn cancel(&self, user: &User, registration: &Registration) -> ApiResult<()> {
        let current = self.fetch_user(&user.id).await?;
        let ids: Vec<String> = current
            .registered_event_ids
            .iter()
            .filter(|id| id.as_str() != registration.event_id)
            .cloned()
            .collect();
        self.write_ids(&user.id, ids).await
    }

    async fn registrations_for_user(&self, user_id: &str) -> ApiResult<Vec<Registration>> {
        let user = self.fetch_user(user_id).await?;
        Ok(user
            .registered_event_ids
            .iter()
            .map(|event_id| project(&user, event_id))
            .collect())
    }

    async fn registrations_for_event(&self, event_id: &str) -> ApiResult<Vec<Registration>> {
        self.store.ensure_initialized().await?;
        Ok(self
            .store
            .all_users()
            .await
            .iter()
            .filter(|user| user.registered_event_ids.iter().any(|id| id == event_id))
            .map(|user| project(user, event_id))
            .collect())
    }
}

//=========================================================================================
// Orchestrator
//=========================================================================================

/// A registration joined with its event detail, as the dashboard renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardEntry {
    pub registration: Registration,
    pub event: Event,
}

pub struct RegistrationQueries {
    cache: Arc<QueryCache>,
    session: Arc<SessionContext>,
    events: Arc<EventQueries>,
    backend: Arc<dyn RegistrationBackend>,
    stale: StalePolicy,
}

impl RegistrationQueries {
    pub fn new(
        cache: Arc<QueryCache>,
        session: Arc<SessionContext>,
        events: Arc<EventQueries>,
        backend: Arc<dyn RegistrationBackend>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            cache,
            session,
            events,
            backend,
            stale: config.stale.clone(),
        }
    }

    fn current_user(&self) -> ApiResult<User> {
        self.session.current_user().ok_or(ApiError::Unauthenticated)
    }

    //=====================================================================================
    // Mutations
    //=====================================================================================

    pub async fn register_for_event(&self, event_id: &str) -> ApiResult<Registration> {
        let user = self.current_user()?;
        let detail_key = event_keys::detail(event_id);

        // Sold-out events are rejected locally, before any network traffic
        // or optimistic write.
        if let Some(event) = self.cache.get_data::<Event>(&detail_key) {
            if event.is_sold_out() {
                return Err(ApiError::EventFull);
            }
        }

        // Optimism is applied before the write is dispatched, so the UI
        // reflects it ahead of any interleaved re-render.
        let mut txn = CacheTransaction::begin(&self.cache);
        txn.apply::<Event>(&detail_key, |mut event| {
            event.available_spots = event.available_spots.saturating_sub(1);
            event
        });

        match self.backend.register(&user, event_id).await {
            Ok(registration) => {
                txn.commit();
                self.invalidate_after_mutation(&user.id, event_id);
                Ok(registration)
            }
            Err(err) => {
                warn!(error = %err, event_id, "registration write failed; rolling back optimism");
                txn.rollback();
                Err(err)
            }
        }
    }

    pub async fn cancel_registration(&self, registration_id: &str) -> ApiResult<()> {
        let user = self.current_user()?;
        let registration = self
            .user_registrations()
            .await?
            .into_iter()
            .find(|r| r.id == registration_id)
            .ok_or_else(|| ApiError::NotFound(format!("No registration {}", registration_id)))?;

        let detail_key = event_keys::detail(&registration.event_id);
        let list_key = registration_keys::by_user(&user.id);
        let registration_id = registration_id.to_string();

        let mut txn = CacheTransaction::begin(&self.cache);
        txn.apply::<Event>(&detail_key, |mut event| {
            event.available_spots = (event.available_spots + 1).min(event.capacity);
            event
        });
        txn.apply::<Vec<Registration>>(&list_key, |registrations| {
            registrations
                .into_iter()
                .filter(|r| r.id != registration_id)
                .collect()
        });

        match self.backend.cancel(&user, &registration).await {
            Ok(()) => {
                txn.commit();
                self.invalidate_after_mutation(&user.id, &registration.event_id);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, registration_id, "cancellation failed; rolling back optimism");
                txn.rollback();
                Err(err)
            }
        }
    }

    /// The authoritative values win on the next read: the user's
    /// registration-list group and the event detail are refetched rather
    /// than patched.
    fn invalidate_after_mutation(&self, user_id: &str, event_id: &str) {
        self.cache
            .invalidate_prefix(&registration_keys::by_user(user_id));
        self.cache.remove(&event_keys::detail(event_id));
        self.cache
            .remove(&registration_keys::status(user_id, event_id));
    }

    //=====================================================================================
    // Reads
    //=====================================================================================

    pub async fn user_registrations(&self) -> ApiResult<Vec<Registration>> {
        let user = self.current_user()?;
        let key = registration_keys::by_user(&user.id);
        let backend = Arc::clone(&self.backend);
        let user_id = user.id;
        self.cache
            .fetch_json(key, self.stale.user_registrations, move || async move {
                let registrations =
                    empty_when_missing(backend.registrations_for_user(&user_id).await)?;
                to_cache_value(&confirmed_only(registrations))
            })
            .await
    }

    pub async fn registration_status(&self, event_id: &str) -> ApiResult<Option<Registration>> {
        let user = self.current_user()?;
        let key = registration_keys::status(&user.id, event_id);
        let backend = Arc::clone(&self.backend);
        let user_id = user.id;
        let event_id = event_id.to_string();
        self.cache
            .fetch_json(key, self.stale.registration_status, move || async move {
                let registrations =
                    empty_when_missing(backend.registrations_for_user(&user_id).await)?;
                let hit = confirmed_only(registrations)
                    .into_iter()
                    .find(|r| r.event_id == event_id);
                to_cache_value(&hit)
            })
            .await
    }

    pub async fn event_registrations(&self, event_id: &str) -> ApiResult<Vec<Registration>> {
        let key = registration_keys::by_event(event_id);
        let backend = Arc::clone(&self.backend);
        let event_id = event_id.to_string();
        self.cache
            .fetch_json(key, self.stale.user_registrations, move || async move {
                let registrations =
                    empty_when_missing(backend.registrations_for_event(&event_id).await)?;
                to_cache_value(&confirmed_only(registrations))
            })
            .await
    }

    /// Dashboard projection: every registration enriched with its event
    /// detail (served from the detail cache where possible).
    pub async fn registered_events(&self) -> ApiResult<Vec<DashboardEntry>> {
        let registrations = self.user_registrations().await?;
        let mut entries = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let event = self.events.detail(&registration.event_id).await?;
            entries.push(DashboardEntry {
                registration,
                event,
            });
        }
        Ok(entries)
    }
}

/// A brand-new user may not have a registration collection yet; a 404 on a
/// registration-list read means "empty", not "error". Deliberately scoped
/// here rather than in the gateway so other 404s keep their meaning.
fn empty_when_missing(result: ApiResult<Vec<Registration>>) -> ApiResult<Vec<Registration>> {
    match result {
        Err(ApiError::Http { status: 404, .. }) => Ok(Vec::new()),
        other => other,
    }
}

fn confirmed_only(registrations: Vec<Registration>) -> Vec<Registration> {
    registrations
        .into_iter()
        .filter(|r| r.status != RegistrationStatus::Cancelled)
        .collect()
}

fn to_cache_value<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}
