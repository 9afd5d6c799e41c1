//! services/client/src/sync/events.rs
//!
//! Event queries and mutations over the cache: list/detail/search reads with
//! per-operation staleness windows, and the event CRUD mutations with their
//! invalidation cascades.

use std::sync::Arc;

use chrono::Utc;
use eventbook_core::domain::{Event, EventFilters, EventPatch, PaginatedResponse};
use eventbook_core::ports::{ApiError, ApiResult};
use serde::Serialize;
use serde_json::Value;

use crate::config::{ClientConfig, StalePolicy};
use crate::endpoints;
use crate::gateway::{decode, ApiGateway};
use crate::sync::cache::QueryCache;
use crate::sync::keys::event_keys;
use crate::transformers::{WireEvent, WireEventPatch};

pub struct EventQueries {
    gateway: Arc<ApiGateway>,
    cache: Arc<QueryCache>,
    stale: StalePolicy,
}

impl EventQueries {
    pub fn new(gateway: Arc<ApiGateway>, cache: Arc<QueryCache>, config: &ClientConfig) -> Self {
        Self {
            gateway,
            cache,
            stale: config.stale.clone(),
        }
    }

    //=====================================================================================
    // Reads
    //=====================================================================================

    pub async fn list(&self, filters: &EventFilters) -> ApiResult<PaginatedResponse<Event>> {
        let key = event_keys::list(filters);
        let gateway = Arc::clone(&self.gateway);
        let filters = filters.clone();
        self.cache
            .fetch_json(key, self.stale.event_list, move || async move {
                let page = fetch_page(&gateway, &filters).await?;
                to_cache_value(&page)
            })
            .await
    }

    pub async fn detail(&self, id: &str) -> ApiResult<Event> {
        let key = event_keys::detail(id);
        let gateway = Arc::clone(&self.gateway);
        let id = id.to_string();
        self.cache
            .fetch_json(key, self.stale.event_detail, move || async move {
                let value = gateway.get(&endpoints::event_by_id(&id)).await?;
                let event = decode::<WireEvent>(value)?.to_domain();
                to_cache_value(&event)
            })
            .await
    }

    /// The backing store has no search endpoint; filtering happens client
    /// side over the full listing.
    pub async fn search(
        &self,
        query: &str,
        filters: &EventFilters,
    ) -> ApiResult<PaginatedResponse<Event>> {
        let key = event_keys::search(query, filters);
        let gateway = Arc::clone(&self.gateway);
        let query = query.to_lowercase();
        let filters = filters.clone();
        self.cache
            .fetch_json(key, self.stale.event_search, move || async move {
                let page = fetch_page(&gateway, &EventFilters::default()).await?;
                let data: Vec<Event> = page
                    .data
                    .into_iter()
                    .filter(|event| {
                        event.title.to_lowercase().contains(&query)
                            || event.description.to_lowercase().contains(&query)
                            || event.location.to_lowercase().contains(&query)
                    })
                    .collect();
                to_cache_value(&PaginatedResponse {
                    total: data.len(),
                    page: filters.page.unwrap_or(1),
                    limit: filters.limit.unwrap_or(10),
                    data,
                })
            })
            .await
    }

    pub async fn featured(&self, limit: usize) -> ApiResult<Vec<Event>> {
        let key = event_keys::featured();
        let gateway = Arc::clone(&self.gateway);
        self.cache
            .fetch_json(key, self.stale.featured, move || async move {
                let page = fetch_page(&gateway, &EventFilters::default()).await?;
                let featured: Vec<Event> = page.data.into_iter().take(limit).collect();
                to_cache_value(&featured)
            })
            .await
    }

    /// Future-dated events, soonest first.
    pub async fn upcoming(&self, limit: usize) -> ApiResult<Vec<Event>> {
        let key = event_keys::upcoming();
        let gateway = Arc::clone(&self.gateway);
        self.cache
            .fetch_json(key, self.stale.upcoming, move || async move {
                let page = fetch_page(&gateway, &EventFilters::default()).await?;
                let today = Utc::now().format("%Y-%m-%d").to_string();
                let mut upcoming: Vec<Event> = page
                    .data
                    .into_iter()
                    .filter(|event| event.date > today)
                    .collect();
                upcoming.sort_by(|a, b| a.date.cmp(&b.date));
                upcoming.truncate(limit);
                to_cache_value(&upcoming)
            })
            .await
    }

    //=====================================================================================
    // Mutations
    //=====================================================================================

    pub async fn create_event(&self, draft: &EventPatch) -> ApiResult<Event> {
        let value = self
            .gateway
            .post(endpoints::EVENTS, &WireEventPatch::from_domain(draft))
            .await?;
        let event = decode::<WireEvent>(value)?.to_domain();
        self.cache.invalidate_prefix(&event_keys::lists());
        Ok(event)
    }

    pub async fn update_event(&self, id: &str, patch: &EventPatch) -> ApiResult<Event> {
        let value = self
            .gateway
            .put(&endpoints::event_by_id(id), &WireEventPatch::from_domain(patch))
            .await?;
        let event = decode::<WireEvent>(value)?.to_domain();
        // The response is authoritative: write it through to the detail
        // entry, then force list refetches.
        self.cache
            .set_data(&event_keys::detail(id), self.stale.event_detail, &event);
        self.cache.invalidate_prefix(&event_keys::lists());
        Ok(event)
    }

    pub async fn delete_event(&self, id: &str) -> ApiResult<()> {
        self.gateway.delete(&endpoints::event_by_id(id)).await?;
        self.cache.remove(&event_keys::detail(id));
        self.cache.invalidate_prefix(&event_keys::lists());
        Ok(())
    }
}

/// `GET /events` plus the page envelope the listing callers expect.
async fn fetch_page(
    gateway: &ApiGateway,
    filters: &EventFilters,
) -> ApiResult<PaginatedResponse<Event>> {
    let query = endpoints::build_query(&endpoints::event_filter_params(filters));
    let value = gateway
        .get(&format!("{}{}", endpoints::EVENTS, query))
        .await?;
    let wire: Vec<WireEvent> = decode(value)?;
    let data: Vec<Event> = wire.iter().map(WireEvent::to_domain).collect();
    Ok(PaginatedResponse {
        total: data.len(),
        page: filters.page.unwrap_or(1),
        limit: filters.limit.unwrap_or(10),
        data,
    })
}

fn to_cache_value<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}
