//! services/client/src/sync/cache.rs
//!
//! The keyed query cache: one entry per structured key, holding the last
//! decoded value, its freshness bookkeeping and its status. At most one
//! request is ever in flight per key; identical concurrent fetches share the
//! same pending result. Stale entries are served immediately while a
//! background refetch runs, and an authoritative refetch always overwrites
//! whatever optimistic state was sitting in the entry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use eventbook_core::ports::{ApiError, ApiResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

//=========================================================================================
// Keys
//=========================================================================================

/// A hierarchical cache key. Keys sharing a leading segment sequence form an
/// invalidation group: invalidating `events/list` hits every
/// `events/list/...` entry regardless of trailing parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn push(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

//=========================================================================================
// Entries
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Option<Value>,
    error: Option<ApiError>,
    fetched_at: Option<Instant>,
    ttl: Duration,
    status: QueryStatus,
}

impl CacheEntry {
    fn empty(ttl: Duration) -> Self {
        Self {
            data: None,
            error: None,
            fetched_at: None,
            ttl,
            status: QueryStatus::Idle,
        }
    }

    fn fresh(&self) -> bool {
        self.fetched_at
            .map_or(false, |at| at.elapsed() < self.ttl)
    }
}

type SharedFetch = Shared<BoxFuture<'static, ApiResult<Value>>>;

//=========================================================================================
// The Cache
//=========================================================================================

#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    inflight: Mutex<HashMap<QueryKey, SharedFetch>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn inflight(&self) -> MutexGuard<'_, HashMap<QueryKey, SharedFetch>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches through the cache and decodes the value into `T`.
    pub async fn fetch_json<T, F, Fut>(
        self: &Arc<Self>,
        key: QueryKey,
        ttl: Duration,
        fetch: F,
    ) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        let value = self.fetch_value(key, ttl, fetch).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// The read path. Fresh hit: cached value, no network. Stale hit: cached
    /// value now, refetch in the background. Miss: fetch (coalesced with any
    /// identical in-flight request).
    pub async fn fetch_value<F, Fut>(
        self: &Arc<Self>,
        key: QueryKey,
        ttl: Duration,
        fetch: F,
    ) -> ApiResult<Value>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        enum Plan {
            Hit(Value),
            Revalidate(Value),
            Fetch,
        }

        let plan = {
            let entries = self.entries();
            match entries.get(&key) {
                Some(entry) if entry.data.is_some() && entry.fresh() => {
                    Plan::Hit(entry.data.clone().unwrap_or(Value::Null))
                }
                Some(entry) if entry.data.is_some() => {
                    Plan::Revalidate(entry.data.clone().unwrap_or(Value::Null))
                }
                _ => Plan::Fetch,
            }
        };

        match plan {
            Plan::Hit(value) => Ok(value),
            Plan::Revalidate(value) => {
                debug!(key = %key, "serving stale value, revalidating in background");
                let refresh = self.join_or_spawn(key, ttl, fetch);
                tokio::spawn(refresh);
                Ok(value)
            }
            Plan::Fetch => self.join_or_spawn(key, ttl, fetch).await,
        }
    }

    /// At most one request per key: a caller either starts the fetch or
    /// joins the one already in flight.
    fn join_or_spawn<F, Fut>(self: &Arc<Self>, key: QueryKey, ttl: Duration, fetch: F) -> SharedFetch
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ApiResult<Value>> + Send + 'static,
    {
        let mut inflight = self.inflight();
        if let Some(existing) = inflight.get(&key) {
            return existing.clone();
        }

        self.mark_loading(&key, ttl);
        let cache = Arc::clone(self);
        let task_key = key.clone();
        let future = async move {
            let result = fetch().await;
            cache.record(&task_key, ttl, &result);
            cache.inflight().remove(&task_key);
            result
        }
        .boxed()
        .shared();
        inflight.insert(key, future.clone());
        future
    }

    fn mark_loading(&self, key: &QueryKey, ttl: Duration) {
        let mut entries = self.entries();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::empty(ttl));
        // A revalidating entry keeps serving its data; only a data-less
        // entry is observably loading.
        if entry.data.is_none() {
            entry.status = QueryStatus::Loading;
        }
    }

    fn record(&self, key: &QueryKey, ttl: Duration, result: &ApiResult<Value>) {
        let mut entries = self.entries();
        let entry = entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::empty(ttl));
        entry.ttl = ttl;
        entry.fetched_at = Some(Instant::now());
        match result {
            Ok(value) => {
                entry.data = Some(value.clone());
                entry.error = None;
                entry.status = QueryStatus::Success;
            }
            Err(error) => {
                entry.data = None;
                entry.error = Some(error.clone());
                entry.status = QueryStatus::Error;
            }
        }
    }

    //=====================================================================================
    // Direct access & mutation
    //=====================================================================================

    /// Raw read of the cached value, if any.
    pub fn peek(&self, key: &QueryKey) -> Option<Value> {
        self.entries().get(key).and_then(|entry| entry.data.clone())
    }

    /// Typed read of the cached value, if present and decodable.
    pub fn get_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        self.peek(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// The failure recorded for an entry, if its last fetch errored.
    pub fn last_error(&self, key: &QueryKey) -> Option<ApiError> {
        self.entries().get(key).and_then(|entry| entry.error.clone())
    }

    /// Writes a value straight into an entry, marking it fresh.
    pub fn set_data<T: Serialize>(&self, key: &QueryKey, ttl: Duration, value: &T) {
        match serde_json::to_value(value) {
            Ok(value) => {
                let mut entries = self.entries();
                let entry = entries
                    .entry(key.clone())
                    .or_insert_with(|| CacheEntry::empty(ttl));
                entry.data = Some(value);
                entry.error = None;
                entry.ttl = ttl;
                entry.fetched_at = Some(Instant::now());
                entry.status = QueryStatus::Success;
            }
            Err(error) => warn!(key = %key, %error, "failed to serialize cache write"),
        }
    }

    /// Applies a typed edit to a cached entry in place. Returns `false` when
    /// the entry is absent or not decodable as `T`.
    pub fn update_data<T>(&self, key: &QueryKey, edit: impl FnOnce(T) -> T) -> bool
    where
        T: DeserializeOwned + Serialize,
    {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        let Some(data) = entry.data.clone() else {
            return false;
        };
        let Ok(typed) = serde_json::from_value::<T>(data) else {
            return false;
        };
        match serde_json::to_value(edit(typed)) {
            Ok(value) => {
                entry.data = Some(value);
                true
            }
            Err(_) => false,
        }
    }

    fn restore(&self, key: &QueryKey, value: Value) {
        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.data = Some(value);
        }
    }

    /// Discards every entry whose key starts with the given prefix and no
    /// others. Returns the number of entries dropped.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        let dropped = before - entries.len();
        debug!(prefix = %prefix, dropped, "invalidated key prefix");
        dropped
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        self.entries().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        self.entries()
            .get(key)
            .map_or(QueryStatus::Idle, |entry| entry.status)
    }
}

//=========================================================================================
// Cache Transactions
//=========================================================================================

/// An explicit apply/commit/rollback unit over the cache, so that every
/// optimistic mutation exercises the same rollback path instead of ad-hoc
/// inline edits.
pub struct CacheTransaction<'a> {
    cache: &'a QueryCache,
    undo: Vec<(QueryKey, Value)>,
}

impl<'a> CacheTransaction<'a> {
    pub fn begin(cache: &'a QueryCache) -> Self {
        Self {
            cache,
            undo: Vec::new(),
        }
    }

    /// Applies a typed edit to one entry, snapshotting the previous value.
    /// Absent entries are left untouched and recorded as no-ops.
    pub fn apply<T>(&mut self, key: &QueryKey, edit: impl FnOnce(T) -> T) -> bool
    where
        T: DeserializeOwned + Serialize,
    {
        let previous = self.cache.peek(key);
        if !self.cache.update_data(key, edit) {
            return false;
        }
        if let Some(previous) = previous {
            self.undo.push((key.clone(), previous));
        }
        true
    }

    /// The optimistic writes stand; the undo log is dropped.
    pub fn commit(self) {}

    /// Restores every touched entry to its pre-transaction value, in
    /// reverse order.
    pub fn rollback(self) {
        for (key, previous) in self.undo.into_iter().rev() {
            self.cache.restore(&key, previous);
        }
    }
}
