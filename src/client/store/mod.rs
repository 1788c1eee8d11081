//! Tag-indexed request cache
//!
//! [`QueryStore`] is the single shared mutable resource of the client.
//! Entries are keyed structurally by [`key::QueryKey`], deliver state to
//! subscribers over watch channels, and are invalidated by tag fan-out
//! from mutations. All bookkeeping is serialized through one mutex; no
//! lock is ever held across an await point.
//!
//! Ordering rule: every fetch issued for a key gets a monotonically
//! increasing generation, and a response is applied only when its
//! generation is newer than the last applied one. A stale response that
//! resolves after a newer one has landed is counted and dropped.

pub mod entry;
pub mod key;
pub mod subscription;
pub mod tags;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::client::errors::{FetchError, FetchResult};
use crate::client::http::Fetcher;
use crate::client::registry::{MutationDef, QueryDef};
use crate::telemetry::{ClientStats, StatsSnapshot};
use entry::{EntrySlot, QueryStatus, TagProvider};
use key::QueryKey;
use subscription::Subscription;
use tags::{intersects, Tag};

/// Tag-indexed cache of request results with subscription delivery.
///
/// Cheap to clone; all clones share the same entries. Must be used from
/// within a Tokio runtime: fetches, retention timers and poll ticks are
/// spawned tasks.
#[derive(Clone)]
pub struct QueryStore {
    inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    fetcher: Arc<dyn Fetcher>,
    retention: Duration,
    entries: Mutex<HashMap<QueryKey, EntrySlot>>,
    stats: ClientStats,
}

impl StoreInner {
    pub(crate) fn lock_entries(&self) -> MutexGuard<'_, HashMap<QueryKey, EntrySlot>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_if_idle(&self, key: &QueryKey) {
        let mut entries = self.lock_entries();
        if let Some(slot) = entries.get(key) {
            if slot.subscriber_count == 0 {
                entries.remove(key);
                self.stats.record_eviction();
                log::trace!("evicted {} after retention window", key);
            }
        }
    }

    fn apply_response(&self, key: &QueryKey, generation: u64, result: FetchResult<Value>) {
        let mut entries = self.lock_entries();
        let Some(slot) = entries.get_mut(key) else {
            // entry evicted while the request was in flight
            self.stats.record_stale_response_discarded();
            log::trace!("dropping response for evicted entry {}", key);
            return;
        };
        if generation <= slot.applied {
            self.stats.record_stale_response_discarded();
            log::debug!(
                "discarding out-of-order response for {} (generation {} <= {})",
                key,
                generation,
                slot.applied
            );
            return;
        }
        slot.applied = generation;
        match result {
            Ok(value) => slot.apply_success(value),
            Err(error) => {
                log::warn!("fetch for {} failed: {}", key, error);
                slot.apply_error(error);
            }
        }
    }
}

/// Issue one fetch for `key` using the slot's prototype request.
///
/// Bumps the issuance generation, flips the entry to Loading while
/// keeping prior data visible, and spawns the response application.
pub(crate) fn issue_fetch(inner: &Arc<StoreInner>, key: &QueryKey, slot: &mut EntrySlot) {
    slot.issued += 1;
    let generation = slot.issued;
    slot.last_issued_at = Some(Instant::now());
    slot.stale = false;
    slot.mark_loading();
    inner.stats.record_request_issued();
    log::trace!("issuing fetch for {} (generation {})", key, generation);

    let future = inner.fetcher.dispatch(slot.request.clone());
    let inner = Arc::clone(inner);
    let key = key.clone();
    tokio::spawn(async move {
        let result = future.await;
        inner.apply_response(&key, generation, result);
    });
}

/// Manual refetch for a live key. No-op if the entry has been evicted.
pub(crate) fn refetch_key(inner: &Arc<StoreInner>, key: &QueryKey) {
    let mut entries = inner.lock_entries();
    if let Some(slot) = entries.get_mut(key) {
        inner.stats.record_refetch();
        issue_fetch(inner, key, slot);
    }
}

/// One poll tick for `key`. Returns false when the entry is gone or has
/// no subscribers left, which tells the poll task to stop. A tick that
/// finds a fetch issued within the last interval skips re-issuing, so
/// manual refetches and invalidations reset the pacing.
pub(crate) fn poll_tick(inner: &Arc<StoreInner>, key: &QueryKey, interval: Duration) -> bool {
    let mut entries = inner.lock_entries();
    let Some(slot) = entries.get_mut(key) else {
        return false;
    };
    if slot.subscriber_count == 0 {
        return false;
    }
    inner.stats.record_poll_tick();
    let recently_issued = slot
        .last_issued_at
        .map(|at| at.elapsed() < interval)
        .unwrap_or(false);
    if !recently_issued {
        issue_fetch(inner, key, slot);
    }
    true
}

/// Drop one subscriber from `key`; on reaching zero, start the retention
/// timer (or evict immediately when retention is zero or no runtime is
/// available to time the window).
pub(crate) fn release(inner: &Arc<StoreInner>, key: &QueryKey) {
    let mut entries = inner.lock_entries();
    let Some(slot) = entries.get_mut(key) else {
        return;
    };
    slot.subscriber_count = slot.subscriber_count.saturating_sub(1);
    if slot.subscriber_count > 0 {
        return;
    }
    if inner.retention.is_zero() {
        entries.remove(key);
        inner.stats.record_eviction();
        return;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let inner = Arc::clone(inner);
            let key_owned = key.clone();
            // capture the deadline now: the spawned task may not run
            // until after the clock has moved
            let deadline = Instant::now() + inner.retention;
            slot.retention_timer = Some(handle.spawn(async move {
                tokio::time::sleep_until(deadline).await;
                inner.evict_if_idle(&key_owned);
            }));
        }
        Err(_) => {
            entries.remove(key);
            inner.stats.record_eviction();
        }
    }
}

impl QueryStore {
    /// Create a store over the given transport with the given retention
    /// window for unsubscribed entries.
    pub fn new(fetcher: Arc<dyn Fetcher>, retention: Duration) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                fetcher,
                retention,
                entries: Mutex::new(HashMap::new()),
                stats: ClientStats::new(),
            }),
        }
    }

    /// Register interest in a query.
    ///
    /// Creates the cache entry on first subscription and issues exactly
    /// one fetch; concurrent subscribes to the same key while that fetch
    /// is in flight attach to it instead of issuing another. A stale
    /// entry (invalidated while idle) is refetched, keeping its previous
    /// data visible until the fresh result lands.
    pub fn subscribe<A, T>(&self, def: &QueryDef<A, T>, args: &A) -> FetchResult<Subscription<T>>
    where
        A: Serialize + Clone + Send + Sync + 'static,
        T: DeserializeOwned + 'static,
    {
        let key = QueryKey::new(def.name(), args)?;
        let request = def.request(args);
        let initial_tags = def.provides(args, None);
        let tag_fn = def.tag_fn();
        let provider_args = args.clone();
        let provider: TagProvider = Arc::new(move |value: &Value| {
            match serde_json::from_value::<T>(value.clone()) {
                Ok(typed) => tag_fn(&provider_args, Some(&typed)),
                Err(_) => tag_fn(&provider_args, None),
            }
        });

        let mut entries = self.inner.lock_entries();
        let slot = entries
            .entry(key.clone())
            .or_insert_with(|| EntrySlot::new(request, initial_tags, provider));
        slot.subscriber_count += 1;
        if let Some(timer) = slot.retention_timer.take() {
            timer.abort();
        }
        let rx = slot.tx.subscribe();

        match slot.status() {
            QueryStatus::Uninitialized => issue_fetch(&self.inner, &key, slot),
            // An in-flight request invalidated while idle predates the
            // write; attaching to it would hand this subscriber the
            // pre-write payload, so force a fresh fetch instead.
            QueryStatus::Loading if slot.stale => {
                self.inner.stats.record_refetch();
                issue_fetch(&self.inner, &key, slot);
            }
            QueryStatus::Loading => self.inner.stats.record_request_deduped(),
            // A failed entry retries on re-subscribe; a stale entry was
            // invalidated while idle and must bypass its cached data.
            QueryStatus::Error => {
                self.inner.stats.record_refetch();
                issue_fetch(&self.inner, &key, slot);
            }
            QueryStatus::Success if slot.stale => {
                self.inner.stats.record_refetch();
                issue_fetch(&self.inner, &key, slot);
            }
            QueryStatus::Success => {}
        }
        drop(entries);

        Ok(Subscription::new(Arc::clone(&self.inner), key, rx))
    }

    /// Invalidate every entry whose provided tags intersect `invalidated`.
    ///
    /// Entries with live subscribers refetch immediately (previous data
    /// stays visible); idle entries are marked stale so the next
    /// subscribe bypasses the cached result.
    pub fn invalidate_tags(&self, invalidated: &[Tag]) {
        if invalidated.is_empty() {
            return;
        }
        let mut entries = self.inner.lock_entries();
        let matched: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, slot)| intersects(invalidated, &slot.tags))
            .map(|(key, _)| key.clone())
            .collect();
        for key in matched {
            self.inner.stats.record_invalidation();
            let Some(slot) = entries.get_mut(&key) else {
                continue;
            };
            if slot.subscriber_count > 0 {
                log::debug!("invalidation refetching live entry {}", key);
                self.inner.stats.record_refetch();
                issue_fetch(&self.inner, &key, slot);
            } else {
                log::debug!("invalidation marking idle entry {} stale", key);
                slot.stale = true;
            }
        }
    }

    /// Perform a one-shot write.
    ///
    /// On success the mutation's declared tags are invalidated; on
    /// failure nothing is invalidated and the error propagates to the
    /// caller unretried.
    pub async fn mutate<A, T>(&self, def: &MutationDef<A, T>, args: &A) -> FetchResult<T>
    where
        T: DeserializeOwned,
    {
        let future = self.inner.fetcher.dispatch(def.request(args));
        let value = match future.await {
            Ok(value) => value,
            Err(error) => {
                self.inner.stats.record_mutation_failure();
                log::warn!("mutation '{}' failed: {}", def.name(), error);
                return Err(error);
            }
        };
        let typed: T = serde_json::from_value(value).map_err(|e| {
            self.inner.stats.record_mutation_failure();
            FetchError::decode(format!(
                "Failed to decode '{}' mutation result: {}",
                def.name(),
                e
            ))
        })?;
        self.invalidate_tags(&def.invalidates(args));
        Ok(typed)
    }

    /// Number of live cache entries, including unsubscribed ones still
    /// inside their retention window.
    pub fn entry_count(&self) -> usize {
        self.inner.lock_entries().len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }
}

#[cfg(test)]
mod store_tests;
