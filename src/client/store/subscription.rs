//! RAII subscription handles and the polling controller
//!
//! A [`Subscription`] pins one subscriber onto a cache entry: dropping
//! it decrements the count and, at zero, starts the retention timer.
//! Polling is a per-subscription timer task that re-issues the entry's
//! fetch at a fixed interval for as long as the subscription lives.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::errors::{FetchError, FetchResult};
use crate::client::store::entry::{QuerySnapshot, QueryStatus};
use crate::client::store::key::QueryKey;
use crate::client::store::{poll_tick, refetch_key, release, StoreInner};

/// Typed, point-in-time view of a cache entry.
#[derive(Debug, Clone)]
pub struct QueryView<T> {
    pub status: QueryStatus,
    /// Last successful payload, retained through reloads and errors
    pub data: Option<T>,
    pub error: Option<FetchError>,
}

impl<T> QueryView<T> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }
}

/// Live handle onto one cached query.
///
/// Holds a subscriber slot until dropped. Typed reads deserialize the
/// erased payload at the edge; a payload that no longer matches `T`
/// surfaces as a decode error rather than being silently swallowed.
pub struct Subscription<T> {
    inner: Arc<StoreInner>,
    key: QueryKey,
    rx: watch::Receiver<QuerySnapshot>,
    poll_task: Option<JoinHandle<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(
        inner: Arc<StoreInner>,
        key: QueryKey,
        rx: watch::Receiver<QuerySnapshot>,
    ) -> Self {
        Self {
            inner,
            key,
            rx,
            poll_task: None,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Re-issue the underlying fetch immediately, keeping current data
    /// visible until the new result lands.
    pub fn refetch(&self) {
        refetch_key(&self.inner, &self.key);
    }

    /// Start re-issuing the fetch every `interval`.
    ///
    /// Pacing: tick N+1 fires one full interval after tick N regardless
    /// of whether tick N's fetch has resolved; out-of-order completions
    /// are handled by the store's issuance-generation rule. A tick finds
    /// nothing to do when any fetch for the key was issued within the
    /// last interval, which is what resets the timer after a manual
    /// refetch or a tag invalidation. The task stops on `stop_polling`,
    /// on drop of this subscription, or when the entry loses its last
    /// subscriber.
    pub fn poll_every(&mut self, interval: Duration) {
        self.stop_polling();
        let inner = Arc::clone(&self.inner);
        let key = self.key.clone();
        log::debug!("polling {} every {:?}", key, interval);
        // capture the first deadline now: the spawned task may not run
        // until after the clock has moved
        let mut next = tokio::time::Instant::now() + interval;
        self.poll_task = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep_until(next).await;
                if !poll_tick(&inner, &key, interval) {
                    break;
                }
                next = tokio::time::Instant::now() + interval;
            }
        }));
    }

    pub fn stop_polling(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll_task.is_some()
    }
}

impl<T: DeserializeOwned> Subscription<T> {
    fn view_of(snapshot: &QuerySnapshot) -> QueryView<T> {
        let mut error = snapshot.error.clone();
        let data = match &snapshot.data {
            Some(value) => match serde_json::from_value::<T>(value.clone()) {
                Ok(typed) => Some(typed),
                Err(e) => {
                    if error.is_none() {
                        error = Some(FetchError::decode(format!(
                            "Cached payload does not match requested type: {}",
                            e
                        )));
                    }
                    None
                }
            },
            None => None,
        };
        QueryView {
            status: snapshot.status,
            data,
            error,
        }
    }

    /// Current state without waiting.
    pub fn snapshot(&self) -> QueryView<T> {
        Self::view_of(&self.rx.borrow())
    }

    /// Wait for the next state change and return the new view.
    pub async fn changed(&mut self) -> QueryView<T> {
        // a closed channel means the entry is gone; the last seen state
        // is still the most accurate answer
        let _ = self.rx.changed().await;
        Self::view_of(&self.rx.borrow_and_update())
    }

    /// Wait until the entry reaches Success or Error and return the
    /// typed result or the error.
    pub async fn ready(&mut self) -> FetchResult<T> {
        loop {
            {
                let snapshot = self.rx.borrow_and_update().clone();
                match snapshot.status {
                    QueryStatus::Success => {
                        let value = snapshot.data.ok_or_else(|| {
                            FetchError::decode("Successful entry carried no payload")
                        })?;
                        return serde_json::from_value(value).map_err(|e| {
                            FetchError::decode(format!(
                                "Cached payload does not match requested type: {}",
                                e
                            ))
                        });
                    }
                    QueryStatus::Error => {
                        return Err(snapshot
                            .error
                            .unwrap_or_else(|| FetchError::network("Fetch failed")));
                    }
                    QueryStatus::Uninitialized | QueryStatus::Loading => {}
                }
            }
            if self.rx.changed().await.is_err() {
                return Err(FetchError::network("Query entry evicted while waiting"));
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.stop_polling();
        release(&self.inner, &self.key);
    }
}
