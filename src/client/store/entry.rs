//! Cache entry state and per-entry bookkeeping
//!
//! The subscriber-visible part of an entry is a [`QuerySnapshot`]
//! broadcast over a watch channel. The rest ([`EntrySlot`]) is internal
//! bookkeeping the store mutates under its lock: tags, subscriber count,
//! issuance generations, retention and staleness flags.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio::task::JoinHandle;

use crate::client::errors::FetchError;
use crate::client::http::ApiRequest;
use crate::client::store::tags::Tag;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Entry exists but no fetch has ever been issued
    Uninitialized,
    /// A fetch is in flight; `data` may still hold the previous result
    Loading,
    Success,
    Error,
}

/// Subscriber-visible state of one cache entry.
///
/// `data` survives reloads and errors: a Loading or Error snapshot keeps
/// the last successful payload so consumers can render stale data while
/// a refresh is in flight.
#[derive(Debug, Clone)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<FetchError>,
}

impl QuerySnapshot {
    pub fn uninitialized() -> Self {
        Self {
            status: QueryStatus::Uninitialized,
            data: None,
            error: None,
        }
    }
}

/// Re-derives entry tags from a successful payload.
pub(crate) type TagProvider = Arc<dyn Fn(&Value) -> Vec<Tag> + Send + Sync>;

/// Internal per-entry bookkeeping. All fields are mutated only under the
/// store lock.
pub(crate) struct EntrySlot {
    /// Prototype request, re-issued verbatim on refetch
    pub request: ApiRequest,
    /// Tags currently provided by this entry
    pub tags: Vec<Tag>,
    /// Recomputes `tags` once a typed result lands
    pub tag_provider: TagProvider,
    pub subscriber_count: usize,
    /// Set when the entry was invalidated with no subscribers attached;
    /// the next subscribe must bypass the cached data
    pub stale: bool,
    /// Issuance counter: bumped once per fetch issued for this key
    pub issued: u64,
    /// Issuance generation of the last response applied to the entry
    pub applied: u64,
    /// When the most recent fetch was issued, for poll pacing
    pub last_issued_at: Option<Instant>,
    pub tx: watch::Sender<QuerySnapshot>,
    /// Pending retention timer, aborted when a subscriber returns
    pub retention_timer: Option<JoinHandle<()>>,
}

impl EntrySlot {
    pub fn new(request: ApiRequest, tags: Vec<Tag>, tag_provider: TagProvider) -> Self {
        let (tx, _rx) = watch::channel(QuerySnapshot::uninitialized());
        Self {
            request,
            tags,
            tag_provider,
            subscriber_count: 0,
            stale: false,
            issued: 0,
            applied: 0,
            last_issued_at: None,
            tx,
            retention_timer: None,
        }
    }

    pub fn status(&self) -> QueryStatus {
        self.tx.borrow().status
    }

    /// Transition to Loading while keeping previous data visible.
    pub fn mark_loading(&self) {
        self.tx.send_modify(|snapshot| {
            snapshot.status = QueryStatus::Loading;
        });
    }

    pub fn apply_success(&mut self, data: Value) {
        self.tags = (self.tag_provider)(&data);
        self.tx.send_modify(|snapshot| {
            snapshot.status = QueryStatus::Success;
            snapshot.data = Some(data);
            snapshot.error = None;
        });
    }

    /// Errors populate `error` but leave the last known data in place.
    pub fn apply_error(&self, error: FetchError) {
        self.tx.send_modify(|snapshot| {
            snapshot.status = QueryStatus::Error;
            snapshot.error = Some(error);
        });
    }
}

impl Drop for EntrySlot {
    fn drop(&mut self) {
        if let Some(timer) = self.retention_timer.take() {
            timer.abort();
        }
    }
}
