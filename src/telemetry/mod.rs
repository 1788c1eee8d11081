//! Client statistics with atomic coordination
//!
//! One [`ClientStats`] instance lives inside each store and counts the
//! events the invariants care about: dedupe hits, discarded stale
//! responses, invalidation fan-out, evictions, poll ticks. Counters are
//! plain relaxed atomics; the store is event-loop bound, not a
//! multi-core hot path.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic event counters for one data client instance.
#[derive(Debug, Default)]
pub struct ClientStats {
    requests_issued: AtomicU64,
    requests_deduped: AtomicU64,
    stale_responses_discarded: AtomicU64,
    invalidations: AtomicU64,
    refetches: AtomicU64,
    evictions: AtomicU64,
    poll_ticks: AtomicU64,
    mutation_failures: AtomicU64,
}

/// Point-in-time view of [`ClientStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct StatsSnapshot {
    pub requests_issued: u64,
    pub requests_deduped: u64,
    pub stale_responses_discarded: u64,
    pub invalidations: u64,
    pub refetches: u64,
    pub evictions: u64,
    pub poll_ticks: u64,
    pub mutation_failures: u64,
}

impl ClientStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request_issued(&self) {
        self.requests_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request_deduped(&self) {
        self.requests_deduped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_response_discarded(&self) {
        self.stale_responses_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refetch(&self) {
        self.refetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_tick(&self) {
        self.poll_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mutation_failure(&self) {
        self.mutation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_issued: self.requests_issued.load(Ordering::Relaxed),
            requests_deduped: self.requests_deduped.load(Ordering::Relaxed),
            stale_responses_discarded: self.stale_responses_discarded.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            refetches: self.refetches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            poll_ticks: self.poll_ticks.load(Ordering::Relaxed),
            mutation_failures: self.mutation_failures.load(Ordering::Relaxed),
        }
    }
}
