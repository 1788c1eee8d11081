//! Behavior tests for the query store, driven through the real endpoint
//! registry and a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use crate::api::endpoints;
use crate::api::types::{Metrics, Page, Shipment, ShipmentFilter};
use crate::client::errors::FetchError;
use crate::client::store::entry::QueryStatus;
use crate::client::store::tags::{Tag, TagKind};
use crate::client::store::QueryStore;
use crate::client::testing::ScriptedFetcher;

const RETENTION: Duration = Duration::from_secs(30);

fn store_over(fetcher: &Arc<ScriptedFetcher>) -> QueryStore {
    let _ = env_logger::builder().is_test(true).try_init();
    QueryStore::new(fetcher.clone(), RETENTION)
}

/// Let spawned fetch and timer tasks run without advancing time.
async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

fn metrics_json() -> Value {
    json!({
        "counts": [{"status": "in-transit", "total": 8}],
        "utilisation_pct": 72.5,
        "by_carrier": [{"name": "Maersk", "total": 5}],
        "volume_by_mode": [{"mode": "sea", "total_volume": 120.0}],
        "shipments_per_day": [{"date": "2025-05-01", "count": 3}]
    })
}

fn shipment_json(id: &str, status: &str) -> Value {
    json!({
        "shipment_id": id,
        "status": status,
        "origin": "SHA",
        "destination": "LAX",
        "departure_date": "2025-05-01",
        "arrival_date": "2025-05-20",
        "weight": 1200.0,
        "volume": 8.4,
        "mode": "sea",
        "customer": "Acme Freight",
        "carrier": "Maersk",
        "created_at": "2025-04-28T10:00:00Z",
        "updated_at": "2025-04-28T10:00:00Z",
        "delivered_date": null
    })
}

fn shipment_page(ids: &[&str]) -> Value {
    json!({
        "count": ids.len(),
        "next": null,
        "previous": null,
        "results": ids
            .iter()
            .map(|id| shipment_json(id, "in-transit"))
            .collect::<Vec<_>>()
    })
}

fn consolidation_page() -> Value {
    json!({
        "count": 1,
        "next": null,
        "previous": null,
        "results": [{
            "id": 7,
            "destination": "LAX",
            "departure_date": "2025-05-15",
            "total_weight": 100.0,
            "total_volume": 12.0,
            "shipments": [],
            "created_at": null
        }]
    })
}

#[tokio::test]
async fn concurrent_subscribers_share_one_fetch() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let gate = fetcher.push_gate("metrics/");
    let store = store_over(&fetcher);

    let mut first = store.subscribe(&endpoints::metrics(), &()).unwrap();
    let second = store.subscribe(&endpoints::metrics(), &()).unwrap();
    settle().await;

    assert_eq!(fetcher.request_count("metrics/"), 1);
    assert_eq!(store.stats().requests_issued, 1);
    assert_eq!(store.stats().requests_deduped, 1);
    assert!(first.snapshot().is_loading());
    assert!(second.snapshot().is_loading());

    gate.send(Ok(metrics_json())).unwrap();
    let metrics: Metrics = first.ready().await.unwrap();
    assert_eq!(metrics.counts[0].total, 8);

    // the other subscriber sees the same result, with no extra request
    let view = second.snapshot();
    assert_eq!(view.status, QueryStatus::Success);
    assert!(view.data.is_some());
    assert_eq!(fetcher.request_count("metrics/"), 1);
    assert_eq!(store.entry_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn idle_entries_are_evicted_after_the_retention_window() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push("metrics/", Ok(metrics_json()));
    let store = store_over(&fetcher);

    let sub = store.subscribe(&endpoints::metrics(), &()).unwrap();
    settle().await;
    drop(sub);
    assert_eq!(store.entry_count(), 1);

    tokio::time::advance(RETENTION + Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(store.entry_count(), 0);
    assert_eq!(store.stats().evictions, 1);
}

#[tokio::test(start_paused = true)]
async fn resubscribing_cancels_the_pending_eviction() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push("metrics/", Ok(metrics_json()));
    let store = store_over(&fetcher);

    let sub = store.subscribe(&endpoints::metrics(), &()).unwrap();
    settle().await;
    drop(sub);

    tokio::time::advance(Duration::from_secs(15)).await;
    settle().await;
    let revived = store.subscribe(&endpoints::metrics(), &()).unwrap();
    let view: crate::client::store::subscription::QueryView<Metrics> = revived.snapshot();
    assert_eq!(view.status, QueryStatus::Success);

    tokio::time::advance(Duration::from_secs(120)).await;
    settle().await;
    assert_eq!(store.entry_count(), 1);
    assert_eq!(store.stats().evictions, 0);
    // the cached result was served as-is
    assert_eq!(fetcher.request_count("metrics/"), 1);
}

#[tokio::test]
async fn invalidation_refetches_matching_entries_and_spares_the_rest() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_repeat("shipments/", Ok(shipment_page(&["S-1", "S-2"])));
    fetcher.set_repeat("consolidations/", Ok(consolidation_page()));
    let store = store_over(&fetcher);

    let _shipments = store
        .subscribe(&endpoints::shipments(), &ShipmentFilter::default())
        .unwrap();
    let _consolidations = store
        .subscribe(&endpoints::consolidations(), &Default::default())
        .unwrap();
    settle().await;
    assert_eq!(fetcher.request_count("shipments/"), 1);
    assert_eq!(fetcher.request_count("consolidations/"), 1);

    store.invalidate_tags(&[Tag::kind(TagKind::Shipments)]);
    settle().await;

    assert_eq!(fetcher.request_count("shipments/"), 2);
    assert_eq!(fetcher.request_count("consolidations/"), 1);
    assert_eq!(store.stats().invalidations, 1);
}

#[tokio::test]
async fn row_level_tags_target_individual_listings() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_repeat("shipments/", Ok(shipment_page(&["S-1", "S-2"])));
    let store = store_over(&fetcher);

    let _listing = store
        .subscribe(&endpoints::shipments(), &ShipmentFilter::default())
        .unwrap();
    settle().await;

    // a row the page contains: the listing must reload
    store.invalidate_tags(&[Tag::entity(TagKind::Shipments, "S-2")]);
    settle().await;
    assert_eq!(fetcher.request_count("shipments/"), 2);

    // a row it does not contain: nothing to do
    store.invalidate_tags(&[Tag::entity(TagKind::Shipments, "S-99")]);
    settle().await;
    assert_eq!(fetcher.request_count("shipments/"), 2);
}

#[tokio::test]
async fn idle_invalidated_entry_refetches_on_next_subscribe() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_repeat("imports/5/progress/", Ok(json!({"processed": 3, "total": 9})));
    let store = store_over(&fetcher);

    let sub = store.subscribe(&endpoints::import_progress(), &5).unwrap();
    settle().await;
    drop(sub);
    assert_eq!(fetcher.request_count("imports/5/progress/"), 1);

    // idle entry: marked stale, no request issued yet
    store.invalidate_tags(&[Tag::kind(TagKind::Imports)]);
    settle().await;
    assert_eq!(fetcher.request_count("imports/5/progress/"), 1);

    // next subscriber bypasses the cached result
    let _revived = store.subscribe(&endpoints::import_progress(), &5).unwrap();
    settle().await;
    assert_eq!(fetcher.request_count("imports/5/progress/"), 2);
    assert!(store.stats().refetches >= 1);
}

#[tokio::test]
async fn stale_in_flight_entry_refetches_on_resubscribe() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let before_write = fetcher.push_gate("shipments/S-1/");
    let after_write = fetcher.push_gate("shipments/S-1/");
    let store = store_over(&fetcher);

    let sub = store
        .subscribe(&endpoints::shipment_detail(), &"S-1".to_string())
        .unwrap();
    settle().await;
    // the only subscriber leaves while its fetch is still in flight
    drop(sub);
    store.invalidate_tags(&[Tag::entity(TagKind::Shipments, "S-1")]);
    settle().await;
    assert_eq!(fetcher.request_count("shipments/S-1/"), 1);

    // the next subscriber must not attach to the pre-write request
    let revived = store
        .subscribe(&endpoints::shipment_detail(), &"S-1".to_string())
        .unwrap();
    settle().await;
    assert_eq!(fetcher.request_count("shipments/S-1/"), 2);

    before_write
        .send(Ok(shipment_json("S-1", "in-transit")))
        .unwrap();
    after_write
        .send(Ok(shipment_json("S-1", "delivered")))
        .unwrap();
    settle().await;
    let view: crate::client::store::subscription::QueryView<Shipment> = revived.snapshot();
    assert_eq!(view.status, QueryStatus::Success);
    assert_eq!(view.data.unwrap().status, "delivered");
}

#[tokio::test]
async fn eviction_drops_a_still_in_flight_response() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let gate = fetcher.push_gate("metrics/");
    let _ = env_logger::builder().is_test(true).try_init();
    // zero retention: losing the last subscriber evicts immediately
    let store = QueryStore::new(fetcher.clone(), Duration::ZERO);

    let sub = store.subscribe(&endpoints::metrics(), &()).unwrap();
    settle().await;
    drop(sub);
    assert_eq!(store.entry_count(), 0);
    assert_eq!(store.stats().evictions, 1);

    // the response lands after eviction and must not revive the entry
    gate.send(Ok(metrics_json())).unwrap();
    settle().await;
    assert_eq!(store.entry_count(), 0);
    assert_eq!(store.stats().stale_responses_discarded, 1);
}

#[tokio::test]
async fn newer_response_wins_regardless_of_arrival_order() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let slow = fetcher.push_gate("shipments/S-1/");
    let fast = fetcher.push_gate("shipments/S-1/");
    let store = store_over(&fetcher);

    let sub = store
        .subscribe(&endpoints::shipment_detail(), &"S-1".to_string())
        .unwrap();
    settle().await;
    sub.refetch();
    settle().await;
    assert_eq!(fetcher.request_count("shipments/S-1/"), 2);

    // the second-issued request resolves first
    fast.send(Ok(shipment_json("S-1", "delivered"))).unwrap();
    settle().await;
    let view: crate::client::store::subscription::QueryView<Shipment> = sub.snapshot();
    assert_eq!(view.data.unwrap().status, "delivered");

    // the first-issued request straggles in and must be dropped
    slow.send(Ok(shipment_json("S-1", "in-transit"))).unwrap();
    settle().await;
    let view = sub.snapshot();
    assert_eq!(view.status, QueryStatus::Success);
    assert_eq!(view.data.unwrap().status, "delivered");
    assert_eq!(store.stats().stale_responses_discarded, 1);
}

#[tokio::test]
async fn failed_mutations_invalidate_nothing() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_repeat("imports/9/progress/", Ok(json!({"processed": 1, "total": 4})));
    fetcher.push("imports/", Err(FetchError::http(500, "import service down")));
    let store = store_over(&fetcher);

    let _progress = store.subscribe(&endpoints::import_progress(), &9).unwrap();
    settle().await;
    assert_eq!(fetcher.request_count("imports/9/progress/"), 1);

    let file = crate::api::CsvFile::new("may.csv", b"a,b\n".to_vec());
    let result = store.mutate(&endpoints::upload_csv(), &file).await;
    assert_eq!(result.unwrap_err().status(), Some(500));
    settle().await;

    assert_eq!(fetcher.request_count("imports/9/progress/"), 1);
    assert_eq!(store.stats().invalidations, 0);
    assert_eq!(store.stats().mutation_failures, 1);

    // a successful retry does fan out
    fetcher.push("imports/", Ok(json!({"id": 11})));
    let receipt = store.mutate(&endpoints::upload_csv(), &file).await.unwrap();
    assert_eq!(receipt.id, 11);
    settle().await;
    assert_eq!(fetcher.request_count("imports/9/progress/"), 2);
    assert_eq!(store.stats().invalidations, 1);
}

#[tokio::test]
async fn errors_keep_the_last_good_data_visible() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let first = fetcher.push_gate("metrics/");
    let second = fetcher.push_gate("metrics/");
    let store = store_over(&fetcher);

    let mut sub = store.subscribe(&endpoints::metrics(), &()).unwrap();
    first.send(Ok(metrics_json())).unwrap();
    let _: Metrics = sub.ready().await.unwrap();

    sub.refetch();
    settle().await;
    assert!(sub.snapshot().is_loading());
    // while reloading, the previous payload is still there
    assert!(sub.snapshot().data.is_some());

    second
        .send(Err(FetchError::http(502, "bad gateway")))
        .unwrap();
    settle().await;
    let view = sub.snapshot();
    assert_eq!(view.status, QueryStatus::Error);
    assert_eq!(view.error, Some(FetchError::http(502, "bad gateway")));
    assert!(view.data.is_some());
}

#[tokio::test(start_paused = true)]
async fn polling_reissues_on_the_interval_and_stops_on_drop() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_repeat("imports/3/progress/", Ok(json!({"processed": 1, "total": 9})));
    let store = store_over(&fetcher);

    let mut sub = store.subscribe(&endpoints::import_progress(), &3).unwrap();
    settle().await;
    assert_eq!(fetcher.request_count("imports/3/progress/"), 1);

    let interval = Duration::from_secs(3);
    sub.poll_every(interval);
    assert!(sub.is_polling());

    tokio::time::advance(interval).await;
    settle().await;
    assert_eq!(fetcher.request_count("imports/3/progress/"), 2);

    tokio::time::advance(interval).await;
    settle().await;
    assert_eq!(fetcher.request_count("imports/3/progress/"), 3);
    assert!(store.stats().poll_ticks >= 2);

    drop(sub);
    tokio::time::advance(interval * 3).await;
    settle().await;
    assert_eq!(fetcher.request_count("imports/3/progress/"), 3);
}

#[tokio::test(start_paused = true)]
async fn a_manual_refetch_resets_the_poll_pacing() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_repeat("imports/4/progress/", Ok(json!({"processed": 1, "total": 9})));
    let store = store_over(&fetcher);

    let mut sub = store.subscribe(&endpoints::import_progress(), &4).unwrap();
    settle().await;
    let interval = Duration::from_secs(3);
    sub.poll_every(interval);

    // refetch right before the tick: the tick finds a fresh issue and
    // skips instead of doubling up
    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    sub.refetch();
    settle().await;
    assert_eq!(fetcher.request_count("imports/4/progress/"), 2);

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(fetcher.request_count("imports/4/progress/"), 2);
}

#[tokio::test]
async fn distinct_arguments_get_distinct_entries() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_repeat("shipments/", Ok(shipment_page(&["S-1"])));
    let store = store_over(&fetcher);

    let page_one = ShipmentFilter {
        page: Some(1),
        ..Default::default()
    };
    let page_two = ShipmentFilter {
        page: Some(2),
        ..Default::default()
    };
    let _a = store.subscribe(&endpoints::shipments(), &page_one).unwrap();
    let _b = store.subscribe(&endpoints::shipments(), &page_two).unwrap();
    let _a_again = store.subscribe(&endpoints::shipments(), &page_one).unwrap();
    settle().await;

    assert_eq!(store.entry_count(), 2);
    assert_eq!(fetcher.request_count("shipments/"), 2);
    assert_eq!(store.stats().requests_deduped, 1);
}

#[tokio::test]
async fn typed_page_round_trips_through_the_cache() {
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push("shipments/", Ok(shipment_page(&["S-1", "S-2", "S-3"])));
    let store = store_over(&fetcher);

    let mut sub = store
        .subscribe(&endpoints::shipments(), &ShipmentFilter::default())
        .unwrap();
    let page: Page<Shipment> = sub.ready().await.unwrap();
    assert_eq!(page.count, 3);
    assert_eq!(page.results[2].shipment_id, "S-3");
}
