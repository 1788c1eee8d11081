//! Public API for the freight operations data client
//!
//! [`Freightdeck`] bundles the cache store, the endpoint registry and
//! the upload workflow behind one handle with typed entry points per
//! backend operation. Construction goes through the fluent
//! [`FreightdeckBuilder`]; the default transport is the reqwest-backed
//! [`RestClient`](crate::client::http::RestClient), replaceable for
//! tests or alternative transports.

use std::sync::Arc;

use crate::api::endpoints;
use crate::api::types::{
    Consolidation, ImportProgress, Metrics, Page, PageRequest, Shipment, ShipmentFilter,
};
use crate::client::config::ClientConfig;
use crate::client::errors::FetchResult;
use crate::client::http::{Fetcher, RestClient};
use crate::client::store::subscription::Subscription;
use crate::client::store::tags::Tag;
use crate::client::store::QueryStore;
use crate::telemetry::StatsSnapshot;
use crate::upload::UploadWorkflow;

/// Shared data client for the freight backend.
///
/// Cheap to clone; all clones share one cache. Every read goes through
/// the store, so two views of the same listing share one entry and one
/// in-flight request.
#[derive(Clone)]
pub struct Freightdeck {
    config: ClientConfig,
    store: QueryStore,
}

impl Freightdeck {
    pub fn builder() -> FreightdeckBuilder {
        FreightdeckBuilder::new()
    }

    /// Create a client over the default HTTP transport.
    pub fn new(config: ClientConfig) -> FetchResult<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(RestClient::new(&config)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Create a client over a custom transport.
    pub fn with_fetcher(config: ClientConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let store = QueryStore::new(fetcher, config.retention());
        Self { config, store }
    }

    /// Subscribe to the shipments listing under `filter`.
    pub fn shipments(&self, filter: &ShipmentFilter) -> FetchResult<Subscription<Page<Shipment>>> {
        self.store.subscribe(&endpoints::shipments(), filter)
    }

    /// Subscribe to a single shipment by its id.
    pub fn shipment(&self, shipment_id: &str) -> FetchResult<Subscription<Shipment>> {
        self.store
            .subscribe(&endpoints::shipment_detail(), &shipment_id.to_string())
    }

    /// Subscribe to the aggregate dashboard metrics.
    pub fn metrics(&self) -> FetchResult<Subscription<Metrics>> {
        self.store.subscribe(&endpoints::metrics(), &())
    }

    /// Subscribe to the consolidations listing.
    pub fn consolidations(
        &self,
        page: &PageRequest,
    ) -> FetchResult<Subscription<Page<Consolidation>>> {
        self.store.subscribe(&endpoints::consolidations(), page)
    }

    /// Subscribe to a single consolidation by id.
    pub fn consolidation(&self, id: u64) -> FetchResult<Subscription<Consolidation>> {
        self.store.subscribe(&endpoints::consolidation_detail(), &id)
    }

    /// Subscribe to the progress of a running import.
    pub fn import_progress(&self, import_id: u64) -> FetchResult<Subscription<ImportProgress>> {
        self.store.subscribe(&endpoints::import_progress(), &import_id)
    }

    /// Create an upload workflow bound to this client's cache, with the
    /// configured polling interval and processing deadline.
    pub fn upload_workflow(&self) -> UploadWorkflow {
        UploadWorkflow::new(self.store.clone(), &self.config)
    }

    /// Invalidate cache entries by tag, outside of any mutation.
    pub fn invalidate(&self, tags: &[Tag]) {
        self.store.invalidate_tags(tags);
    }

    pub fn store(&self) -> &QueryStore {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.store.stats()
    }
}

/// Fluent builder for [`Freightdeck`] configuration.
pub struct FreightdeckBuilder {
    config: ClientConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl FreightdeckBuilder {
    /// Create new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            fetcher: None,
        }
    }

    /// Set the backend base URL
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the per-request timeout in milliseconds
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config.request_timeout_ms = ms;
        self
    }

    /// Set the TCP connect timeout in milliseconds
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set how long unsubscribed cache entries are retained, in
    /// milliseconds
    pub fn retention_ms(mut self, ms: u64) -> Self {
        self.config.retention_ms = ms;
        self
    }

    /// Set the progress polling interval in milliseconds
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the import processing deadline in milliseconds
    pub fn processing_deadline_ms(mut self, ms: u64) -> Self {
        self.config.processing_deadline_ms = ms;
        self
    }

    /// Replace the HTTP transport with a custom [`Fetcher`]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Build the client with the configured settings.
    pub fn build(self) -> FetchResult<Freightdeck> {
        match self.fetcher {
            Some(fetcher) => Ok(Freightdeck::with_fetcher(self.config, fetcher)),
            None => Freightdeck::new(self.config),
        }
    }
}

impl Default for FreightdeckBuilder {
    fn default() -> Self {
        Self::new()
    }
}
