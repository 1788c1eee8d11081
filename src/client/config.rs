//! Data client configuration with production-ready defaults
//!
//! All durations are plain millisecond scalars so the config stays
//! serializable and diffable in one glance.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main data client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the REST backend, e.g. `http://localhost:8000/api`
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// How long an unsubscribed cache entry is retained before eviction
    pub retention_ms: u64,
    /// Default polling interval for progress-style queries
    pub poll_interval_ms: u64,
    /// Ceiling on how long an import may stay in Processing before the
    /// upload workflow gives up
    pub processing_deadline_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout_ms: 10_000,
            connect_timeout_ms: 2_000,
            retention_ms: 30_000,
            poll_interval_ms: 3_000,
            processing_deadline_ms: 600_000,
        }
    }
}

impl ClientConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn processing_deadline(&self) -> Duration {
        Duration::from_millis(self.processing_deadline_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
