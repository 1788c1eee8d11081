//! Data transfer types for the freight backend
//!
//! Field names follow the backend's JSON contract verbatim, so every
//! type derives straight serde with no rename attributes.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One page of a server-paginated listing.
///
/// `count` is server-authoritative and routinely exceeds
/// `results.len()`; `next`/`previous` are opaque page links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    /// Primary key used in URLs
    pub shipment_id: String,
    pub status: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub arrival_date: String,
    pub weight: f64,
    pub volume: f64,
    pub mode: String,
    pub customer: String,
    pub carrier: String,
    pub created_at: String,
    pub updated_at: String,
    pub delivered_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consolidation {
    pub id: u64,
    /// Three-letter destination code
    pub destination: String,
    pub departure_date: String,
    pub total_weight: f64,
    pub total_volume: f64,
    /// Shipment ids folded into this consolidation
    pub shipments: Vec<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierBreakdown {
    pub name: String,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeByMode {
    pub mode: String,
    pub total_volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentsPerDay {
    pub date: String,
    pub count: u64,
}

/// Aggregate dashboard metrics from `GET /metrics/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub counts: Vec<StatusCount>,
    pub utilisation_pct: f64,
    pub by_carrier: Vec<CarrierBreakdown>,
    pub volume_by_mode: Vec<VolumeByMode>,
    pub shipments_per_day: Vec<ShipmentsPerDay>,
}

/// Filter and pagination arguments for the shipments listing. Absent
/// fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Pagination arguments for the consolidations listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

/// Response of the CSV import POST.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImportReceipt {
    pub id: u64,
}

/// Progress report for one running import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportProgress {
    pub processed: u64,
    pub total: u64,
}

impl ImportProgress {
    /// Completion requires a known, fully processed total; `total == 0`
    /// means the server has not sized the import yet.
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.processed >= self.total
    }
}

/// A CSV file staged for upload. Bytes are shared so cloning the
/// mutation arguments never copies the payload.
#[derive(Debug, Clone)]
pub struct CsvFile {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
}

impl CsvFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: Arc::new(bytes),
        }
    }
}
