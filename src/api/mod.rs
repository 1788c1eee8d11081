//! Fixed backend contract: DTOs and endpoint definitions

pub mod endpoints;
pub mod types;

pub use types::{
    CarrierBreakdown, Consolidation, CsvFile, ImportProgress, ImportReceipt, Metrics, Page,
    PageRequest, Shipment, ShipmentFilter, ShipmentsPerDay, StatusCount, VolumeByMode,
};
