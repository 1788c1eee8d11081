//! Freightdeck prelude - convenient imports for users

// Re-export the public API
pub use crate::freightdeck::{Freightdeck, FreightdeckBuilder};

// Re-export essential error and config types
pub use crate::client::config::ClientConfig;
pub use crate::client::errors::{FetchError, FetchResult};

// Cache-facing types users interact with directly
pub use crate::client::store::entry::QueryStatus;
pub use crate::client::store::subscription::{QueryView, Subscription};
pub use crate::client::store::tags::{Tag, TagKind};
pub use crate::client::store::QueryStore;

// Backend DTOs
pub use crate::api::types::{
    Consolidation, CsvFile, ImportProgress, ImportReceipt, Metrics, Page, PageRequest, Shipment,
    ShipmentFilter,
};

// Upload workflow surface
pub use crate::upload::{UploadFailure, UploadPhase, UploadStatus, UploadWorkflow};

// Virtualization surface
pub use crate::virtualizer::{rendered_rows, VirtualItem, VirtualWindow, VirtualizerConfig};

// Re-export serde traits that users' argument types need to implement
pub use serde::{Deserialize, Serialize};
