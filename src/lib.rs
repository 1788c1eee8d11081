//! Freightdeck - data client core for freight operations dashboards
//!
//! A cache-backed REST client for shipment tracking backends, built
//! around three pieces:
//!
//! - **Tag-indexed request cache**: structural keys, subscriber
//!   refcounting, retention windows, tag fan-out invalidation, and
//!   last-issued-wins ordering for overlapping responses
//! - **Row virtualization**: pure window computation for rendering
//!   large listings at a fixed row height
//! - **Upload workflow**: a discrete state machine driving one CSV
//!   import from multipart upload through polled processing progress
//!
//! The entry point is [`Freightdeck`], constructed through
//! [`FreightdeckBuilder`].

// Public API modules
pub mod freightdeck;
pub mod prelude;

// Client implementation modules
pub mod api;
pub mod client;
pub mod telemetry;
pub mod upload;
pub mod virtualizer;

// Re-export the public API at the crate root for convenience
pub use freightdeck::{Freightdeck, FreightdeckBuilder};
pub use prelude::*;
