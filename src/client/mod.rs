//! Data client core: transport, cache store, endpoint registry
//!
//! The layering is strictly leaf-first: `http` knows nothing about
//! caching, `store` issues every request through the `http::Fetcher`
//! seam, and `registry` is pure data consumed by the store's generic
//! entry points.

pub mod config;
pub mod errors;
pub mod http;
pub mod registry;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use errors::{FetchError, FetchResult};
pub use store::QueryStore;
