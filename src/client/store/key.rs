//! Structural cache keys
//!
//! A [`QueryKey`] identifies one cache entry by endpoint name plus the
//! canonical JSON of its arguments. Two argument values that serialize
//! identically share an entry regardless of object identity.

use serde::Serialize;

use crate::client::errors::{FetchError, FetchResult};

/// Structural identity of a cached request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    endpoint: &'static str,
    args: String,
}

impl QueryKey {
    /// Build the key from an endpoint name and its serializable arguments.
    ///
    /// serde_json maps iterate in sorted key order, so structurally equal
    /// argument values always produce the same canonical string.
    pub fn new<A: Serialize>(endpoint: &'static str, args: &A) -> FetchResult<Self> {
        let canonical = serde_json::to_string(args).map_err(|e| {
            FetchError::decode(format!(
                "Failed to serialize arguments for '{}': {}",
                endpoint, e
            ))
        })?;
        Ok(Self {
            endpoint,
            args: canonical,
        })
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}
