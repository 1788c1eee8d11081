//! Invalidation tags
//!
//! Tags are opaque labels attached to cache entries purely for write
//! fan-out. A tag is a kind plus an optional entity id; a kind-only tag
//! stands for "every entity of this kind".

use serde::{Deserialize, Serialize};

/// Tag kinds mirror the backend's resource families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    Imports,
    Metrics,
    Shipments,
    Consolidations,
}

/// Invalidation label attached to cached entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    kind: TagKind,
    id: Option<String>,
}

impl Tag {
    /// Kind-only tag covering every entity of the kind (list views).
    pub fn kind(kind: TagKind) -> Self {
        Self { kind, id: None }
    }

    /// Tag scoped to a single entity.
    pub fn entity(kind: TagKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: Some(id.into()),
        }
    }

    /// Whether this invalidated tag reaches a provided tag.
    ///
    /// Kinds must match. A kind-only invalidation reaches every entry of
    /// the kind; an entity invalidation reaches only entries that
    /// provided that exact entity. A listing's bare kind tag is not a
    /// wildcard on the provided side, otherwise every entity write would
    /// reload every listing of its kind.
    pub fn matches(&self, provided: &Tag) -> bool {
        if self.kind != provided.kind {
            return false;
        }
        match (&self.id, &provided.id) {
            (None, _) => true,
            (Some(a), Some(b)) => a == b,
            (Some(_), None) => false,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{:?}:{}", self.kind, id),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

/// True when any invalidated tag reaches any provided tag.
pub fn intersects(invalidated: &[Tag], provided: &[Tag]) -> bool {
    invalidated
        .iter()
        .any(|inv| provided.iter().any(|p| inv.matches(p)))
}
