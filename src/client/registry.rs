//! Explicit endpoint registry
//!
//! Each backend operation is declared once as a [`QueryDef`] or
//! [`MutationDef`]: a name, a request-builder, and a tag-provider. The
//! store's generic `subscribe`/`mutate` entry points consume these
//! definitions, so adding an endpoint never touches the cache core.

use std::marker::PhantomData;

use crate::client::http::ApiRequest;
use crate::client::store::tags::Tag;

/// Declarative definition of a cacheable read endpoint.
///
/// The tag provider is called twice per entry: once at subscription time
/// with no result (list queries provide only their list-level tag), and
/// again after each successful fetch so per-row tags can be derived from
/// the payload.
pub struct QueryDef<A, T> {
    name: &'static str,
    build: fn(&A) -> ApiRequest,
    tags: fn(&A, Option<&T>) -> Vec<Tag>,
    _marker: PhantomData<fn(&A) -> T>,
}

impl<A, T> QueryDef<A, T> {
    pub const fn new(
        name: &'static str,
        build: fn(&A) -> ApiRequest,
        tags: fn(&A, Option<&T>) -> Vec<Tag>,
    ) -> Self {
        Self {
            name,
            build,
            tags,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn request(&self, args: &A) -> ApiRequest {
        (self.build)(args)
    }

    pub fn provides(&self, args: &A, result: Option<&T>) -> Vec<Tag> {
        (self.tags)(args, result)
    }

    /// Raw tag-provider fn pointer, used by the store to re-derive tags
    /// once typed results land.
    pub(crate) fn tag_fn(&self) -> fn(&A, Option<&T>) -> Vec<Tag> {
        self.tags
    }
}

/// Declarative definition of a one-shot write endpoint.
pub struct MutationDef<A, T> {
    name: &'static str,
    build: fn(&A) -> ApiRequest,
    invalidates: fn(&A) -> Vec<Tag>,
    _marker: PhantomData<fn(&A) -> T>,
}

impl<A, T> MutationDef<A, T> {
    pub const fn new(
        name: &'static str,
        build: fn(&A) -> ApiRequest,
        invalidates: fn(&A) -> Vec<Tag>,
    ) -> Self {
        Self {
            name,
            build,
            invalidates,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn request(&self, args: &A) -> ApiRequest {
        (self.build)(args)
    }

    pub fn invalidates(&self, args: &A) -> Vec<Tag> {
        (self.invalidates)(args)
    }
}
