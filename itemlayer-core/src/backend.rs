//! Storage backend abstraction for the item access layer.
//!
//! This module defines the traits that hide a document store's native query dialect
//! behind a small set of operations, so collections can be queried, searched and
//! mutated through one interface regardless of where the records live.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: Object-safe mirror of [`StoreBackend`] for runtime backend selection
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use itemlayer::backend::StoreBackend;
//! use itemlayer::query::Filter;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//! backend.open().await?;
//!
//! backend.create("students", "s-1", doc! { "sid": "s-1", "major": "CS" }).await?;
//! let found = backend.find_one("students", Filter::eq("sid", "s-1")).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Document;
use std::{any::Any, fmt::Debug};

use crate::{
    error::ItemStoreResult,
    query::{Expr, Query},
};

/// Result of an update: whether a record matched, and the record after the patch was applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateOutcome {
    /// `false` when no record matched the filter (a zero-effect update).
    pub matched: bool,
    /// The updated record when one matched.
    pub document: Option<Document>,
}

impl UpdateOutcome {
    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn updated(document: Document) -> Self {
        Self { matched: true, document: Some(document) }
    }
}

/// Result of a delete.
///
/// `ok` reports whether the store call itself succeeded; a delete that matched nothing
/// is `ok` with a `deleted_count` of zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub ok: bool,
    pub deleted_count: u64,
}

impl DeleteOutcome {
    pub fn deleted(count: u64) -> Self {
        Self { ok: true, deleted_count: count }
    }
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations are shared by every in-flight request. They must support
/// concurrent calls through `&self`; arbitration of concurrent writes to the same
/// record is left to the store (last write wins).
///
/// # Error Handling
///
/// Store-level failures surface as [`ItemStoreError`](crate::error::ItemStoreError).
/// Backends never retry and never turn a failure into an empty result. A filter
/// naming a field no record has is not an error; it simply matches nothing.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Establishes the connection to the store.
    ///
    /// Called once before any other operation. Calling it again reuses the
    /// existing connection.
    async fn open(&self) -> ItemStoreResult<()>;

    /// Returns the first record matching `filter`, or `None` when nothing matches.
    async fn find_one(&self, collection: &str, filter: Expr) -> ItemStoreResult<Option<Document>>;

    /// Returns every record matching the query, sorted and projected as requested.
    ///
    /// Records with equal sort keys are returned in insertion order.
    async fn find_many(&self, collection: &str, query: Query) -> ItemStoreResult<Vec<Document>>;

    /// Persists a new record under `id` and returns the stored record.
    ///
    /// # Errors
    ///
    /// [`WriteConflict`](crate::error::ItemStoreError::WriteConflict) when `id` is taken,
    /// [`StorageUnavailable`](crate::error::ItemStoreError::StorageUnavailable) when the
    /// store cannot be reached.
    async fn create(&self, collection: &str, id: &str, document: Document) -> ItemStoreResult<Document>;

    /// Merges the top-level fields of `patch` into the first record matching `filter`.
    ///
    /// Fields absent from the patch are left untouched. No match is a zero-effect success.
    async fn update(&self, collection: &str, filter: Expr, patch: Document) -> ItemStoreResult<UpdateOutcome>;

    /// Removes the first record matching `filter`.
    async fn delete(&self, collection: &str, filter: Expr) -> ItemStoreResult<DeleteOutcome>;

    /// Releases the connection at process shutdown.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(self) -> ItemStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Object-safe counterpart of [`StoreBackend`], implemented for every backend.
///
/// Lets the backend be chosen at runtime (for example from configuration) and
/// stored as `Box<dyn DynStoreBackend>`, which itself implements [`StoreBackend`].
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn open(&self) -> ItemStoreResult<()>;
    async fn find_one(&self, collection: &str, filter: Expr) -> ItemStoreResult<Option<Document>>;
    async fn find_many(&self, collection: &str, query: Query) -> ItemStoreResult<Vec<Document>>;
    async fn create(&self, collection: &str, id: &str, document: Document) -> ItemStoreResult<Document>;
    async fn update(&self, collection: &str, filter: Expr, patch: Document) -> ItemStoreResult<UpdateOutcome>;
    async fn delete(&self, collection: &str, filter: Expr) -> ItemStoreResult<DeleteOutcome>;
    async fn shutdown_boxed(self: Box<Self>) -> ItemStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn open(&self) -> ItemStoreResult<()> {
        StoreBackend::open(self).await
    }

    async fn find_one(&self, collection: &str, filter: Expr) -> ItemStoreResult<Option<Document>> {
        StoreBackend::find_one(self, collection, filter).await
    }

    async fn find_many(&self, collection: &str, query: Query) -> ItemStoreResult<Vec<Document>> {
        StoreBackend::find_many(self, collection, query).await
    }

    async fn create(&self, collection: &str, id: &str, document: Document) -> ItemStoreResult<Document> {
        StoreBackend::create(self, collection, id, document).await
    }

    async fn update(&self, collection: &str, filter: Expr, patch: Document) -> ItemStoreResult<UpdateOutcome> {
        StoreBackend::update(self, collection, filter, patch).await
    }

    async fn delete(&self, collection: &str, filter: Expr) -> ItemStoreResult<DeleteOutcome> {
        StoreBackend::delete(self, collection, filter).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> ItemStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn open(&self) -> ItemStoreResult<()> {
        DynStoreBackend::open(&**self).await
    }

    async fn find_one(&self, collection: &str, filter: Expr) -> ItemStoreResult<Option<Document>> {
        DynStoreBackend::find_one(&**self, collection, filter).await
    }

    async fn find_many(&self, collection: &str, query: Query) -> ItemStoreResult<Vec<Document>> {
        DynStoreBackend::find_many(&**self, collection, query).await
    }

    async fn create(&self, collection: &str, id: &str, document: Document) -> ItemStoreResult<Document> {
        DynStoreBackend::create(&**self, collection, id, document).await
    }

    async fn update(&self, collection: &str, filter: Expr, patch: Document) -> ItemStoreResult<UpdateOutcome> {
        DynStoreBackend::update(&**self, collection, filter, patch).await
    }

    async fn delete(&self, collection: &str, filter: Expr) -> ItemStoreResult<DeleteOutcome> {
        DynStoreBackend::delete(&**self, collection, filter).await
    }

    async fn shutdown(self) -> ItemStoreResult<()> {
        DynStoreBackend::shutdown_boxed(self).await
    }
}

/// Factory for backends that need asynchronous construction (parsing a connection string).
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> ItemStoreResult<Self::Backend>;
}
