//! The item store handle: the entry point of the item access layer.
//!
//! An [`ItemStore`] is constructed once at process start around a backend, opened
//! once, and then shared (usually behind an `Arc`) by every request for the lifetime
//! of the process.
//!
//! # Example
//!
//! ```ignore
//! use itemlayer::{store::ItemStore, memory::InMemoryStore, query::Filter};
//!
//! let store = ItemStore::new(InMemoryStore::new());
//! store.open().await?;
//!
//! let record = store.find_one("students", Filter::eq("sid", "s-1")).await?;
//! ```

use bson::Document as BsonDocument;
use mea::mutex::Mutex;
use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info};

use crate::{
    backend::{DeleteOutcome, StoreBackend, UpdateOutcome},
    collection::TypedCollection,
    document::Document,
    error::{ItemStoreError, ItemStoreResult},
    query::{Expr, Query},
};

/// Long-lived handle over a storage backend.
///
/// Every operation other than [`open`](ItemStore::open) fails with
/// [`ItemStoreError::StorageUnavailable`] until the store has been opened.
pub struct ItemStore<B: StoreBackend> {
    backend: B,
    opened: AtomicBool,
    opening: Mutex<()>,
}

impl<B: StoreBackend> ItemStore<B> {
    /// Wraps a backend. The store still has to be [`open`](ItemStore::open)ed.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            opened: AtomicBool::new(false),
            opening: Mutex::new(()),
        }
    }

    /// Establishes the connection to the store.
    ///
    /// Idempotent: once a call has succeeded, later calls return immediately and
    /// the existing connection is reused. Concurrent first calls connect only once.
    ///
    /// # Errors
    ///
    /// Returns the backend's error when the store cannot be reached; the store stays
    /// closed and `open` may be called again.
    pub async fn open(&self) -> ItemStoreResult<()> {
        if self.is_open() {
            return Ok(());
        }

        let _guard = self.opening.lock().await;

        if self.is_open() {
            return Ok(());
        }

        self.backend.open().await?;
        self.opened.store(true, Ordering::Release);

        info!(backend = ?self.backend, "item store opened");

        Ok(())
    }

    /// Returns `true` once [`open`](ItemStore::open) has succeeded.
    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a typed collection for the specified record type.
    pub fn typed_collection<D: Document>(&self) -> TypedCollection<'_, B, D> {
        TypedCollection::new(D::collection_name().to_string(), self)
    }

    /// Returns the first record in `collection` matching `filter`, or `None`.
    pub async fn find_one(&self, collection: &str, filter: Expr) -> ItemStoreResult<Option<BsonDocument>> {
        self.ensure_open()?;

        let found = self.backend.find_one(collection, filter).await?;
        debug!(collection, found = found.is_some(), "find_one");

        Ok(found)
    }

    /// Returns every record in `collection` matching the query.
    pub async fn find_many(&self, collection: &str, query: Query) -> ItemStoreResult<Vec<BsonDocument>> {
        self.ensure_open()?;

        let found = self.backend.find_many(collection, query).await?;
        debug!(collection, count = found.len(), "find_many");

        Ok(found)
    }

    /// Persists a new record under `id` and returns the stored record.
    pub async fn create(&self, collection: &str, id: &str, document: BsonDocument) -> ItemStoreResult<BsonDocument> {
        self.ensure_open()?;

        let created = self.backend.create(collection, id, document).await?;
        debug!(collection, id, "create");

        Ok(created)
    }

    /// Merges `patch` into the first record matching `filter`.
    pub async fn update(&self, collection: &str, filter: Expr, patch: BsonDocument) -> ItemStoreResult<UpdateOutcome> {
        self.ensure_open()?;

        let outcome = self.backend.update(collection, filter, patch).await?;
        debug!(collection, matched = outcome.matched, "update");

        Ok(outcome)
    }

    /// Removes the first record matching `filter`.
    pub async fn delete(&self, collection: &str, filter: Expr) -> ItemStoreResult<DeleteOutcome> {
        self.ensure_open()?;

        let outcome = self.backend.delete(collection, filter).await?;
        debug!(collection, deleted = outcome.deleted_count, "delete");

        Ok(outcome)
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> ItemStoreResult<()> {
        self.backend.shutdown().await
    }

    fn ensure_open(&self) -> ItemStoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ItemStoreError::StorageUnavailable("store has not been opened".into()))
        }
    }
}

impl<B: StoreBackend> fmt::Debug for ItemStore<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStore")
            .field("backend", &self.backend)
            .field("opened", &self.is_open())
            .finish()
    }
}
