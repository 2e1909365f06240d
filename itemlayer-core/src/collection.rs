//! Typed access to a single collection.
//!
//! A [`TypedCollection`] converts between a [`Document`] type and the BSON documents
//! the backends store, so callers work with their own record types.
//!
//! # Example
//!
//! ```ignore
//! let courses = store.typed_collection::<Course>();
//! courses.create(&course).await?;
//! let found = courses.find_one(Filter::eq("code", "CS101")).await?;
//! ```

use serde::Serialize;
use std::marker::PhantomData;

use crate::{
    backend::{DeleteOutcome, StoreBackend},
    document::{Document, DocumentExt, to_patch},
    error::ItemStoreResult,
    query::{Expr, Query},
    store::ItemStore,
};

/// A collection bound to a record type `D`.
///
/// Projected queries should go through the untyped [`ItemStore`] API: a projection that
/// drops a field `D` requires makes the conversion fail.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    name: String,
    store: &'a ItemStore<B>,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(name: String, store: &'a ItemStore<B>) -> Self {
        Self { name, store, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the first record matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an [`ItemStoreError`](crate::error::ItemStoreError) if the store call or
    /// the conversion to `D` fails.
    pub async fn find_one(&self, filter: Expr) -> ItemStoreResult<Option<D>> {
        self.store
            .find_one(&self.name, filter)
            .await?
            .map(D::from_document)
            .transpose()
    }

    /// Returns every record matching the query.
    pub async fn find_many(&self, query: Query) -> ItemStoreResult<Vec<D>> {
        self.store
            .find_many(&self.name, query)
            .await?
            .into_iter()
            .map(D::from_document)
            .collect()
    }

    /// Persists a new record keyed by [`Document::id`] and returns it as stored.
    pub async fn create(&self, item: &D) -> ItemStoreResult<D> {
        let created = self
            .store
            .create(&self.name, item.id(), item.to_document()?)
            .await?;

        D::from_document(created)
    }

    /// Merges the serialized fields of `patch` into the first record matching `filter`.
    ///
    /// Returns the updated record, or `None` when nothing matched.
    pub async fn update<P>(&self, filter: Expr, patch: &P) -> ItemStoreResult<Option<D>>
    where
        P: Serialize + Sync,
    {
        self.store
            .update(&self.name, filter, to_patch(patch)?)
            .await?
            .document
            .map(D::from_document)
            .transpose()
    }

    /// Removes the first record matching `filter`.
    pub async fn delete(&self, filter: Expr) -> ItemStoreResult<DeleteOutcome> {
        self.store.delete(&self.name, filter).await
    }
}
