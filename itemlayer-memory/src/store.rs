//! In-memory storage implementation for the item access layer.
//!
//! Collections are insertion-ordered vectors behind an async-aware read-write lock,
//! so unsorted results and ties in sorted results come back in insertion order.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document};

use itemlayer_core::{
    backend::{DeleteOutcome, StoreBackend, UpdateOutcome},
    error::{ItemStoreError, ItemStoreResult},
    query::{Expr, Projection, Query, SortDirection, lookup_path},
};

use crate::evaluator::{Comparable, DocumentEvaluator};

#[derive(Debug, Clone)]
struct StoredItem {
    id: String,
    document: Document,
}

type CollectionItems = Vec<StoredItem>;
type StoreMap = HashMap<String, CollectionItems>;


/// Thread-safe in-memory document storage backend.
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data. Reads take a shared lock; each mutation takes the
/// write lock for the duration of a single record change.
///
/// # Performance
///
/// Every query scans the whole collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use itemlayer_memory::InMemoryStore;
/// use itemlayer::{backend::StoreBackend, query::Filter};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
/// store.open().await?;
/// store.create("students", "s-1", doc! { "sid": "s-1" }).await?;
///
/// let found = store.find_one("students", Filter::eq("sid", "s-1")).await?;
/// assert!(found.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> records in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn open(&self) -> ItemStoreResult<()> {
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: Expr) -> ItemStoreResult<Option<Document>> {
        let store = self.store.read().await;
        let Some(items) = store.get(collection) else {
            return Ok(None);
        };

        Ok(
            DocumentEvaluator::matching_positions(items.iter().map(|item| &item.document), &filter)?
                .first()
                .map(|&position| items[position].document.clone())
        )
    }

    async fn find_many(&self, collection: &str, query: Query) -> ItemStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(items) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched = match &query.filter {
            Some(filter) => DocumentEvaluator::matching_positions(items.iter().map(|item| &item.document), filter)?
                .into_iter()
                .map(|position| &items[position].document)
                .collect::<Vec<_>>(),
            None => items
                .iter()
                .map(|item| &item.document)
                .collect::<Vec<_>>(),
        };

        // sort_by is stable: equal keys keep insertion order
        if let Some(sort) = &query.sort {
            matched.sort_by(|a, b| {
                let left = Comparable::field(a, &sort.field);
                let right = Comparable::field(b, &sort.field);

                match sort.direction {
                    SortDirection::Asc => left.total_cmp(&right),
                    SortDirection::Desc => right.total_cmp(&left),
                }
            });
        }

        Ok(
            matched
                .into_iter()
                .take(query.limit.unwrap_or(usize::MAX))
                .map(|document| project(document, &query.projection))
                .collect()
        )
    }

    async fn create(&self, collection: &str, id: &str, document: Document) -> ItemStoreResult<Document> {
        let mut store = self.store.write().await;
        let items = store
            .entry(collection.to_string())
            .or_default();

        if items.iter().any(|item| item.id == id) {
            return Err(ItemStoreError::WriteConflict(id.to_string(), collection.to_string()));
        }

        items.push(StoredItem { id: id.to_string(), document: document.clone() });

        Ok(document)
    }

    async fn update(&self, collection: &str, filter: Expr, patch: Document) -> ItemStoreResult<UpdateOutcome> {
        let mut store = self.store.write().await;
        let Some(items) = store.get_mut(collection) else {
            return Ok(UpdateOutcome::unmatched());
        };

        let Some(&position) = DocumentEvaluator::matching_positions(items.iter().map(|item| &item.document), &filter)?
            .first()
        else {
            return Ok(UpdateOutcome::unmatched());
        };

        let document = &mut items[position].document;
        for (field, value) in patch {
            set_path(document, &field, value);
        }

        Ok(UpdateOutcome::updated(document.clone()))
    }

    async fn delete(&self, collection: &str, filter: Expr) -> ItemStoreResult<DeleteOutcome> {
        let mut store = self.store.write().await;
        let Some(items) = store.get_mut(collection) else {
            return Ok(DeleteOutcome::deleted(0));
        };

        match DocumentEvaluator::matching_positions(items.iter().map(|item| &item.document), &filter)?
            .first()
        {
            Some(&position) => {
                items.remove(position);
                Ok(DeleteOutcome::deleted(1))
            },
            None => Ok(DeleteOutcome::deleted(0)),
        }
    }
}

/// Copies the projected fields (dotted paths allowed) out of a stored record.
fn project(document: &Document, projection: &Projection) -> Document {
    if projection.is_empty() {
        return document.clone();
    }

    let mut projected = Document::new();

    for path in projection.fields() {
        if let Some(value) = lookup_path(document, path) {
            set_path(&mut projected, path, value.clone());
        }
    }

    projected
}

/// Sets a field, creating intermediate sub-documents for dotted paths.
fn set_path(target: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            target.insert(path, value);
        },
        Some((head, rest)) => {
            if !matches!(target.get(head), Some(Bson::Document(_))) {
                target.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = target.get_mut(head) {
                set_path(inner, rest, value);
            }
        },
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use itemlayer_core::query::Filter;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.open().await.unwrap();

        for (sid, major, gpa) in [
            ("a", "Computer Science", "3.2"),
            ("b", "Mathematics", "3.9"),
            ("c", "Computer Engineering", "3.9"),
            ("d", "Comparative Literature", "2.8"),
        ] {
            store
                .create("students", sid, doc! { "sid": sid, "major": major, "gpa": gpa, "name": { "first": sid.to_uppercase() } })
                .await
                .unwrap();
        }

        store
    }

    fn sids(documents: &[Document]) -> Vec<&str> {
        documents
            .iter()
            .map(|d| d.get("sid").and_then(Bson::as_str).unwrap_or_default())
            .collect()
    }

    #[tokio::test]
    async fn find_many_without_filter_returns_insertion_order() {
        let store = seeded().await;

        let all = store.find_many("students", Query::new()).await.unwrap();

        assert_eq!(sids(&all), ["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn descending_sort_keeps_insertion_order_for_ties() {
        let store = seeded().await;

        let found = store
            .find_many(
                "students",
                Query::builder()
                    .filter(Filter::regex("major", "Comp"))
                    .sort("gpa", SortDirection::Desc)
                    .build(),
            )
            .await
            .unwrap();

        assert_eq!(sids(&found), ["c", "a", "d"]);

        let all = store
            .find_many("students", Query::builder().sort("gpa", SortDirection::Desc).build())
            .await
            .unwrap();

        assert_eq!(sids(&all), ["b", "c", "a", "d"]);
    }

    #[tokio::test]
    async fn unknown_sort_field_leaves_order_untouched() {
        let store = seeded().await;

        let found = store
            .find_many("students", Query::builder().sort("shoe_size", SortDirection::Asc).build())
            .await
            .unwrap();

        assert_eq!(sids(&found), ["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn unknown_filter_field_matches_nothing() {
        let store = seeded().await;

        let found = store
            .find_many("students", Query::builder().filter(Filter::regex("shoe_size", "4")).build())
            .await
            .unwrap();

        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn projection_and_limit() {
        let store = seeded().await;

        let found = store
            .find_many("students", Query::builder().project(["sid", "name.first"]).limit(2).build())
            .await
            .unwrap();

        assert_eq!(found, vec![
            doc! { "sid": "a", "name": { "first": "A" } },
            doc! { "sid": "b", "name": { "first": "B" } },
        ]);
    }

    #[tokio::test]
    async fn find_one_returns_first_match_or_none() {
        let store = seeded().await;

        let first = store.find_one("students", Filter::regex("major", "Comp")).await.unwrap();
        let none = store.find_one("students", Filter::eq("sid", "zzz")).await.unwrap();
        let other_collection = store.find_one("courses", Filter::eq("sid", "a")).await.unwrap();

        assert_eq!(first.and_then(|d| d.get("sid").cloned()), Some(Bson::String("a".into())));
        assert!(none.is_none());
        assert!(other_collection.is_none());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let store = seeded().await;

        let result = store.create("students", "a", doc! { "sid": "a" }).await;

        assert!(matches!(result, Err(ItemStoreError::WriteConflict(id, collection)) if id == "a" && collection == "students"));
    }

    #[tokio::test]
    async fn update_merges_top_level_fields() {
        let store = seeded().await;

        let outcome = store
            .update("students", Filter::eq("sid", "b"), doc! { "major": "Physics", "modifiedby": "registrar" })
            .await
            .unwrap();

        assert!(outcome.matched);
        assert_eq!(
            outcome.document,
            Some(doc! { "sid": "b", "major": "Physics", "gpa": "3.9", "name": { "first": "B" }, "modifiedby": "registrar" })
        );
    }

    #[tokio::test]
    async fn update_without_match_is_zero_effect() {
        let store = seeded().await;

        let outcome = store
            .update("students", Filter::eq("sid", "zzz"), doc! { "major": "Physics" })
            .await
            .unwrap();

        assert_eq!(outcome, UpdateOutcome::unmatched());
        assert_eq!(store.find_many("students", Query::new()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn dotted_patch_keys_set_nested_fields() {
        let store = seeded().await;

        let outcome = store
            .update("students", Filter::eq("sid", "c"), doc! { "name.last": "Hopper" })
            .await
            .unwrap();

        assert_eq!(
            outcome.document.and_then(|d| d.get("name").cloned()),
            Some(Bson::Document(doc! { "first": "C", "last": "Hopper" }))
        );
    }

    #[tokio::test]
    async fn delete_removes_only_first_match() {
        let store = seeded().await;

        let outcome = store.delete("students", Filter::regex("major", "Comp")).await.unwrap();
        let missing = store.delete("students", Filter::eq("sid", "zzz")).await.unwrap();

        assert_eq!(outcome, DeleteOutcome { ok: true, deleted_count: 1 });
        assert_eq!(missing, DeleteOutcome { ok: true, deleted_count: 0 });
        assert_eq!(sids(&store.find_many("students", Query::new()).await.unwrap()), ["b", "c", "d"]);
    }

    #[tokio::test]
    async fn malformed_filter_surfaces_as_storage_error() {
        let store = seeded().await;

        let result = store
            .find_many("students", Query::builder().filter(Filter::regex("major", "[")).build())
            .await;

        assert!(matches!(result, Err(ItemStoreError::Storage(_))));
    }
}
