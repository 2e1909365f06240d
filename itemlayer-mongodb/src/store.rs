use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, doc, oid::ObjectId};
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    IndexModel,
    options::{ClientOptions, ReturnDocument},
};
use tracing::debug;
use itemlayer_core::{
    backend::{DeleteOutcome, StoreBackend, StoreBackendBuilder, UpdateOutcome},
    error::{ItemStoreError, ItemStoreResult},
    query::{Expr, Query, QueryVisitor},
};

use crate::query::MongoQueryTranslator;

/// Field recording insertion order, used as the sort tiebreak.
const INSERTED_FIELD: &str = "_inserted";
const DUPLICATE_KEY: i32 = 11000;


#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
    /// (collection, field) pairs looked up by equality; indexed together with the insertion marker.
    lookup_fields: Vec<(String, String)>,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database, lookup_fields: Vec::new() }
    }

    /// Declares a field that filters on `collection` look up by equality.
    pub fn with_lookup_field(mut self, collection: &str, field: &str) -> Self {
        self.lookup_fields.push((collection.to_string(), field.to_string()));
        self
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn translate(filter: &Expr) -> ItemStoreResult<Document> {
        MongoQueryTranslator.visit_expr(filter)
    }

    fn insertion_order() -> Document {
        doc! { INSERTED_FIELD: 1 }
    }

    /// Indexes created on open, per collection: the insertion marker alone for
    /// unfiltered reads, and each lookup field followed by the marker.
    fn index_models(&self) -> Vec<(String, IndexModel)> {
        let mut indexed: Vec<&str> = Vec::new();
        let mut models = Vec::new();
        for (collection, field) in &self.lookup_fields {
            if !indexed.contains(&collection.as_str()) {
                indexed.push(collection);
                models.push((collection.clone(), IndexModel::builder().keys(Self::insertion_order()).build()));
            }

            let mut keys = Document::new();
            keys.insert(field.clone(), 1);
            keys.insert(INSERTED_FIELD, 1);
            models.push((collection.clone(), IndexModel::builder().keys(keys).build()));
        }
        models
    }

    fn prepare_document(id: &str, document: Document) -> Document {
        let mut prepared = document;
        prepared.insert("_id", id);
        prepared.insert(INSERTED_FIELD, ObjectId::new());
        prepared
    }

    fn restore_document(document: Document) -> Document {
        document
            .into_iter()
            .filter(|(k, _)| !["_id", INSERTED_FIELD].contains(&k.as_str()))
            .collect()
    }

    async fn shutdown(self) -> ItemStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

/// Maps driver errors onto the item store's failure kinds.
fn map_error(error: MongoError) -> ItemStoreError {
    match error.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
            ItemStoreError::StorageUnavailable(error.to_string())
        },
        _ => ItemStoreError::Storage(error.to_string()),
    }
}

fn is_duplicate_key(error: &MongoError) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn open(&self) -> ItemStoreResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(map_error)?;

        debug!(database = %self.database, "mongodb reachable");

        for (collection, model) in self.index_models() {
            self.get_collection(&collection)
                .create_index(model)
                .await
                .map_err(map_error)?;
            debug!(collection = %collection, "index ensured");
        }

        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: Expr) -> ItemStoreResult<Option<Document>> {
        Ok(
            self.get_collection(collection)
                .find_one(Self::translate(&filter)?)
                .sort(Self::insertion_order())
                .await
                .map_err(map_error)?
                .map(Self::restore_document)
        )
    }

    async fn find_many(&self, collection: &str, query: Query) -> ItemStoreResult<Vec<Document>> {
        let filter = match &query.filter {
            Some(expr) => Self::translate(expr)?,
            None => doc! {},
        };

        let mut sort = Document::new();
        if let Some(order) = &query.sort {
            sort.insert(order.field.clone(), order.direction.as_i32());
        }
        sort.insert(INSERTED_FIELD, 1);

        let collection = self.get_collection(collection);
        let mut find = collection
            .find(filter)
            .sort(sort);

        if !query.projection.is_empty() {
            find = find.projection(
                query.projection
                    .fields()
                    .iter()
                    .map(|field| (field.clone(), Bson::Int32(1)))
                    .collect::<Document>()
            );
        }
        if let Some(limit) = query.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        Ok(
            find
                .await
                .map_err(map_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(map_error)?
                .into_iter()
                .map(Self::restore_document)
                .collect()
        )
    }

    async fn create(&self, collection: &str, id: &str, document: Document) -> ItemStoreResult<Document> {
        self.get_collection(collection)
            .insert_one(Self::prepare_document(id, document.clone()))
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    ItemStoreError::WriteConflict(id.to_string(), collection.to_string())
                } else {
                    map_error(e)
                }
            })?;

        Ok(document)
    }

    async fn update(&self, collection: &str, filter: Expr, patch: Document) -> ItemStoreResult<UpdateOutcome> {
        let filter = Self::translate(&filter)?;
        let collection = self.get_collection(collection);

        // MongoDB rejects an empty $set
        let updated = if patch.is_empty() {
            collection
                .find_one(filter)
                .sort(Self::insertion_order())
                .await
        } else {
            collection
                .find_one_and_update(filter, doc! { "$set": patch })
                .sort(Self::insertion_order())
                .return_document(ReturnDocument::After)
                .await
        };
        let updated = updated.map_err(map_error)?;

        Ok(match updated {
            Some(document) => UpdateOutcome::updated(Self::restore_document(document)),
            None => UpdateOutcome::unmatched(),
        })
    }

    async fn delete(&self, collection: &str, filter: Expr) -> ItemStoreResult<DeleteOutcome> {
        let deleted = self.get_collection(collection)
            .find_one_and_delete(Self::translate(&filter)?)
            .sort(Self::insertion_order())
            .await
            .map_err(map_error)?;

        Ok(DeleteOutcome::deleted(u64::from(deleted.is_some())))
    }

    async fn shutdown(self) -> ItemStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    lookup_fields: Vec<(String, String)>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            lookup_fields: Vec::new(),
        }
    }

    /// See [`MongoDbStore::with_lookup_field`].
    pub fn lookup_field(mut self, collection: &str, field: &str) -> Self {
        self.lookup_fields.push((collection.to_string(), field.to_string()));
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    /// Parses the connection string and creates the client. No connection is made
    /// until the store is opened.
    async fn build(self) -> ItemStoreResult<Self::Backend> {
        let client = Client::with_options(
            ClientOptions::parse(&self.dsn)
                .await
                .map_err(|e| ItemStoreError::Initialization(e.to_string()))?,
        )
        .map_err(|e| ItemStoreError::Initialization(e.to_string()))?;

        Ok(MongoDbStore { client, database: self.database, lookup_fields: self.lookup_fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepared_documents_carry_key_and_insertion_marker() {
        let prepared = MongoDbStore::prepare_document("s-1", doc! { "sid": "s-1", "major": "CS" });

        assert_eq!(prepared.get("_id"), Some(&Bson::String("s-1".into())));
        assert!(matches!(prepared.get(INSERTED_FIELD), Some(Bson::ObjectId(_))));
    }

    #[test]
    fn restored_documents_drop_storage_fields() {
        let prepared = MongoDbStore::prepare_document("s-1", doc! { "sid": "s-1", "major": "CS" });

        assert_eq!(MongoDbStore::restore_document(prepared), doc! { "sid": "s-1", "major": "CS" });
    }

    #[tokio::test]
    async fn lookup_fields_are_indexed_with_insertion_order() {
        let store = MongoDbStore::builder("mongodb://localhost:27017", "registry")
            .lookup_field("students", "sid")
            .lookup_field("students", "email")
            .build()
            .await
            .unwrap();

        let keys = store
            .index_models()
            .into_iter()
            .map(|(collection, model)| (collection, model.keys))
            .collect::<Vec<_>>();

        assert_eq!(keys, vec![
            ("students".to_string(), doc! { INSERTED_FIELD: 1 }),
            ("students".to_string(), doc! { "sid": 1, INSERTED_FIELD: 1 }),
            ("students".to_string(), doc! { "email": 1, INSERTED_FIELD: 1 }),
        ]);
    }
}
