//! Core traits for typed records stored through the item access layer.
//!
//! This module provides the trait every typed record implements, as well as the
//! conversions between a record and the BSON documents the backends operate on.

use bson::{Document as BsonDocument, de::deserialize_from_document, ser::serialize_to_document};
use serde::{Deserialize, Serialize};

use crate::error::ItemStoreResult;

/// Core trait that all typed records stored in an item store must implement.
///
/// Every record carries an opaque string identifier, unique within its collection,
/// and names the collection it belongs to.
///
/// # Example
///
/// ```ignore
/// use itemlayer::document::Document;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Course {
///     pub code: String,
///     pub title: String,
/// }
///
/// impl Document for Course {
///     fn id(&self) -> &str {
///         &self.code
///     }
///
///     fn collection_name() -> &'static str {
///         "courses"
///     }
/// }
/// ```
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns this record's unique identifier.
    fn id(&self) -> &str;

    /// Returns the name of the collection this record belongs to.
    fn collection_name() -> &'static str;
}

/// Extension trait providing BSON conversions for records.
///
/// Automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this record to a BSON document for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the record does not serialize to a document.
    fn to_document(&self) -> ItemStoreResult<BsonDocument>;

    /// Creates a record from a stored BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not have the record's shape.
    fn from_document(document: BsonDocument) -> ItemStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_document(&self) -> ItemStoreResult<BsonDocument> {
        to_patch(self)
    }

    fn from_document(document: BsonDocument) -> ItemStoreResult<Self> {
        Ok(deserialize_from_document(document)?)
    }
}

/// Serializes any value into a BSON document, typically a partial record used as an update patch.
pub fn to_patch<P: Serialize>(value: &P) -> ItemStoreResult<BsonDocument> {
    Ok(serialize_to_document(value)?)
}
