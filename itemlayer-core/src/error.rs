//! Error types and result types for item access operations.
//!
//! Use [`ItemStoreResult<T>`] as the return type for fallible operations. Reads that
//! match nothing and mutations that affect nothing are not errors; they are reported
//! through `Option` and the outcome types in [`crate::backend`].

use bson::error::Error as BsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with an item store.
#[derive(Error, Debug)]
pub enum ItemStoreError {
    /// Conversion between a typed record and its BSON representation failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The backend could not be constructed from its configuration.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The store cannot be reached, or has not been opened yet.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    /// The store rejected or failed a call at the protocol level (including malformed filters).
    #[error("Storage error: {0}")]
    Storage(String),
    /// An item with the given id already exists.
    /// The first argument is the item id, the second is the collection name.
    #[error("Item {0} already exists in collection {1}")]
    WriteConflict(String, String),
}

/// A specialized `Result` type for item store operations.
pub type ItemStoreResult<T> = Result<T, ItemStoreError>;

impl From<BsonError> for ItemStoreError {
    fn from(err: BsonError) -> Self {
        ItemStoreError::Serialization(err.to_string())
    }
}
