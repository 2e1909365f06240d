//! Main itemlayer crate: one interface for reading and writing records in document stores.
//!
//! Re-exports the core types from `itemlayer-core` and the storage backends.
//!
//! # Features
//!
//! - **Typed records** - Define records with Serde and access them through typed collections
//! - **Multiple backends** - In-memory and MongoDB storage behind one trait
//! - **Store-independent queries** - Filters, sorting and projection without a store dialect
//! - **Explicit lifecycle** - A store is constructed once, opened once, and shared
//!
//! # Quick Start
//!
//! ```ignore
//! use itemlayer::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Course {
//!     pub code: String,
//!     pub title: String,
//! }
//!
//! impl Document for Course {
//!     fn id(&self) -> &str { &self.code }
//!     fn collection_name() -> &'static str { "courses" }
//! }
//!
//! #[tokio::main]
//! async fn main() -> ItemStoreResult<()> {
//!     let store = ItemStore::new(InMemoryStore::new());
//!     store.open().await?;
//!
//!     let courses = store.typed_collection::<Course>();
//!     courses.create(&Course { code: "CS101".into(), title: "Programming".into() }).await?;
//!
//!     let found = courses
//!         .find_many(
//!             Query::builder()
//!                 .filter(Filter::regex("title", "^Prog"))
//!                 .sort("code", SortDirection::Asc)
//!                 .build(),
//!         )
//!         .await?;
//!
//!     println!("Found courses: {:?}", found);
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! When the backend is picked at runtime, box it as a [`backend::DynStoreBackend`].
//! `Box<dyn DynStoreBackend>` implements [`backend::StoreBackend`] itself, so the
//! store type stays the same whichever backend is chosen:
//!
//! ```ignore
//! let backend: Box<dyn DynStoreBackend> = if let Some(uri) = uri {
//!     Box::new(MongoDbStore::builder(&uri, "students").build().await?)
//! } else {
//!     Box::new(InMemoryStore::new())
//! };
//! let store = ItemStore::new(backend);
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

pub mod prelude;

pub use itemlayer_core::{backend, collection, document, error, query, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use itemlayer_memory::InMemoryStore;
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use itemlayer_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
