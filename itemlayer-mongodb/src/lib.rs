//! MongoDB backend for the item access layer.
//!
//! Implements `StoreBackend` on top of the official async MongoDB driver, translating
//! filters into MongoDB query documents and using the driver's sort, projection and
//! limit options.
//!
//! Records are stored with their item id as `_id`, which makes the id unique at the
//! database level; a duplicate id is reported as a write conflict. An `_inserted`
//! object id records insertion order and breaks ties when sorting. Both fields are
//! stripped from returned records.
//!
//! To use this backend, include the `mongodb` feature:
//!
//! ```toml
//! [dependencies]
//! itemlayer = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The builder parses the connection string; the connection itself is established
//! and verified (with a `ping`) when the item store is opened.
//!
//! # Example
//!
//! ```ignore
//! use itemlayer::{backend::StoreBackendBuilder, mongodb::MongoDbStore, store::ItemStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MongoDbStore::builder("mongodb://localhost:27017", "students")
//!         .build()
//!         .await?;
//!     let store = ItemStore::new(backend);
//!     store.open().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as itemlayer_mongodb;

pub mod store;
pub(crate) mod query;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
