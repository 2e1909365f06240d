//! In-memory storage backend for the item access layer.
//!
//! Provides a thread-safe implementation of the `StoreBackend` trait that keeps
//! every collection in process memory. Useful for development, tests, and running
//! without a database.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Full query support** - Filtering (including case-sensitive regex), stable sorting, projection and limits
//! - **Insertion order** - Unsorted results and sort ties come back in insertion order
//!
//! # Quick Start
//!
//! ```ignore
//! use itemlayer::{store::ItemStore, memory::InMemoryStore, query::Filter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ItemStore::new(InMemoryStore::new());
//!     store.open().await?;
//!
//!     let found = store.find_one("students", Filter::eq("sid", "s-1")).await?;
//!     assert!(found.is_none());
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as itemlayer_memory;

pub mod store;
pub(crate) mod evaluator;

pub use store::InMemoryStore;
