//! A thin item access layer over document stores.
//!
//! This crate is the core of the itemlayer project and provides:
//!
//! - **Record traits** ([`document`]) - The trait typed records implement, and BSON conversions
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Query model** ([`query`]) - Filters, sort and projection independent of any store dialect
//! - **Item store** ([`store`]) - The long-lived, explicitly opened handle callers go through
//! - **Typed collections** ([`collection`]) - Record-typed access to one collection
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use itemlayer::{document::Document, store::ItemStore, query::Filter};
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
//! let store = ItemStore::new(backend);
//! store.open().await?;
//! let courses = store.typed_collection::<Course>();
//! let found = courses.find_one(Filter::eq("code", "CS101")).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as itemlayer_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod query;
pub mod store;
