//! Convenient re-exports of commonly used types from itemlayer.
//!
//! ```ignore
//! use itemlayer::prelude::*;
//! ```

pub use itemlayer_core::{
    backend::{DeleteOutcome, StoreBackend, StoreBackendBuilder, UpdateOutcome},
    collection::TypedCollection,
    document::{Document, DocumentExt},
    error::{ItemStoreError, ItemStoreResult},
    query::{Expr, FieldOp, Filter, Projection, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    store::ItemStore,
};
