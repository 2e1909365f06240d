//! Errors raised by the resolver layer.

use itemlayer::error::ItemStoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    /// The request was rejected before reaching the store.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The item access layer failed the call.
    #[error(transparent)]
    Store(#[from] ItemStoreError),
}

pub type ResolverResult<T> = Result<T, ResolverError>;
