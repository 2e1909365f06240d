//! Student records API built on the itemlayer item access layer.
//!
//! - [`model`] - Input, stored and output shapes of a student
//! - [`resolver`] - One resolver per API operation, each a single store call
//! - [`executor`] - Dispatches requested fields to resolvers and collects errors
//! - [`config`] - Environment configuration for the `studentctl` binary

pub mod config;
pub mod error;
pub mod executor;
pub mod model;
pub mod resolver;

pub use error::{ResolverError, ResolverResult};
pub use executor::{Executor, Request, Response};
pub use resolver::Resolver;
