//! Query resolution engine.
//!
//! Request text selects one root operation from the [schema] registry; the
//! [executor] validates it, the [binder] turns its arguments into typed
//! filters and the [resolvers] run them against a
//! [Repository](crate::repository::Repository).

pub mod binder;
pub mod context;
pub mod error;
pub mod executor;
pub mod filters;
pub mod resolvers;
pub mod schema;
pub mod types;

pub use binder::{Binder, BoundQuery, PagingPolicy};
pub use context::{ExecutionContext, Identity};
pub use error::{ErrorKind, QueryError, QueryErrors};
pub use executor::{Executor, QueryRequest, QueryResponse};
pub use resolvers::{Resolved, Resolvers};
pub use schema::OperationKind;
