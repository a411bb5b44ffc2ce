//! Read-only search backend contract used by the resolvers.
//!
//! Implementations translate the typed filters into backend queries:
//!
//! - [ElasticsearchRepository](elasticsearch::ElasticsearchRepository) talks
//!   to an Elasticsearch cluster over HTTP.
//! - [MemoryRepository](memory::MemoryRepository) serves fixture records for
//!   local runs and tests.
//!
//! Unset predicates impose no constraint. Ordering is applied as given, then
//! the filter's tiebreaker. Retries, if any, belong to the implementation.

pub mod elasticsearch;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::query::filters::{DepartmentFilter, Page, UserFilter};
use crate::query::types::{Department, Hits, User};

pub use elasticsearch::{ElasticsearchConfig, ElasticsearchRepository};
pub use memory::MemoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RepositoryError::Decode(err.to_string())
        } else {
            RepositoryError::Request(err.to_string())
        }
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    /// Page of users matching the filter plus the total match count
    async fn search_users(&self, filter: &UserFilter, page: Page) -> Result<Hits<User>, RepositoryError>;

    /// Page of departments matching the filter plus the total match count
    async fn search_departments(
        &self,
        filter: &DepartmentFilter,
        page: Page,
    ) -> Result<Hits<Department>, RepositoryError>;

    /// Point lookup; `None` when no user has this id
    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    /// Batch lookup. Result order is not guaranteed to follow `ids`.
    async fn list_users(&self, ids: &[String]) -> Result<Vec<User>, RepositoryError>;

    /// Readiness check
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
