//! Query failures and the error body returned to callers.

use async_graphql::Pos;
use serde::Serialize;
use thiserror::Error;

use crate::repository::RepositoryError;

/// Stage-specific failure kinds. Callers receive the kind in the error body;
/// all of them map to the same HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    Validation,
    Binding,
    MissingArgument,
    Backend,
    Consistency,
}

/// Line/column of the request text an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl From<Pos> for Location {
    fn from(pos: Pos) -> Self {
        Self {
            line: pos.line,
            column: pos.column,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{message}")]
    Parse {
        message: String,
        locations: Vec<Location>,
    },

    #[error("{message}")]
    Validation {
        message: String,
        locations: Vec<Location>,
    },

    #[error("cannot bind arguments: {0}")]
    Binding(String),

    #[error("argument `{0}` is required")]
    MissingArgument(&'static str),

    #[error("search backend: {0}")]
    Backend(#[from] RepositoryError),

    /// The caller's identity did not resolve to a user record. Never expected
    /// in a healthy deployment; points at ingestion or index corruption.
    #[error("user `{user_id}` does not exist, directory data is inconsistent")]
    Consistency { user_id: String },
}

impl QueryError {
    pub fn validation(message: impl Into<String>, pos: Option<Pos>) -> Self {
        QueryError::Validation {
            message: message.into(),
            locations: pos.map(Location::from).into_iter().collect(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Parse { .. } => ErrorKind::Parse,
            QueryError::Validation { .. } => ErrorKind::Validation,
            QueryError::Binding(_) => ErrorKind::Binding,
            QueryError::MissingArgument(_) => ErrorKind::MissingArgument,
            QueryError::Backend(_) => ErrorKind::Backend,
            QueryError::Consistency { .. } => ErrorKind::Consistency,
        }
    }

    pub fn locations(&self) -> &[Location] {
        match self {
            QueryError::Parse { locations, .. } | QueryError::Validation { locations, .. } => {
                locations
            }
            _ => &[],
        }
    }

    /// Log at a severity matching how serious the failure is.
    pub fn log(&self) {
        match self.kind() {
            ErrorKind::Consistency => tracing::error!(kind = ?self.kind(), error = %self, "Directory data inconsistency"),
            ErrorKind::Backend => tracing::warn!(kind = ?self.kind(), error = %self, "Search backend call failed"),
            _ => tracing::info!(kind = ?self.kind(), error = %self, "Query rejected"),
        }
    }
}

/// Every error collected for one request. Never empty.
#[derive(Debug)]
pub struct QueryErrors(Vec<QueryError>);

impl QueryErrors {
    pub fn new(errors: Vec<QueryError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self(errors)
    }

    pub fn errors(&self) -> &[QueryError] {
        &self.0
    }

    /// Body returned with HTTP 400
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: 400,
            msg: self.0.first().map(ToString::to_string).unwrap_or_default(),
            errors: self
                .0
                .iter()
                .map(|err| ErrorEntry {
                    kind: err.kind(),
                    message: err.to_string(),
                    locations: err.locations().to_vec(),
                })
                .collect(),
        }
    }
}

impl From<QueryError> for QueryErrors {
    fn from(err: QueryError) -> Self {
        Self(vec![err])
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub msg: String,
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEntry {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
}
