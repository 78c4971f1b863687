//! Error types for the search module

use thiserror::Error;

use crate::error::Error as CrateError;
use crate::index::DbError;

/// Errors that can occur during retrieval
#[derive(Debug, Error)]
pub enum SearchError {
    /// Error from the vector store
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// The query cannot be searched
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid search parameters
    #[error("Invalid search parameters: {0}")]
    InvalidParameters(String),
}

impl From<SearchError> for CrateError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Database(e) => e.into(),
            _ => CrateError::Search(err.to_string()),
        }
    }
}
