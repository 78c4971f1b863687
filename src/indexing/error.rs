//! Error types for the indexing module

use crate::error::Error as CrateError;
use crate::index::DbError;
use thiserror::Error;

/// Error type for indexing runs. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Incremental cleanup without a source id key
    #[error("Source id key is required when cleanup mode is incremental.")]
    MissingSourceIdKey,

    /// A document had no source id under incremental cleanup
    #[error(
        "Source ids are required when cleanup mode is incremental.\nDocument that starts with content: {content_prefix} was not assigned as source id."
    )]
    MissingSourceId {
        /// First 100 characters of the offending document
        content_prefix: String,
    },

    /// Options that cannot run
    #[error("Invalid indexing configuration: {0}")]
    InvalidConfig(String),

    /// The document source failed to load
    #[error("Error loading documents from source: {0}")]
    SourceLoad(String),

    /// A record store or vector store call failed
    #[error("Store error: {0}")]
    Store(#[from] DbError),

    /// A store returned a response of the wrong shape
    #[error("Store contract violated: {0}")]
    Contract(String),
}

impl From<IndexError> for CrateError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Store(e) => e.into(),
            _ => CrateError::Index(err.to_string()),
        }
    }
}
