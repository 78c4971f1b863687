//! Error types for the docsync crate

use thiserror::Error;

/// Result type for docsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for docsync operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration or missing environment
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Crawl snapshot storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Document preparation error
    #[error("Process error: {0}")]
    Process(String),

    /// Indexing run error
    #[error("Index error: {0}")]
    Index(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Search error
    #[error("Search error: {0}")]
    Search(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
