//! Error types for the crawler module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The fetch did not complete within the configured timeout
    #[error("Timed out after {timeout_ms}ms fetching {url}")]
    Timeout {
        /// URL being fetched
        url: String,
        /// Configured timeout
        timeout_ms: u64,
    },

    /// The response was not an HTML document
    #[error("Unsupported content type '{content_type}' at {url}")]
    UnsupportedContent {
        /// URL being fetched
        url: String,
        /// Reported content type
        content_type: String,
    },

    /// HTML parsing error
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The crawl produced no pages, usually because the seed could not be fetched
    #[error("No pages crawled from {0}")]
    EmptyCrawl(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<CrawlError> for CrateError {
    fn from(err: CrawlError) -> Self {
        match err {
            CrawlError::Http(e) => CrateError::Http(e),
            _ => CrateError::Crawl(err.to_string()),
        }
    }
}
