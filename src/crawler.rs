//! # Website Crawler Module
//!
//! This module turns a seed URL into a deduplicated set of documents. It is the
//! first stage of the sync pipeline: its output feeds the processor, which
//! splits pages into chunks, and then the indexing engine.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: depth limit, per-request timeout, excluded directories,
//!   origin restriction and the global concurrency ceiling
//! - `Crawler`: the recursive crawler, generic over a `PageFetcher`
//! - `crawl`: convenience entry point using the HTTP fetcher
//! - `RecursiveUrlLoader`: a `DocumentLoader` that crawls on `load()`
//! - `storage`: per-page XML snapshots of a crawl and a loader reading them back
//!
//! ## Traversal
//!
//! The seed is depth 0 and is always fetched. A page discovered at depth `d` is
//! fetched only when `d < max_depth`. Every URL is fetched at most once per
//! crawl: the visited set is shared by all workers and claimed with
//! insert-if-absent semantics. A failed fetch contributes neither a document
//! nor children; only a failure at the seed empties the whole result.

mod config;
mod content_extraction;
mod error;
mod fetcher;
mod links;
mod recursive;
pub mod storage;

pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use content_extraction::{extract_metadata, html_to_text};
pub use error::CrawlError;
pub use fetcher::{HttpFetcher, PageFetcher};
pub use links::{LinkFilter, get_child_links, normalize_link};
pub use recursive::{Crawler, RecursiveUrlLoader, crawl};

use crate::document::{Document, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Represents a crawled page with its content and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    /// Normalized URL of the page
    pub url: String,

    /// Plain-text content of the page
    pub content: String,

    /// Metadata extracted from the page
    pub metadata: PageMetadata,
}

/// Metadata for a crawled page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    /// URL the page was fetched from
    pub source: String,

    /// Contents of the `<title>` element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Contents of `<meta name="description">`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The `lang` attribute of the root element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// RFC 3339 timestamp of the fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
}

impl PageMetadata {
    /// Metadata carrying only the source URL
    pub fn for_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Convert into a document metadata map, omitting absent fields
    pub fn into_metadata(self) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::String(self.source));
        let optional = [
            ("title", self.title),
            ("description", self.description),
            ("language", self.language),
            ("fetched_at", self.fetched_at),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                metadata.insert(key.to_string(), Value::String(value));
            }
        }
        metadata
    }
}

impl From<CrawledPage> for Document {
    fn from(page: CrawledPage) -> Self {
        Document {
            content: page.content,
            metadata: page.metadata.into_metadata(),
        }
    }
}
