//! XML snapshots of crawled pages.
//!
//! Each page is written to `<base>/<host>/<path>.xml`, mirroring the URL path
//! as nested directories. A path ending in `/` maps to `index.xml` inside that
//! directory. Snapshots can be read back as documents with [`SnapshotLoader`]
//! so that indexing can run without re-crawling.

use quick_xml::{de::from_str, se::to_string};
use serde::{Deserialize, Serialize};
use std::{io, path::Path, path::PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{CrawledPage, PageMetadata};
use crate::document::Document;
use crate::error::Error as CrateError;
use crate::indexing::{DocumentLoader, LoadError};
use async_trait::async_trait;

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base path for storage
    pub base_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(".docsync/crawl"),
        }
    }
}

/// XML document wrapping stored pages
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename = "pages")]
struct Pages {
    #[serde(rename = "page", default)]
    pages: Vec<PageEntry>,
}

/// A single stored page
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PageEntry {
    /// URL of the page
    pub url: String,

    /// Plain-text content of the page
    pub content: String,

    /// Metadata extracted from the page
    pub metadata: PageMetadata,
}

impl From<CrawledPage> for PageEntry {
    fn from(page: CrawledPage) -> Self {
        PageEntry {
            url: page.url,
            content: page.content,
            metadata: page.metadata,
        }
    }
}

impl From<PageEntry> for CrawledPage {
    fn from(entry: PageEntry) -> Self {
        CrawledPage {
            url: entry.url,
            content: entry.content,
            metadata: entry.metadata,
        }
    }
}

impl From<PageEntry> for Document {
    fn from(entry: PageEntry) -> Self {
        CrawledPage::from(entry).into()
    }
}

impl AsRef<PageEntry> for PageEntry {
    fn as_ref(&self) -> &PageEntry {
        self
    }
}

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("XML serialization error: {0}")]
    Serialize(#[from] quick_xml::errors::serialize::SeError),

    #[error("XML deserialization error: {0}")]
    Deserialize(#[from] quick_xml::errors::serialize::DeError),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid URL for storage: {0}")]
    InvalidUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for CrateError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => CrateError::Io(e),
            _ => CrateError::Storage(err.to_string()),
        }
    }
}

type Result<T> = std::result::Result<T, StorageError>;

/// Reads and writes page snapshots under a base directory
#[derive(Debug, Clone, Default)]
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new storage with custom configuration
    pub fn with_config(config: StorageConfig) -> Self {
        Self { config }
    }

    /// The directory holding all snapshots
    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// Gets the storage path for a given URL
    pub fn storage_path(&self, url: &str) -> Result<PathBuf> {
        let parsed = Url::parse(url)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| StorageError::InvalidUrl(url.to_string()))?;

        let mut path = self.config.base_path.join(sanitize_segment(host));
        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|segments| segments.collect())
            .unwrap_or_default();

        match segments.split_last() {
            None => path.push("index.xml"),
            Some((last, dirs)) => {
                for dir in dirs.iter().filter(|dir| !dir.is_empty()) {
                    path.push(sanitize_segment(dir));
                }
                if last.is_empty() {
                    path.push("index.xml");
                } else {
                    path.push(format!("{}.xml", sanitize_segment(last)));
                }
            }
        }

        Ok(path)
    }

    /// Stores a single page entry as an XML file
    #[instrument(skip(self, entry), fields(url = %entry.url))]
    pub async fn store(&self, entry: &PageEntry) -> Result<PathBuf> {
        let storage_path = self.storage_path(&entry.url)?;
        if let Some(parent) = storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let pages = Pages {
            pages: vec![entry.clone()],
        };
        let xml = to_string(&pages)?;

        fs::write(
            &storage_path,
            format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml),
        )
        .await?;
        debug!("Stored page at {}", storage_path.display());
        Ok(storage_path)
    }

    /// Stores multiple page entries in their respective XML files
    pub async fn store_batch<I>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: AsRef<PageEntry>,
    {
        let mut stored = 0;
        for entry in entries {
            self.store(entry.as_ref()).await?;
            stored += 1;
        }
        Ok(stored)
    }

    /// Loads the page stored for a URL
    pub async fn load(&self, url: &str) -> Result<PageEntry> {
        let storage_path = self.storage_path(url)?;
        if !fs::try_exists(&storage_path).await? {
            return Err(StorageError::NotFound(url.to_string()));
        }
        read_entry(&storage_path).await
    }

    /// Loads all pages stored for a host, sorted by URL.
    ///
    /// Accepts either a host name or a full URL. Unreadable files are skipped
    /// with a warning.
    pub async fn load_domain(&self, domain_or_url: &str) -> Result<Vec<PageEntry>> {
        let domain = if domain_or_url.contains("://") {
            let parsed = Url::parse(domain_or_url)?;
            parsed
                .host_str()
                .ok_or_else(|| StorageError::InvalidUrl(domain_or_url.to_string()))?
                .to_string()
        } else {
            domain_or_url.to_string()
        };

        let root = self.config.base_path.join(sanitize_segment(&domain));
        if !fs::try_exists(&root).await? {
            return Err(StorageError::NotFound(format!(
                "No pages found for domain {}",
                domain
            )));
        }

        let mut entries = Vec::new();
        let mut pending = vec![root];
        while let Some(dir) = pending.pop() {
            let mut dir_entries = fs::read_dir(&dir).await?;
            while let Some(entry) = dir_entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if path.extension().is_some_and(|ext| ext == "xml") {
                    match read_entry(&path).await {
                        Ok(page) => entries.push(page),
                        Err(e) => warn!("Failed to load page {}: {}", path.display(), e),
                    }
                }
            }
        }

        entries.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(entries)
    }
}

async fn read_entry(path: &Path) -> Result<PageEntry> {
    let xml_content = fs::read_to_string(path).await?;
    let pages: Pages = from_str(&xml_content)?;

    pages.pages.into_iter().next().ok_or_else(|| {
        StorageError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            "XML file contains no pages",
        ))
    })
}

fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// A document loader reading the snapshots of one host
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    storage: Storage,
    domain: String,
}

impl SnapshotLoader {
    /// Create a loader for the pages stored for `domain_or_url`
    pub fn new(storage: Storage, domain_or_url: impl Into<String>) -> Self {
        Self {
            storage,
            domain: domain_or_url.into(),
        }
    }
}

#[async_trait]
impl DocumentLoader for SnapshotLoader {
    async fn load(&self) -> std::result::Result<Vec<Document>, LoadError> {
        let entries = self.storage.load_domain(&self.domain).await?;
        Ok(entries.into_iter().map(Document::from).collect())
    }
}
