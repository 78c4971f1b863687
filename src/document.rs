//! The document type shared by the crawler, the processor and the indexing engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form document metadata
pub type Metadata = serde_json::Map<String, Value>;

/// A unit of text plus metadata, immutable once produced by a loader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Normalized text content
    pub content: String,

    /// Metadata such as `source`, `title`, `description`, `language`
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document without metadata
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Get a metadata entry as a string, if it is one
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// The `source` metadata entry (the page URL for crawled documents)
    pub fn source(&self) -> Option<&str> {
        self.metadata_str("source")
    }

    /// First `max_chars` characters of the content, used in error messages
    pub fn content_prefix(&self, max_chars: usize) -> String {
        self.content.chars().take(max_chars).collect()
    }
}
