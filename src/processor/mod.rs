//! Content processor module
//!
//! Turns crawled documents into indexable chunks. Each chunk keeps a copy of
//! its parent's metadata, so chunks of the same page share a `source` and are
//! cleaned up together by incremental indexing.

mod config;
mod error;
mod splitter;

pub use config::{ChunkOptions, DEFAULT_SEPARATORS, ProcessorConfig, ProcessorConfigBuilder};
pub use error::ProcessError;
pub use splitter::RecursiveCharacterSplitter;

use crate::document::Document;
use crate::indexing::{DocumentLoader, LoadError};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

/// Metadata keys that every chunk carries, defaulted to an empty string
pub const REQUIRED_METADATA_KEYS: [&str; 2] = ["source", "title"];

/// Split documents into chunks, copying each document's metadata to its chunks
///
/// # Arguments
///
/// * `splitter` - The splitter to use
/// * `documents` - The documents to split
///
/// # Returns
///
/// The chunks, in document order
#[instrument(skip_all, fields(documents = documents.len()))]
pub fn split_documents(splitter: &RecursiveCharacterSplitter, documents: Vec<Document>) -> Vec<Document> {
    let chunks: Vec<Document> = documents
        .into_iter()
        .flat_map(|document| {
            let Document { content, metadata } = document;
            splitter
                .split_text(&content)
                .into_iter()
                .map(move |chunk| Document {
                    content: chunk,
                    metadata: metadata.clone(),
                })
        })
        .collect();

    debug!("Split into {} chunks", chunks.len());
    chunks
}

/// Give every document a `source` and `title`, using `""` when absent, null or empty
pub fn fill_metadata_defaults(mut documents: Vec<Document>) -> Vec<Document> {
    for document in &mut documents {
        for key in REQUIRED_METADATA_KEYS {
            let missing = match document.metadata.get(key) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(Value::Bool(b)) => !b,
                Some(_) => false,
            };
            if missing {
                document.metadata.insert(key.to_string(), Value::String(String::new()));
            }
        }
    }
    documents
}

/// Split and default the metadata of documents in one step
pub fn prepare_documents(splitter: &RecursiveCharacterSplitter, documents: Vec<Document>) -> Vec<Document> {
    fill_metadata_defaults(split_documents(splitter, documents))
}

/// A loader that splits the output of another loader into chunks
pub struct SplittingLoader<L> {
    inner: L,
    splitter: RecursiveCharacterSplitter,
}

impl<L: DocumentLoader> SplittingLoader<L> {
    /// Wrap `inner`, splitting with the given options
    pub fn new(inner: L, options: ChunkOptions) -> Result<Self, ProcessError> {
        Ok(Self {
            inner,
            splitter: RecursiveCharacterSplitter::new(options)?,
        })
    }

    /// Wrap `inner` with an existing splitter
    pub fn with_splitter(inner: L, splitter: RecursiveCharacterSplitter) -> Self {
        Self { inner, splitter }
    }
}

#[async_trait]
impl<L: DocumentLoader> DocumentLoader for SplittingLoader<L> {
    async fn load(&self) -> Result<Vec<Document>, LoadError> {
        let documents = self.inner.load().await?;
        Ok(prepare_documents(&self.splitter, documents))
    }
}
