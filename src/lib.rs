//! # docsync - keep a vector index in sync with a documentation site
//!
//! This crate crawls a documentation site and keeps a vector index consistent
//! with the crawl's current state over repeated runs.
//!
//! ## Features
//!
//! - Depth-bounded, cycle-safe concurrent crawling with a global concurrency
//!   ceiling and a shared visited set
//! - Recursive character splitting of pages into overlapping chunks
//! - Content-addressable document identities and in-batch deduplication
//! - Incremental indexing against a record store, with `incremental` (scoped
//!   to source groups) and `full` cleanup
//! - libSQL-backed record and vector stores, embeddings through `rig`
//! - Top-k retrieval over the indexed corpus
//!
//! ## Example
//!
//! ```rust,no_run
//! use docsync::crawler::{CrawlerConfig, RecursiveUrlLoader};
//! use docsync::index::{Database, LibSqlVectorStore, RecordManager};
//! use docsync::indexing::{CleanupMode, DocumentSource, IndexingConfig, index_documents};
//! use docsync::model::HashingEmbeddingModel;
//! use docsync::processor::{ChunkOptions, SplittingLoader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new_from_path("docsync.db").await?;
//!     let records = RecordManager::new(db.clone(), "local/docs");
//!     let vectors = LibSqlVectorStore::new(db, "local/docs", HashingEmbeddingModel::default()).await?;
//!
//!     let loader = SplittingLoader::new(
//!         RecursiveUrlLoader::new("https://docs.example.com/", CrawlerConfig::default()),
//!         ChunkOptions::default(),
//!     )?;
//!     let config = IndexingConfig::builder()
//!         .cleanup(CleanupMode::Full)
//!         .source_id_key("source")
//!         .build();
//!
//!     let stats = index_documents(DocumentSource::loader(loader), &records, &vectors, config).await?;
//!     println!("{}", serde_json::to_string(&stats)?);
//!     Ok(())
//! }
//! ```

mod error;

pub mod crawler;
pub mod document;
pub mod index;
pub mod indexing;
pub mod model;
pub mod processor;
pub mod search;

pub use error::{Error, Result};

/// Re-export of the most used types
pub mod prelude {
    pub use crate::crawler::{CrawlerConfig, RecursiveUrlLoader, crawl};
    pub use crate::document::{Document, Metadata};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::index::{RecordStore, VectorStore};
    pub use crate::indexing::{
        CleanupMode, DocumentLoader, DocumentSource, IndexingConfig, IndexingStats, index_documents,
    };
    pub use crate::search::search;
}
