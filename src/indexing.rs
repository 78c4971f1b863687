//! # Indexing Module
//!
//! Keeps a vector store consistent with a changing set of documents over
//! repeated runs.
//!
//! Every document is hashed into a content-addressable `uid`. The record store
//! remembers which uids were seen, when, and under which source group. A run
//! captures its start time from the record store's clock, writes only documents
//! whose uid is new (or all of them with `force_update`), touches every uid it
//! saw, and then deletes records that were not touched:
//!
//! - `incremental` cleanup runs after each batch and only considers records
//!   that share a source group with that batch
//! - `full` cleanup runs once at the end and considers every record
//!
//! A record touched during the current run is never deleted.

mod config;
mod engine;
mod error;
mod hashing;
mod source;

pub use config::{CleanupMode, IndexingConfig, IndexingConfigBuilder};
pub use engine::{Indexer, IndexingStats, index_documents};
pub use error::IndexError;
pub use hashing::{
    HashedDocument, SourceIdAssigner, UID_NAMESPACE, VOLATILE_METADATA_KEYS, dedupe_in_order,
};
pub use source::{DocumentLoader, DocumentSource, LoadError};
