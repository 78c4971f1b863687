//! Index stores module
//!
//! The two persisted collaborators of the indexing engine, both backed by
//! libSQL and both scoped to a namespace:
//!
//! - `RecordManager` implements `RecordStore`, tracking which document uids
//!   were indexed, under which source group and when they were last seen
//! - `LibSqlVectorStore` implements `VectorStore`, storing documents with their
//!   embeddings and answering similarity searches
//!
//! A single `Database` can back both.

mod database;
pub mod error;
mod record_manager;
mod schema;
mod vector_store;

pub use database::Database;
pub use error::DbError;
pub use record_manager::{ListKeysOptions, Record, RecordManager, RecordStore, UpdateOptions};
pub use vector_store::{LibSqlVectorStore, ScoredDocument, VectorStore};
