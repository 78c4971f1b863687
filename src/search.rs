//! # Retrieval Module
//!
//! The read side of the index: `search(query, k)` returns the `k` indexed
//! documents most similar to a query, closest first. A `Retriever` is the same
//! operation bound to a store and a fixed `k`, obtained with
//! `VectorStore::as_retriever(k)`, and is what downstream consumers such as a
//! chat backend hold on to.

mod error;
mod retriever;

pub use error::SearchError;
pub use retriever::Retriever;

use crate::document::Document;
use crate::index::VectorStore;

/// Search `store` for the `k` documents most similar to `query`
pub async fn search<V>(store: &V, query: &str, k: usize) -> Result<Vec<Document>, SearchError>
where
    V: VectorStore + ?Sized,
{
    Retriever::new(store, k).retrieve(query).await
}
