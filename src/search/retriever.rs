//! Top-k retrieval over a vector store

use super::error::SearchError;
use crate::document::Document;
use crate::index::{ScoredDocument, VectorStore};
use tracing::{debug, instrument};

/// Returns the `k` documents most similar to a query
pub struct Retriever<'a, V: ?Sized> {
    store: &'a V,
    k: usize,
}

impl<V: ?Sized> Clone for Retriever<'_, V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            k: self.k,
        }
    }
}

impl<'a, V> Retriever<'a, V>
where
    V: VectorStore + ?Sized,
{
    /// Create a retriever over `store`
    pub fn new(store: &'a V, k: usize) -> Self {
        Self { store, k }
    }

    /// Number of documents returned per query
    pub fn k(&self) -> usize {
        self.k
    }

    /// Retrieve documents with their similarity scores, closest first
    #[instrument(skip(self), fields(k = self.k))]
    pub async fn retrieve_scored(&self, query: &str) -> Result<Vec<ScoredDocument>, SearchError> {
        if self.k == 0 {
            return Err(SearchError::InvalidParameters(
                "k must be greater than zero".to_string(),
            ));
        }
        if query.trim().is_empty() {
            return Err(SearchError::Query("Query must not be empty".to_string()));
        }

        let results = self.store.similarity_search(query, self.k).await?;
        debug!("Retrieved {} documents", results.len());
        Ok(results)
    }

    /// Retrieve documents, closest first
    pub async fn retrieve(&self, query: &str) -> Result<Vec<Document>, SearchError> {
        let results = self.retrieve_scored(query).await?;
        Ok(results.into_iter().map(|scored| scored.document).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{DbError, VectorStore};
    use async_trait::async_trait;

    /// Returns its documents in order, ignoring the query
    struct FixedStore(Vec<Document>);

    #[async_trait]
    impl VectorStore for FixedStore {
        async fn add_documents(&self, _: &[Document], _: &[String]) -> Result<(), DbError> {
            Ok(())
        }

        async fn delete(&self, _: &[String]) -> Result<(), DbError> {
            Ok(())
        }

        async fn similarity_search(&self, _: &str, k: usize) -> Result<Vec<ScoredDocument>, DbError> {
            Ok(self
                .0
                .iter()
                .take(k)
                .enumerate()
                .map(|(i, doc)| ScoredDocument {
                    id: i.to_string(),
                    document: doc.clone(),
                    score: 1.0 - i as f64 / 10.0,
                })
                .collect())
        }
    }

    fn store() -> FixedStore {
        FixedStore(vec![
            Document::new("first"),
            Document::new("second"),
            Document::new("third"),
        ])
    }

    #[tokio::test]
    async fn test_as_retriever_limits_results() {
        let store = store();
        let retriever = store.as_retriever(2);

        let docs = retriever.retrieve("anything").await.unwrap();

        let contents: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_rejects_bad_parameters() {
        let store = store();

        let zero = Retriever::new(&store, 0).retrieve("query").await;
        assert!(matches!(zero, Err(SearchError::InvalidParameters(_))));

        let empty = store.as_retriever(3).retrieve("   ").await;
        assert!(matches!(empty, Err(SearchError::Query(_))));
    }
}
