//! Vector store: documents with embeddings, addressable by explicit id

use crate::document::{Document, Metadata};
use crate::index::database::Database;
use crate::index::error::DbError;
use crate::index::record_manager::placeholders;
use crate::index::schema;
use crate::model::EmbeddingConversion;
use crate::search::Retriever;
use async_trait::async_trait;
use libsql::Value;
use rig::embeddings::EmbeddingModel;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Maximum number of bound ids per `DELETE`
const MAX_IDS_PER_STATEMENT: usize = 500;

/// A document returned by a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// Id the document was stored under
    pub id: String,
    /// The stored document
    pub document: Document,
    /// Cosine similarity to the query, higher is closer
    pub score: f64,
}

/// Persisted embedding index
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and store documents under the given ids, replacing existing ones
    async fn add_documents(&self, documents: &[Document], ids: &[String]) -> Result<(), DbError>;

    /// Delete documents by id; unknown ids are ignored
    async fn delete(&self, ids: &[String]) -> Result<(), DbError>;

    /// The `k` documents closest to `query`, closest first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>, DbError>;

    /// A retriever returning the top `k` documents of this store
    fn as_retriever(&self, k: usize) -> Retriever<'_, Self>
    where
        Self: Sized,
    {
        Retriever::new(self, k)
    }
}

/// libSQL vector store scoped to one namespace, embedding with a `rig` model
#[derive(Clone)]
pub struct LibSqlVectorStore<E: EmbeddingModel> {
    db: Database,
    namespace: String,
    model: E,
}

impl<E: EmbeddingModel> LibSqlVectorStore<E> {
    /// Create the store, creating its table for the model's dimension if needed
    pub async fn new(db: Database, namespace: impl Into<String>, model: E) -> Result<Self, DbError> {
        schema::initialize_vector_schema(db.connection(), model.ndims()).await?;
        Ok(Self {
            db,
            namespace: namespace.into(),
            model,
        })
    }

    /// The namespace of this store
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The embedding model
    pub fn model(&self) -> &E {
        &self.model
    }

    /// Number of documents in this namespace
    pub async fn count(&self) -> Result<usize, DbError> {
        let count = self
            .db
            .query_f64(
                "SELECT CAST(COUNT(*) AS REAL) FROM documents WHERE namespace = ?",
                vec![Value::from(self.namespace.clone())],
            )
            .await?;
        Ok(count as usize)
    }

    /// Fetch a stored document by id
    pub async fn get(&self, id: &str) -> Result<Option<Document>, DbError> {
        let mut rows = self
            .db
            .execute_query(
                "SELECT content, metadata FROM documents WHERE namespace = ? AND id = ?",
                vec![Value::from(self.namespace.clone()), Value::from(id.to_string())],
            )
            .await?;

        match rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read document: {}", e)))?
        {
            Some(row) => {
                let content: String = row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get content: {}", e)))?;
                let metadata: String = row
                    .get(1)
                    .map_err(|e| DbError::Data(format!("Failed to get metadata: {}", e)))?;
                Ok(Some(Document {
                    content,
                    metadata: parse_metadata(&metadata)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<u8>>, DbError> {
        let expected = texts.len();
        let embeddings = self
            .model
            .embed_texts(texts)
            .await
            .map_err(|e| DbError::Embedding(e.to_string()))?;

        if embeddings.len() != expected {
            return Err(DbError::Embedding(format!(
                "Model returned {} embeddings for {} texts",
                embeddings.len(),
                expected
            )));
        }

        let ndims = self.model.ndims();
        embeddings
            .iter()
            .map(|embedding| {
                if embedding.vec.len() == ndims {
                    Ok(embedding.to_binary())
                } else {
                    Err(DbError::Embedding(format!(
                        "Expected {} dimensions, got {}",
                        ndims,
                        embedding.vec.len()
                    )))
                }
            })
            .collect()
    }
}

fn parse_metadata(raw: &str) -> Result<Metadata, DbError> {
    serde_json::from_str(raw).map_err(|e| DbError::Data(format!("Invalid metadata JSON: {}", e)))
}

#[async_trait]
impl<E: EmbeddingModel> VectorStore for LibSqlVectorStore<E> {
    #[instrument(skip_all, fields(namespace = %self.namespace, documents = documents.len()))]
    async fn add_documents(&self, documents: &[Document], ids: &[String]) -> Result<(), DbError> {
        if documents.len() != ids.len() {
            return Err(DbError::Data(format!(
                "Number of ids ({}) does not match number of documents ({})",
                ids.len(),
                documents.len()
            )));
        }

        let batch_size = E::MAX_DOCUMENTS.max(1);
        for (docs, ids) in documents.chunks(batch_size).zip(ids.chunks(batch_size)) {
            let blobs = self
                .embed(docs.iter().map(|doc| doc.content.clone()).collect())
                .await?;

            let tx = self
                .db
                .connection()
                .transaction()
                .await
                .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

            for ((doc, id), blob) in docs.iter().zip(ids).zip(blobs) {
                let metadata = serde_json::to_string(&doc.metadata)
                    .map_err(|e| DbError::Data(format!("Failed to serialize metadata: {}", e)))?;
                tx.execute(
                    "INSERT INTO documents (id, namespace, content, metadata, embedding)
                     VALUES (?, ?, ?, ?, ?)
                     ON CONFLICT(id, namespace) DO UPDATE SET
                     content = excluded.content,
                     metadata = excluded.metadata,
                     embedding = excluded.embedding",
                    vec![
                        Value::from(id.clone()),
                        Value::from(self.namespace.clone()),
                        Value::from(doc.content.clone()),
                        Value::from(metadata),
                        Value::Blob(blob),
                    ],
                )
                .await
                .map_err(|e| DbError::Query(format!("Failed to add document: {}", e)))?;
            }

            tx.commit()
                .await
                .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;
            debug!("Stored {} documents", docs.len());
        }

        Ok(())
    }

    #[instrument(skip_all, fields(namespace = %self.namespace, ids = ids.len()))]
    async fn delete(&self, ids: &[String]) -> Result<(), DbError> {
        for chunk in ids.chunks(MAX_IDS_PER_STATEMENT) {
            let sql = format!(
                "DELETE FROM documents WHERE namespace = ? AND id IN ({})",
                placeholders(chunk.len())
            );
            let mut params = vec![Value::from(self.namespace.clone())];
            params.extend(chunk.iter().map(|id| Value::from(id.clone())));

            self.db
                .connection()
                .execute(&sql, params)
                .await
                .map_err(|e| DbError::Query(format!("Failed to delete documents: {}", e)))?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>, DbError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_blob = self
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::Embedding("No embedding returned for query".to_string()))?;

        let mut rows = self
            .db
            .execute_query(
                "SELECT id, content, metadata, vector_distance_cos(embedding, ?) AS distance
                 FROM documents
                 WHERE namespace = ?
                 ORDER BY distance ASC
                 LIMIT ?",
                vec![
                    Value::Blob(query_blob),
                    Value::from(self.namespace.clone()),
                    Value::Integer(k as i64),
                ],
            )
            .await?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read search result: {}", e)))?
        {
            let id: String = row
                .get(0)
                .map_err(|e| DbError::Data(format!("Failed to get id: {}", e)))?;
            let content: String = row
                .get(1)
                .map_err(|e| DbError::Data(format!("Failed to get content: {}", e)))?;
            let metadata: String = row
                .get(2)
                .map_err(|e| DbError::Data(format!("Failed to get metadata: {}", e)))?;
            let distance: f64 = row
                .get(3)
                .map_err(|e| DbError::Data(format!("Failed to get distance: {}", e)))?;

            results.push(ScoredDocument {
                id,
                document: Document {
                    content,
                    metadata: parse_metadata(&metadata)?,
                },
                score: 1.0 - distance,
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HashingEmbeddingModel;
    use tempfile::tempdir;

    async fn store(path: &std::path::Path) -> LibSqlVectorStore<HashingEmbeddingModel> {
        let db = Database::new_from_path(path.join("vectors.db").to_str().unwrap())
            .await
            .unwrap();
        LibSqlVectorStore::new(db, "local/test", HashingEmbeddingModel::new(64))
            .await
            .unwrap()
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn test_add_get_and_replace() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;

        let doc = Document::new("first version").with_metadata("source", "https://site/a");
        store.add_documents(&[doc.clone()], &ids(&["a"])).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(doc));

        let replaced = Document::new("second version").with_metadata("source", "https://site/a");
        store
            .add_documents(&[replaced.clone()], &ids(&["a"]))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get("a").await.unwrap(), Some(replaced));
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;
        let docs = vec![Document::new("one"), Document::new("two")];
        store.add_documents(&docs, &ids(&["1", "2"])).await.unwrap();

        store.delete(&ids(&["1", "missing"])).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.get("1").await.unwrap().is_none());
        assert!(store.get("2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_mismatched_ids_are_rejected() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;
        let result = store
            .add_documents(&[Document::new("one")], &ids(&["1", "2"]))
            .await;
        assert!(matches!(result, Err(DbError::Data(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_similarity_search() {
        let dir = tempdir().unwrap();
        let store = store(dir.path()).await;
        let docs = vec![
            Document::new("rust crawler with bounded concurrency"),
            Document::new("sourdough bread needs a long proof"),
            Document::new("incremental indexing deletes stale records"),
        ];
        store
            .add_documents(&docs, &ids(&["crawler", "bread", "indexing"]))
            .await
            .unwrap();

        let results = store
            .similarity_search("bounded concurrency crawler", 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "crawler");
        assert!(results[0].score > results[1].score);
        assert!(store.similarity_search("anything", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let dir = tempdir().unwrap();
        let db = Database::new_from_path(dir.path().join("shared.db").to_str().unwrap())
            .await
            .unwrap();
        let docs = LibSqlVectorStore::new(db.clone(), "docs", HashingEmbeddingModel::new(32))
            .await
            .unwrap();
        let blog = LibSqlVectorStore::new(db, "blog", HashingEmbeddingModel::new(32))
            .await
            .unwrap();

        docs.add_documents(&[Document::new("hello")], &ids(&["x"]))
            .await
            .unwrap();

        assert_eq!(blog.count().await.unwrap(), 0);
        assert!(blog.similarity_search("hello", 5).await.unwrap().is_empty());
    }
}
