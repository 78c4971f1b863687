//! The indexing engine: keeps a vector store in sync with a document source

use crate::document::Document;
use crate::index::{ListKeysOptions, RecordStore, UpdateOptions, VectorStore};
use crate::indexing::config::{CleanupMode, IndexingConfig};
use crate::indexing::error::IndexError;
use crate::indexing::hashing::{HashedDocument, SourceIdAssigner, dedupe_in_order};
use crate::indexing::source::DocumentSource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Number of characters of a document quoted in error messages
const CONTENT_PREFIX_CHARS: usize = 100;

/// Outcome of an indexing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingStats {
    /// Documents written to the vector store
    pub num_added: usize,
    /// Documents already indexed and only touched
    pub num_skipped: usize,
    /// Stale documents removed from both stores
    pub num_deleted: usize,
}

/// Runs indexing against a record store and a vector store.
///
/// Batches are processed strictly one after another; a batch's writes are
/// complete before its cleanup queries run. Any error aborts the run without
/// rolling back earlier batches, which is safe because runs are idempotent.
pub struct Indexer<'a, R: ?Sized, V: ?Sized> {
    records: &'a R,
    vectors: &'a V,
    config: IndexingConfig,
    source_ids: SourceIdAssigner,
}

impl<'a, R, V> Indexer<'a, R, V>
where
    R: RecordStore + ?Sized,
    V: VectorStore + ?Sized,
{
    /// Create an indexer, rejecting invalid configuration before any I/O
    pub fn new(records: &'a R, vectors: &'a V, config: IndexingConfig) -> Result<Self, IndexError> {
        config.validate()?;
        let source_ids = SourceIdAssigner::from_key(config.source_id_key.as_deref());
        Ok(Self {
            records,
            vectors,
            config,
            source_ids,
        })
    }

    /// Replace the metadata-key strategy with a custom one
    pub fn with_source_id_assigner(mut self, source_ids: SourceIdAssigner) -> Self {
        self.source_ids = source_ids;
        self
    }

    /// The configuration of this indexer
    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    /// Index every document of `source`
    #[instrument(skip_all, fields(cleanup = %self.config.cleanup))]
    pub async fn run(&self, source: impl Into<DocumentSource>) -> Result<IndexingStats, IndexError> {
        let documents = source
            .into()
            .resolve()
            .await
            .map_err(|e| IndexError::SourceLoad(e.to_string()))?;

        // Every document needs a group before anything is written
        if self.config.cleanup == CleanupMode::Incremental {
            if let Some(doc) = documents
                .iter()
                .find(|doc| self.source_ids.assign(doc).is_none())
            {
                return Err(IndexError::MissingSourceId {
                    content_prefix: doc.content_prefix(CONTENT_PREFIX_CHARS),
                });
            }
        }

        let index_start = self.records.get_time().await?;
        info!(
            "Indexing {} documents in batches of {}",
            documents.len(),
            self.config.batch_size
        );

        let mut stats = IndexingStats::default();
        let mut documents = documents.into_iter();
        loop {
            let batch: Vec<Document> = documents.by_ref().take(self.config.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            self.index_batch(batch, index_start, &mut stats).await?;
        }

        if self.config.cleanup == CleanupMode::Full {
            stats.num_deleted += self.full_cleanup(index_start).await?;
        }

        info!(
            added = stats.num_added,
            skipped = stats.num_skipped,
            deleted = stats.num_deleted,
            "Indexing finished"
        );
        Ok(stats)
    }

    async fn index_batch(
        &self,
        batch: Vec<Document>,
        index_start: f64,
        stats: &mut IndexingStats,
    ) -> Result<(), IndexError> {
        let hashed = dedupe_in_order(batch.into_iter().map(HashedDocument::from_document).collect());
        let source_ids: Vec<Option<String>> = hashed
            .iter()
            .map(|doc| self.source_ids.assign(&doc.document))
            .collect();

        let uids: Vec<String> = hashed.iter().map(|doc| doc.uid.clone()).collect();
        let exists = self.records.exists(&uids).await?;
        if exists.len() != uids.len() {
            return Err(IndexError::Contract(format!(
                "exists returned {} results for {} keys",
                exists.len(),
                uids.len()
            )));
        }

        let mut ids_to_index = Vec::new();
        let mut docs_to_index = Vec::new();
        let mut num_skipped = 0;
        for (doc, exists) in hashed.into_iter().zip(exists) {
            if exists && !self.config.force_update {
                num_skipped += 1;
                continue;
            }
            ids_to_index.push(doc.uid);
            docs_to_index.push(doc.document);
        }

        if !docs_to_index.is_empty() {
            info!("Indexing {} docs", docs_to_index.len());
            self.vectors.add_documents(&docs_to_index, &ids_to_index).await?;
        }

        self.records
            .update(
                &uids,
                UpdateOptions {
                    group_ids: Some(&source_ids),
                    time_at_least: Some(index_start),
                },
            )
            .await?;

        stats.num_added += docs_to_index.len();
        stats.num_skipped += num_skipped;
        debug!(
            added = docs_to_index.len(),
            skipped = num_skipped,
            "Batch written"
        );

        if self.config.cleanup == CleanupMode::Incremental {
            let mut seen = HashSet::new();
            let groups: Vec<String> = source_ids
                .into_iter()
                .flatten()
                .filter(|id| seen.insert(id.clone()))
                .collect();

            let stale = self
                .records
                .list_keys(ListKeysOptions {
                    group_ids: Some(&groups),
                    before: Some(index_start),
                    ..Default::default()
                })
                .await?;
            if !stale.is_empty() {
                self.delete_everywhere(&stale).await?;
                stats.num_deleted += stale.len();
            }
        }

        Ok(())
    }

    async fn full_cleanup(&self, index_start: f64) -> Result<usize, IndexError> {
        let mut deleted = 0;
        loop {
            let stale = self
                .records
                .list_keys(ListKeysOptions {
                    before: Some(index_start),
                    limit: Some(self.config.cleanup_batch_size),
                    ..Default::default()
                })
                .await?;
            if stale.is_empty() {
                break;
            }
            self.delete_everywhere(&stale).await?;
            deleted += stale.len();
        }
        Ok(deleted)
    }

    async fn delete_everywhere(&self, uids: &[String]) -> Result<(), IndexError> {
        debug!("Deleting {} stale documents", uids.len());
        self.vectors.delete(uids).await?;
        self.records.delete_keys(uids).await?;
        Ok(())
    }
}

/// Index `source` into the given stores
///
/// # Arguments
///
/// * `source` - Documents, or a loader producing them
/// * `records` - The record store tracking indexed uids
/// * `vectors` - The vector store receiving documents
/// * `config` - Cleanup policy and batching options
///
/// # Returns
///
/// Counts of added, skipped and deleted documents
pub async fn index_documents<R, V>(
    source: impl Into<DocumentSource>,
    records: &R,
    vectors: &V,
    config: IndexingConfig,
) -> Result<IndexingStats, IndexError>
where
    R: RecordStore + ?Sized,
    V: VectorStore + ?Sized,
{
    Indexer::new(records, vectors, config)?.run(source).await
}
