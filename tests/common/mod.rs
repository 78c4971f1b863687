//! In-memory store doubles for driving the indexing engine

#![allow(dead_code)]

use async_trait::async_trait;
use docsync::document::Document;
use docsync::index::{
    DbError, ListKeysOptions, RecordStore, ScoredDocument, UpdateOptions, VectorStore,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A record as kept by [`InMemoryRecordStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub group_id: Option<String>,
    pub updated_at: f64,
}

/// Record store with a logical clock: every `get_time` and every `update`
/// advances time by one tick.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    clock: Mutex<f64>,
    records: Mutex<BTreeMap<String, StoredRecord>>,
    writes: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> f64 {
        let mut clock = self.clock.lock().unwrap();
        *clock += 1.0;
        *clock
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.lock().unwrap().keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<StoredRecord> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Number of `update` and `delete_keys` calls
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_time(&self) -> Result<f64, DbError> {
        Ok(self.tick())
    }

    async fn exists(&self, keys: &[String]) -> Result<Vec<bool>, DbError> {
        let records = self.records.lock().unwrap();
        Ok(keys.iter().map(|key| records.contains_key(key)).collect())
    }

    async fn update(&self, keys: &[String], options: UpdateOptions<'_>) -> Result<(), DbError> {
        if let Some(group_ids) = options.group_ids {
            if group_ids.len() != keys.len() {
                return Err(DbError::Data("group_ids and keys differ in length".to_string()));
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        let now = self.tick();
        let updated_at = options.time_at_least.map_or(now, |at_least| now.max(at_least));
        let mut records = self.records.lock().unwrap();
        for (i, key) in keys.iter().enumerate() {
            let group_id = options.group_ids.and_then(|groups| groups[i].clone());
            let record = records.entry(key.clone()).or_insert(StoredRecord {
                group_id: None,
                updated_at,
            });
            record.updated_at = updated_at;
            if group_id.is_some() {
                record.group_id = group_id;
            }
        }
        Ok(())
    }

    async fn list_keys(&self, options: ListKeysOptions<'_>) -> Result<Vec<String>, DbError> {
        let records = self.records.lock().unwrap();
        let mut matching: Vec<(&String, &StoredRecord)> = records
            .iter()
            .filter(|(_, record)| options.before.is_none_or(|before| record.updated_at < before))
            .filter(|(_, record)| options.after.is_none_or(|after| record.updated_at > after))
            .filter(|(_, record)| {
                options.group_ids.is_none_or(|groups| {
                    record
                        .group_id
                        .as_ref()
                        .is_some_and(|group| groups.contains(group))
                })
            })
            .collect();
        matching.sort_by(|a, b| a.1.updated_at.total_cmp(&b.1.updated_at).then(a.0.cmp(b.0)));

        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<(), DbError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        for key in keys {
            records.remove(key);
        }
        Ok(())
    }
}

/// Vector store keeping documents in a map, counting calls
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    documents: Mutex<HashMap<String, Document>>,
    added: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.lock().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    /// Every id passed to `add_documents`, in call order
    pub fn added_ids(&self) -> Vec<String> {
        self.added.lock().unwrap().clone()
    }

    /// Every id passed to `delete`, in call order
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn contents(&self) -> Vec<String> {
        let mut contents: Vec<String> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .map(|doc| doc.content.clone())
            .collect();
        contents.sort();
        contents
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add_documents(&self, documents: &[Document], ids: &[String]) -> Result<(), DbError> {
        if documents.len() != ids.len() {
            return Err(DbError::Data("documents and ids differ in length".to_string()));
        }
        let mut stored = self.documents.lock().unwrap();
        for (doc, id) in documents.iter().zip(ids) {
            stored.insert(id.clone(), doc.clone());
        }
        self.added.lock().unwrap().extend(ids.iter().cloned());
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), DbError> {
        let mut stored = self.documents.lock().unwrap();
        for id in ids {
            stored.remove(id);
        }
        self.deleted.lock().unwrap().extend(ids.iter().cloned());
        Ok(())
    }

    async fn similarity_search(&self, _: &str, k: usize) -> Result<Vec<ScoredDocument>, DbError> {
        let stored = self.documents.lock().unwrap();
        let mut ids: Vec<&String> = stored.keys().collect();
        ids.sort();
        Ok(ids
            .into_iter()
            .take(k)
            .map(|id| ScoredDocument {
                id: id.clone(),
                document: stored[id].clone(),
                score: 1.0,
            })
            .collect())
    }
}

/// A document whose `source` metadata is its group
pub fn doc(content: &str, source: &str) -> Document {
    Document::new(content).with_metadata("source", source)
}
