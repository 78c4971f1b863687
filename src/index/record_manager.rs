//! Record store: which uids were indexed, under which group, and when they
//! were last seen

use crate::index::database::Database;
use crate::index::error::DbError;
use async_trait::async_trait;
use libsql::{Value, params};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Maximum number of bound keys per `IN (...)` clause
const MAX_KEYS_PER_STATEMENT: usize = 500;

/// Options for [`RecordStore::update`]
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions<'a> {
    /// Group of each key, positionally; `None` keeps the stored group
    pub group_ids: Option<&'a [Option<String>]>,
    /// Lower bound for the written timestamp
    pub time_at_least: Option<f64>,
}

/// Options for [`RecordStore::list_keys`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ListKeysOptions<'a> {
    /// Only records in one of these groups
    pub group_ids: Option<&'a [String]>,
    /// Only records last seen strictly before this time
    pub before: Option<f64>,
    /// Only records last seen strictly after this time
    pub after: Option<f64>,
    /// Return at most this many keys
    pub limit: Option<usize>,
}

/// A persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The document uid
    pub key: String,
    /// The source group of the document
    pub group_id: Option<String>,
    /// When the record was last touched, in fractional Unix seconds
    pub updated_at: f64,
}

/// Persisted tracker of indexed uids.
///
/// Timestamps come from the store's own clock so that every process touching
/// the same store agrees on ordering.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current time according to the store, in fractional Unix seconds.
    ///
    /// Always strictly later than every time already recorded, so records
    /// touched after a call never compare as older than records written
    /// before it.
    async fn get_time(&self) -> Result<f64, DbError>;

    /// Whether each key is recorded, positionally
    async fn exists(&self, keys: &[String]) -> Result<Vec<bool>, DbError>;

    /// Insert or touch keys. The written time is the store clock, raised to
    /// `time_at_least` when given.
    async fn update(&self, keys: &[String], options: UpdateOptions<'_>) -> Result<(), DbError>;

    /// List keys matching every given filter, oldest first
    async fn list_keys(&self, options: ListKeysOptions<'_>) -> Result<Vec<String>, DbError>;

    /// Delete keys; unknown keys are ignored
    async fn delete_keys(&self, keys: &[String]) -> Result<(), DbError>;
}

/// libSQL-backed record store scoped to one namespace
#[derive(Clone)]
pub struct RecordManager {
    db: Database,
    namespace: String,
}

impl RecordManager {
    /// Create a record manager for `namespace`, e.g. `local/docs`
    pub fn new(db: Database, namespace: impl Into<String>) -> Self {
        Self {
            db,
            namespace: namespace.into(),
        }
    }

    /// The namespace of this record manager
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// List full records matching the filters, oldest first
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn list_records(&self, options: ListKeysOptions<'_>) -> Result<Vec<Record>, DbError> {
        if options.group_ids.is_some_and(<[String]>::is_empty) {
            return Ok(Vec::new());
        }

        let mut sql =
            String::from("SELECT key, group_id, updated_at FROM upsertion_records WHERE namespace = ?");
        let mut params = vec![Value::from(self.namespace.clone())];

        if let Some(before) = options.before {
            sql.push_str(" AND updated_at < ?");
            params.push(Value::Real(before));
        }
        if let Some(after) = options.after {
            sql.push_str(" AND updated_at > ?");
            params.push(Value::Real(after));
        }
        if let Some(group_ids) = options.group_ids {
            sql.push_str(&format!(" AND group_id IN ({})", placeholders(group_ids.len())));
            params.extend(group_ids.iter().map(|id| Value::from(id.clone())));
        }
        sql.push_str(" ORDER BY updated_at, key");
        if let Some(limit) = options.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(limit as i64));
        }

        let mut rows = self.db.execute_query(&sql, params).await?;
        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read record: {}", e)))?
        {
            records.push(Record {
                key: row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get key: {}", e)))?,
                group_id: row
                    .get(1)
                    .map_err(|e| DbError::Data(format!("Failed to get group_id: {}", e)))?,
                updated_at: row
                    .get(2)
                    .map_err(|e| DbError::Data(format!("Failed to get updated_at: {}", e)))?,
            });
        }

        Ok(records)
    }

    /// Raw database clock, which only has millisecond resolution
    async fn db_now(&self) -> Result<f64, DbError> {
        self.db
            .query_f64("SELECT (julianday('now') - 2440587.5) * 86400.0", params![])
            .await
    }

    /// Number of records in this namespace
    pub async fn count(&self) -> Result<usize, DbError> {
        let count = self
            .db
            .query_f64(
                "SELECT CAST(COUNT(*) AS REAL) FROM upsertion_records WHERE namespace = ?",
                vec![Value::from(self.namespace.clone())],
            )
            .await?;
        Ok(count as usize)
    }
}

#[async_trait]
impl RecordStore for RecordManager {
    async fn get_time(&self) -> Result<f64, DbError> {
        // julianday('now') is millisecond-grained, so two runs inside the same
        // millisecond would otherwise share a timestamp
        self.db
            .query_f64(
                "SELECT MAX(
                    (julianday('now') - 2440587.5) * 86400.0,
                    COALESCE(
                        (SELECT MAX(updated_at) FROM upsertion_records WHERE namespace = ?) + 0.001,
                        0.0
                    )
                 )",
                vec![Value::from(self.namespace.clone())],
            )
            .await
    }

    #[instrument(skip_all, fields(namespace = %self.namespace, keys = keys.len()))]
    async fn exists(&self, keys: &[String]) -> Result<Vec<bool>, DbError> {
        let mut found = HashSet::new();
        for chunk in keys.chunks(MAX_KEYS_PER_STATEMENT) {
            let sql = format!(
                "SELECT key FROM upsertion_records WHERE namespace = ? AND key IN ({})",
                placeholders(chunk.len())
            );
            let mut params = vec![Value::from(self.namespace.clone())];
            params.extend(chunk.iter().map(|key| Value::from(key.clone())));

            let mut rows = self.db.execute_query(&sql, params).await?;
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| DbError::Data(format!("Failed to read key: {}", e)))?
            {
                let key: String = row
                    .get(0)
                    .map_err(|e| DbError::Data(format!("Failed to get key: {}", e)))?;
                found.insert(key);
            }
        }

        Ok(keys.iter().map(|key| found.contains(key)).collect())
    }

    #[instrument(skip_all, fields(namespace = %self.namespace, keys = keys.len()))]
    async fn update(&self, keys: &[String], options: UpdateOptions<'_>) -> Result<(), DbError> {
        if let Some(group_ids) = options.group_ids {
            if group_ids.len() != keys.len() {
                return Err(DbError::Data(format!(
                    "Number of group ids ({}) does not match number of keys ({})",
                    group_ids.len(),
                    keys.len()
                )));
            }
        }
        if keys.is_empty() {
            return Ok(());
        }

        let now = self.db_now().await?;
        let updated_at = options.time_at_least.map_or(now, |floor| now.max(floor));

        let tx = self
            .db
            .connection()
            .transaction()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to start transaction: {}", e)))?;

        for (i, key) in keys.iter().enumerate() {
            let group_id = options
                .group_ids
                .and_then(|ids| ids[i].clone())
                .map_or(Value::Null, Value::from);

            tx.execute(
                "INSERT INTO upsertion_records (key, namespace, group_id, updated_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(key, namespace) DO UPDATE SET
                 group_id = COALESCE(excluded.group_id, upsertion_records.group_id),
                 updated_at = excluded.updated_at",
                vec![
                    Value::from(key.clone()),
                    Value::from(self.namespace.clone()),
                    group_id,
                    Value::Real(updated_at),
                ],
            )
            .await
            .map_err(|e| DbError::Query(format!("Failed to upsert record: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::Transaction(format!("Failed to commit transaction: {}", e)))?;

        debug!("Touched {} records at {}", keys.len(), updated_at);
        Ok(())
    }

    async fn list_keys(&self, options: ListKeysOptions<'_>) -> Result<Vec<String>, DbError> {
        let records = self.list_records(options).await?;
        Ok(records.into_iter().map(|record| record.key).collect())
    }

    #[instrument(skip_all, fields(namespace = %self.namespace, keys = keys.len()))]
    async fn delete_keys(&self, keys: &[String]) -> Result<(), DbError> {
        for chunk in keys.chunks(MAX_KEYS_PER_STATEMENT) {
            let sql = format!(
                "DELETE FROM upsertion_records WHERE namespace = ? AND key IN ({})",
                placeholders(chunk.len())
            );
            let mut params = vec![Value::from(self.namespace.clone())];
            params.extend(chunk.iter().map(|key| Value::from(key.clone())));

            self.db
                .connection()
                .execute(&sql, params)
                .await
                .map_err(|e| DbError::Query(format!("Failed to delete records: {}", e)))?;
        }
        Ok(())
    }
}

/// `?, ?, ?` with `count` placeholders
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Far enough ahead that the store clock never overtakes it during a test
    const FUTURE: f64 = 4_102_444_800.0;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    async fn manager(namespace: &str) -> RecordManager {
        RecordManager::new(Database::new_in_memory().await.unwrap(), namespace)
    }

    #[tokio::test]
    async fn test_get_time_uses_unix_seconds() {
        let records = manager("test").await;
        let store_now = records.get_time().await.unwrap();
        let wall_now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs_f64();

        assert!((store_now - wall_now).abs() < 5.0);
    }

    #[tokio::test]
    async fn test_get_time_is_after_every_recorded_time() {
        let records = manager("test").await;
        for round in 0..50 {
            let start = records.get_time().await.unwrap();
            let key = format!("key-{}", round);
            records
                .update(
                    &keys(&[key.as_str()]),
                    UpdateOptions {
                        time_at_least: Some(start),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            let written = records.list_records(ListKeysOptions::default()).await.unwrap();
            let latest = written.iter().map(|record| record.updated_at).fold(f64::MIN, f64::max);
            let next = records.get_time().await.unwrap();
            assert!(next > latest, "round {}: {} <= {}", round, next, latest);
        }
    }

    #[tokio::test]
    async fn test_get_time_is_scoped_to_namespace() {
        let db = Database::new_in_memory().await.unwrap();
        let docs = RecordManager::new(db.clone(), "local/docs");
        let blog = RecordManager::new(db, "local/blog");

        docs.update(
            &keys(&["a"]),
            UpdateOptions {
                time_at_least: Some(FUTURE),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(docs.get_time().await.unwrap() > FUTURE);
        assert!(blog.get_time().await.unwrap() < FUTURE);
    }

    #[tokio::test]
    async fn test_update_and_exists() {
        let records = manager("test").await;
        records
            .update(&keys(&["a", "b"]), UpdateOptions::default())
            .await
            .unwrap();

        let exists = records.exists(&keys(&["a", "x", "b"])).await.unwrap();
        assert_eq!(exists, vec![true, false, true]);
        assert_eq!(records.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_respects_time_floor() {
        let records = manager("test").await;
        records
            .update(
                &keys(&["a"]),
                UpdateOptions {
                    time_at_least: Some(FUTURE),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        records
            .update(&keys(&["b"]), UpdateOptions::default())
            .await
            .unwrap();

        let before = records
            .list_keys(ListKeysOptions {
                before: Some(FUTURE),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(before, keys(&["b"]));

        let after = records
            .list_keys(ListKeysOptions {
                after: Some(FUTURE - 1.0),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(after, keys(&["a"]));
    }

    #[tokio::test]
    async fn test_groups_are_kept_and_filtered() {
        let records = manager("test").await;
        let groups = vec![Some("s1".to_string()), Some("s2".to_string()), None];
        records
            .update(
                &keys(&["a", "b", "c"]),
                UpdateOptions {
                    group_ids: Some(&groups),
                    time_at_least: None,
                },
            )
            .await
            .unwrap();

        // touching without groups keeps the stored group
        records
            .update(&keys(&["a"]), UpdateOptions::default())
            .await
            .unwrap();

        let in_s1 = records
            .list_keys(ListKeysOptions {
                group_ids: Some(&keys(&["s1"])),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_s1, keys(&["a"]));

        let none = records
            .list_keys(ListKeysOptions {
                group_ids: Some(&[]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(none.is_empty());

        let all = records.list_records(ListKeysOptions::default()).await.unwrap();
        let c = all.iter().find(|record| record.key == "c").unwrap();
        assert_eq!(c.group_id, None);
    }

    #[tokio::test]
    async fn test_update_rejects_mismatched_groups() {
        let records = manager("test").await;
        let groups = vec![Some("s1".to_string())];
        let result = records
            .update(
                &keys(&["a", "b"]),
                UpdateOptions {
                    group_ids: Some(&groups),
                    time_at_least: None,
                },
            )
            .await;
        assert!(matches!(result, Err(DbError::Data(_))));
    }

    #[tokio::test]
    async fn test_list_keys_limit_and_delete() {
        let records = manager("test").await;
        let all = keys(&["a", "b", "c", "d", "e"]);
        records.update(&all, UpdateOptions::default()).await.unwrap();

        let page = records
            .list_keys(ListKeysOptions {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);

        records.delete_keys(&page).await.unwrap();
        assert_eq!(records.count().await.unwrap(), 3);
        assert_eq!(
            records.exists(&page).await.unwrap(),
            vec![false, false]
        );
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let db = Database::new_in_memory().await.unwrap();
        let docs = RecordManager::new(db.clone(), "local/docs");
        let blog = RecordManager::new(db, "local/blog");

        docs.update(&keys(&["a"]), UpdateOptions::default())
            .await
            .unwrap();

        assert_eq!(blog.exists(&keys(&["a"])).await.unwrap(), vec![false]);
        blog.delete_keys(&keys(&["a"])).await.unwrap();
        assert_eq!(docs.exists(&keys(&["a"])).await.unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn test_exists_handles_many_keys() {
        let records = manager("test").await;
        let many: Vec<String> = (0..1200).map(|i| format!("key-{}", i)).collect();
        records.update(&many[..600], UpdateOptions::default()).await.unwrap();

        let exists = records.exists(&many).await.unwrap();
        assert_eq!(exists.iter().filter(|e| **e).count(), 600);
        assert!(exists[599]);
        assert!(!exists[600]);
    }
}
