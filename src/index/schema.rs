//! # Database Schema Module
//!
//! Two tables, both partitioned by a `namespace` column so several collections
//! can share one database file:
//!
//! 1. `upsertion_records`: one row per indexed uid with its group and the time
//!    it was last seen
//! 2. `documents`: the vector store, holding content, JSON metadata and the
//!    embedding as an `F32_BLOB` of the model's dimension

use crate::index::error::DbError;
use libsql::{Connection, params};

/// Create the record store table and its indexes
pub async fn initialize_record_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS upsertion_records (
            key TEXT NOT NULL,
            namespace TEXT NOT NULL,
            group_id TEXT,
            updated_at REAL NOT NULL,
            PRIMARY KEY (key, namespace)
        )",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create upsertion_records table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_upsertion_records_updated_at
         ON upsertion_records(namespace, updated_at)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on updated_at: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_upsertion_records_group_id
         ON upsertion_records(namespace, group_id)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on group_id: {}", e)))?;

    Ok(())
}

/// Create the vector store table for embeddings of `ndims` dimensions
pub async fn initialize_vector_schema(conn: &Connection, ndims: usize) -> Result<(), DbError> {
    if ndims == 0 {
        return Err(DbError::Schema(
            "Embedding dimension must be greater than zero".to_string(),
        ));
    }

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT NOT NULL,
                namespace TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding F32_BLOB({}) NOT NULL,
                PRIMARY KEY (id, namespace)
            )",
            ndims
        ),
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create documents table: {}", e)))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_namespace ON documents(namespace)",
        params![],
    )
    .await
    .map_err(|e| DbError::Schema(format!("Failed to create index on documents: {}", e)))?;

    Ok(())
}
