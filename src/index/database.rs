//! Database connection shared by the record and vector stores

use crate::index::error::DbError;
use crate::index::schema;
use libsql::{Connection, Rows};
use tracing::instrument;

/// Handle to a libSQL database with the record schema in place
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Wrap a connection, creating the record store schema if needed
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, DbError> {
        schema::initialize_record_schema(&conn).await?;

        Ok(Self { conn })
    }

    /// Open (or create) a database file
    pub async fn new_from_path(path: &str) -> Result<Self, DbError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DbError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| DbError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// Open a private in-memory database
    pub async fn new_in_memory() -> Result<Self, DbError> {
        Self::new_from_path(":memory:").await
    }

    /// The underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute a custom query with parameters
    pub async fn execute_query<P>(&self, sql: &str, params: P) -> Result<Rows, DbError>
    where
        P: libsql::params::IntoParams,
    {
        self.conn
            .query(sql, params)
            .await
            .map_err(|e| DbError::Query(format!("Failed to execute query: {}", e)))
    }

    /// Read a single `REAL` from the first row of a query
    pub(crate) async fn query_f64<P>(&self, sql: &str, params: P) -> Result<f64, DbError>
    where
        P: libsql::params::IntoParams,
    {
        let mut rows = self.execute_query(sql, params).await?;
        let row = rows
            .next()
            .await
            .map_err(|e| DbError::Data(format!("Failed to read row: {}", e)))?
            .ok_or_else(|| DbError::Data(format!("Query returned no rows: {}", sql)))?;
        row.get::<f64>(0)
            .map_err(|e| DbError::Data(format!("Failed to read value: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::params;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_new_from_path_creates_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.db");
        let db = Database::new_from_path(path.to_str().unwrap()).await.unwrap();

        let count = db
            .query_f64(
                "SELECT CAST(COUNT(*) AS REAL) FROM sqlite_master WHERE name = ?",
                params!["upsertion_records"],
            )
            .await
            .unwrap();
        assert_eq!(count, 1.0);

        // reopening is idempotent
        Database::new_from_path(path.to_str().unwrap()).await.unwrap();
    }
}
