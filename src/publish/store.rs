//! Persistence of published index results

use crate::error::Result;
use crate::ranking::IndexResult;

/// Timestamped record store keyed by index name
pub trait ResultStore: Send + Sync {
    /// Persist one index result, returning the record id
    fn save(&self, index_name: &str, result: &IndexResult) -> Result<i64>;

    fn name(&self) -> &str;
}

#[cfg(feature = "rusqlite-support")]
pub use sqlite::SqliteResultStore;

#[cfg(feature = "rusqlite-support")]
mod sqlite {
    use super::ResultStore;
    use crate::error::{PotentialError, Result};
    use crate::ranking::IndexResult;
    use chrono::Utc;
    use rusqlite::{params, Connection, OptionalExtension};
    use std::path::Path;
    use std::sync::{Mutex, MutexGuard};

    /// SQLite-backed store; one row per published index with the result as
    /// JSON
    pub struct SqliteResultStore {
        conn: Mutex<Connection>,
    }

    impl SqliteResultStore {
        /// Create or open a database at `path`
        pub fn open(path: &Path) -> Result<Self> {
            let store = Self {
                conn: Mutex::new(Connection::open(path)?),
            };
            store.create_tables()?;
            Ok(store)
        }

        /// Create in-memory database (for testing)
        pub fn in_memory() -> Result<Self> {
            let store = Self {
                conn: Mutex::new(Connection::open_in_memory()?),
            };
            store.create_tables()?;
            Ok(store)
        }

        fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
            self.conn
                .lock()
                .map_err(|_| PotentialError::Publish("result store lock poisoned".to_string()))
        }

        fn create_tables(&self) -> Result<()> {
            let conn = self.lock()?;
            conn.execute(
                "CREATE TABLE IF NOT EXISTS predictions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    index_name TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    payload TEXT NOT NULL
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_predictions_index ON predictions(index_name)",
                [],
            )?;
            Ok(())
        }

        /// Most recently stored result of an index
        pub fn latest(&self, index_name: &str) -> Result<Option<IndexResult>> {
            let conn = self.lock()?;
            let payload: Option<String> = conn
                .query_row(
                    "SELECT payload FROM predictions WHERE index_name = ?1 ORDER BY id DESC LIMIT 1",
                    params![index_name],
                    |row| row.get(0),
                )
                .optional()?;

            payload
                .map(|json| serde_json::from_str(&json).map_err(PotentialError::from))
                .transpose()
        }

        /// Number of stored records of an index
        pub fn count(&self, index_name: &str) -> Result<usize> {
            let conn = self.lock()?;
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM predictions WHERE index_name = ?1",
                params![index_name],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        }
    }

    impl ResultStore for SqliteResultStore {
        fn save(&self, index_name: &str, result: &IndexResult) -> Result<i64> {
            let payload = serde_json::to_string(result)?;
            let conn = self.lock()?;
            conn.execute(
                "INSERT INTO predictions (index_name, created_at, payload) VALUES (?1, ?2, ?3)",
                params![index_name, Utc::now().to_rfc3339(), payload],
            )?;
            let id = conn.last_insert_rowid();
            log::info!("Stored {} result as record {}", index_name, id);
            Ok(id)
        }

        fn name(&self) -> &str {
            "sqlite"
        }
    }

}
