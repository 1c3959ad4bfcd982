//! Forecast cache storage, keyed by source id.
//!
//! A record is always replaced whole: `put` never merges with what was there.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

use crate::error::StoreError;
use crate::types::CacheRecord;

/// Key/value persistence for cached forecasts.
pub trait ForecastStore: Send + Sync {
    /// Cached record for `source_id`, if any.
    fn get(&self, source_id: &str) -> Result<Option<CacheRecord>, StoreError>;

    /// Replace the record for `source_id`.
    fn put(&self, source_id: &str, record: &CacheRecord) -> Result<(), StoreError>;

    /// Delete the record for `source_id`. Returns whether one existed.
    fn remove(&self, source_id: &str) -> Result<bool, StoreError>;

    /// All source ids with a cached record, sorted.
    fn source_ids(&self) -> Result<Vec<String>, StoreError>;
}

/// SQLite-backed store; survives restarts.
pub struct SqliteForecastStore {
    conn: Mutex<Connection>,
}

impl SqliteForecastStore {
    /// Open (or create) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS forecast_cache (
                source_id TEXT PRIMARY KEY,
                record_json TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl ForecastStore for SqliteForecastStore {
    fn get(&self, source_id: &str) -> Result<Option<CacheRecord>, StoreError> {
        let json: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT record_json FROM forecast_cache WHERE source_id = ?1",
                params![source_id],
                |row| row.get(0),
            )
            .optional()?;

        json.map(|json| {
            serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
                source_id: source_id.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
    }

    fn put(&self, source_id: &str, record: &CacheRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let now = Utc::now().timestamp_millis();

        // Single statement, so readers see either the old or the new record.
        self.conn.lock().execute(
            r#"
            INSERT INTO forecast_cache (source_id, record_json, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(source_id) DO UPDATE SET
                record_json = excluded.record_json,
                updated_at = excluded.updated_at
            "#,
            params![source_id, json, now],
        )?;
        Ok(())
    }

    fn remove(&self, source_id: &str) -> Result<bool, StoreError> {
        let count = self.conn.lock().execute(
            "DELETE FROM forecast_cache WHERE source_id = ?1",
            params![source_id],
        )?;
        Ok(count > 0)
    }

    fn source_ids(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT source_id FROM forecast_cache ORDER BY source_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}

/// In-process store; contents are lost on exit.
#[derive(Default)]
pub struct MemoryForecastStore {
    records: Mutex<HashMap<String, CacheRecord>>,
}

impl MemoryForecastStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ForecastStore for MemoryForecastStore {
    fn get(&self, source_id: &str) -> Result<Option<CacheRecord>, StoreError> {
        Ok(self.records.lock().get(source_id).cloned())
    }

    fn put(&self, source_id: &str, record: &CacheRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .insert(source_id.to_string(), record.clone());
        Ok(())
    }

    fn remove(&self, source_id: &str) -> Result<bool, StoreError> {
        Ok(self.records.lock().remove(source_id).is_some())
    }

    fn source_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids: Vec<String> = self.records.lock().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
