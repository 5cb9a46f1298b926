//! SQLite record store.
//!
//! Records of every table share one `records` table keyed by
//! `(table_name, natural_key)`, with the fields stored as a JSON object.

use super::{NaturalKey, RecordFilter, RecordStore, StoredRecord};
use crate::errors::{StorageError, StorageWriteError};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use std::path::Path;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS records (
        table_name TEXT NOT NULL,
        natural_key TEXT NOT NULL,
        fields TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (table_name, natural_key)
    );";

pub struct SqliteRecordStore {
    db: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore").finish_non_exhaustive()
    }
}

impl SqliteRecordStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let db = Connection::open(path)
            .with_context(|| format!("failed to open record store: {}", path.display()))?;
        Self::init(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("failed to open in-memory store")?)
    }

    fn init(db: Connection) -> Result<Self> {
        db.execute_batch(SCHEMA)
            .context("failed to create records table")?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// Tables with at least one record, with their record counts.
    pub fn table_counts(&self) -> Result<Vec<(String, usize)>> {
        let db = self.db.lock();
        let mut stmt = db.prepare(
            "SELECT table_name, COUNT(*) FROM records GROUP BY table_name ORDER BY table_name",
        )?;
        let counts = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get(0)?, count.max(0) as usize))
            })?
            .collect::<rusqlite::Result<Vec<(String, usize)>>>()?;
        Ok(counts)
    }
}

impl RecordStore for SqliteRecordStore {
    fn upsert(
        &self,
        table: &str,
        key: &NaturalKey,
        fields: &Map<String, Value>,
    ) -> Result<(), StorageWriteError> {
        let write_error = |message: String| StorageWriteError {
            table: table.to_string(),
            key: key.canonical(),
            message,
        };

        let json = serde_json::to_string(fields).map_err(|e| write_error(e.to_string()))?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        self.db
            .lock()
            .execute(
                "INSERT INTO records (table_name, natural_key, fields, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(table_name, natural_key)
                 DO UPDATE SET fields = excluded.fields, updated_at = excluded.updated_at",
                params![table, key.canonical(), json, now],
            )
            .map_err(|e| write_error(e.to_string()))?;
        Ok(())
    }

    fn query(&self, table: &str, filter: &RecordFilter) -> Result<Vec<StoredRecord>, StorageError> {
        let read_error = |message: String| StorageError {
            table: table.to_string(),
            message,
        };

        let rows: Vec<(String, String, String)> = {
            let db = self.db.lock();
            let mut stmt = db
                .prepare(
                    "SELECT natural_key, fields, updated_at FROM records
                     WHERE table_name = ?1 ORDER BY rowid",
                )
                .map_err(|e| read_error(e.to_string()))?;
            let rows = stmt
                .query_map(params![table], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })
                .map_err(|e| read_error(e.to_string()))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| read_error(e.to_string()))?;
            rows
        };

        let mut records = Vec::new();
        for (key, json, updated_at) in rows {
            let fields: Map<String, Value> = serde_json::from_str(&json)
                .map_err(|e| read_error(format!("record '{}' is corrupt: {}", key, e)))?;
            if !filter.matches(&fields) {
                continue;
            }
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| read_error(format!("record '{}' has bad timestamp: {}", key, e)))?;
            records.push(StoredRecord {
                key,
                fields,
                updated_at,
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_upsert_is_idempotent_per_key() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        let key = NaturalKey::new().with("competition_id", 9);

        store
            .upsert("competition", &key, &fields(json!({"competition_name": "PL"})))
            .unwrap();
        store
            .upsert("competition", &key, &fields(json!({"competition_name": "Premier League"})))
            .unwrap();

        let rows = store.query("competition", &RecordFilter::all()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields["competition_name"], json!("Premier League"));
    }

    #[test]
    fn test_query_filters_and_keeps_insertion_order() {
        let store = SqliteRecordStore::open_in_memory().unwrap();
        for (season, id) in [("2023-2024", 9), ("2022-2023", 9), ("2023-2024", 11)] {
            let key = NaturalKey::new().with("competition_id", id).with("season", season);
            store
                .upsert("season", &key, &fields(json!({"competition_id": id, "season": season})))
                .unwrap();
        }

        let rows = store
            .query("season", &RecordFilter::all().eq("competition_id", 9))
            .unwrap();
        let seasons: Vec<_> = rows.iter().filter_map(|r| r.str_field("season")).collect();
        assert_eq!(seasons, vec!["2023-2024", "2022-2023"]);
        assert_eq!(
            store.table_counts().unwrap(),
            vec![("season".to_string(), 3)]
        );
    }

    #[test]
    fn test_records_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("pitchcrawl.db");
        {
            let store = SqliteRecordStore::open(&path).unwrap();
            store
                .upsert("match", &NaturalKey::new().with("match_id", "cc5b4244"), &Map::new())
                .unwrap();
        }
        let store = SqliteRecordStore::open(&path).unwrap();
        assert_eq!(store.query("match", &RecordFilter::all()).unwrap().len(), 1);
    }
}
