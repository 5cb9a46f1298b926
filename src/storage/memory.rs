//! In-process record store.

use super::{NaturalKey, RecordFilter, RecordStore, StoredRecord};
use crate::errors::{StorageError, StorageWriteError};
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Table {
    rows: Vec<StoredRecord>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, table: &str) -> usize {
        self.tables
            .read()
            .get(table)
            .map_or(0, |t| t.rows.len())
    }
}

impl RecordStore for MemoryRecordStore {
    fn upsert(
        &self,
        table: &str,
        key: &NaturalKey,
        fields: &Map<String, Value>,
    ) -> Result<(), StorageWriteError> {
        let key = key.canonical();
        let record = StoredRecord {
            key: key.clone(),
            fields: fields.clone(),
            updated_at: Utc::now(),
        };

        let mut tables = self.tables.write();
        let data = tables.entry(table.to_string()).or_default();
        match data.index.get(&key) {
            Some(&position) => data.rows[position] = record,
            None => {
                data.index.insert(key, data.rows.len());
                data.rows.push(record);
            }
        }
        Ok(())
    }

    fn query(&self, table: &str, filter: &RecordFilter) -> Result<Vec<StoredRecord>, StorageError> {
        Ok(self
            .tables
            .read()
            .get(table)
            .map(|data| {
                data.rows
                    .iter()
                    .filter(|row| filter.matches(&row.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
