//! Cache and store doubles that fail on demand.

use crate::cache::{CacheEntry, CacheListing, CacheStats, MemoryRequestCache, RequestCache};
use crate::errors::{CacheError, CacheWriteError, StorageError, StorageWriteError};
use crate::signature::RequestSignature;
use crate::storage::{MemoryRecordStore, NaturalKey, RecordFilter, RecordStore, StoredRecord};
use chrono::Duration;
use serde_json::{Map, Value};

/// Reads like an empty cache, rejects every write.
#[derive(Debug, Default)]
pub struct FailingRequestCache {
    inner: MemoryRequestCache,
}

impl FailingRequestCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestCache for FailingRequestCache {
    fn get(
        &self,
        partition: &str,
        signature: &RequestSignature,
    ) -> Result<Option<CacheEntry>, CacheError> {
        self.inner.get(partition, signature)
    }

    fn put(&self, partition: &str, entry: CacheEntry) -> Result<CacheEntry, CacheWriteError> {
        Err(CacheWriteError {
            partition: partition.to_string(),
            signature: entry.signature,
            message: "disk full".to_string(),
        })
    }

    fn stats(&self, partition: &str) -> Result<CacheStats, CacheError> {
        self.inner.stats(partition)
    }

    fn list(&self, partition: &str) -> Result<Vec<CacheListing>, CacheError> {
        self.inner.list(partition)
    }

    fn clear(&self, partition: &str, older_than: Option<Duration>) -> Result<usize, CacheError> {
        self.inner.clear(partition, older_than)
    }

    fn partitions(&self) -> Result<Vec<String>, CacheError> {
        self.inner.partitions()
    }
}

/// In-memory store that rejects upserts whose canonical key contains one of
/// the configured fragments, and optionally fails every query of one table.
#[derive(Debug, Default)]
pub struct FailingRecordStore {
    inner: MemoryRecordStore,
    reject_keys: Vec<String>,
    broken_table: Option<String>,
}

impl FailingRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, key_fragment: &str) -> Self {
        self.reject_keys.push(key_fragment.to_string());
        self
    }

    pub fn with_broken_table(mut self, table: &str) -> Self {
        self.broken_table = Some(table.to_string());
        self
    }

    pub fn inner(&self) -> &MemoryRecordStore {
        &self.inner
    }
}

impl RecordStore for FailingRecordStore {
    fn upsert(
        &self,
        table: &str,
        key: &NaturalKey,
        fields: &Map<String, Value>,
    ) -> Result<(), StorageWriteError> {
        let canonical = key.canonical();
        if self.reject_keys.iter().any(|k| canonical.contains(k.as_str())) {
            return Err(StorageWriteError {
                table: table.to_string(),
                key: canonical,
                message: "constraint violation".to_string(),
            });
        }
        self.inner.upsert(table, key, fields)
    }

    fn query(&self, table: &str, filter: &RecordFilter) -> Result<Vec<StoredRecord>, StorageError> {
        if self.broken_table.as_deref() == Some(table) {
            return Err(StorageError {
                table: table.to_string(),
                message: "database is locked".to_string(),
            });
        }
        self.inner.query(table, filter)
    }
}
