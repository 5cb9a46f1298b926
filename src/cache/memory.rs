//! In-process request cache.

use super::{cutoff_for, validate_partition, CacheEntry, CacheListing, CacheStats, RequestCache};
use crate::errors::{CacheError, CacheWriteError};
use crate::signature::RequestSignature;
use chrono::Duration;
use parking_lot::RwLock;
use std::collections::HashMap;

type Partition = HashMap<RequestSignature, CacheEntry>;

/// Cache that lives only as long as the process. Used by tests and by runs
/// that opt out of the on-disk cache but still want intra-run reuse.
#[derive(Debug, Default)]
pub struct MemoryRequestCache {
    partitions: RwLock<HashMap<String, Partition>>,
}

impl MemoryRequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total entries across every partition.
    pub fn len(&self) -> usize {
        self.partitions.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequestCache for MemoryRequestCache {
    fn get(
        &self,
        partition: &str,
        signature: &RequestSignature,
    ) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self
            .partitions
            .read()
            .get(partition)
            .and_then(|entries| entries.get(signature))
            .cloned())
    }

    fn put(&self, partition: &str, entry: CacheEntry) -> Result<CacheEntry, CacheWriteError> {
        validate_partition(partition).map_err(|message| CacheWriteError {
            partition: partition.to_string(),
            signature: entry.signature.clone(),
            message,
        })?;
        self.partitions
            .write()
            .entry(partition.to_string())
            .or_default()
            .insert(entry.signature.clone(), entry.clone());
        Ok(entry)
    }

    fn stats(&self, partition: &str) -> Result<CacheStats, CacheError> {
        let guard = self.partitions.read();
        let Some(entries) = guard.get(partition) else {
            return Ok(CacheStats::empty(partition));
        };
        Ok(CacheStats {
            partition: partition.to_string(),
            entries: entries.len(),
            oldest: entries.values().map(|e| e.fetched_at).min(),
            newest: entries.values().map(|e| e.fetched_at).max(),
            size_bytes: entries.values().map(|e| e.body.len() as u64).sum(),
        })
    }

    fn list(&self, partition: &str) -> Result<Vec<CacheListing>, CacheError> {
        let guard = self.partitions.read();
        let mut listing: Vec<CacheListing> = guard
            .get(partition)
            .map(|entries| {
                entries
                    .values()
                    .map(|entry| CacheListing {
                        url: entry.signature.to_string(),
                        fetched_at: entry.fetched_at,
                        status: entry.status,
                        body_bytes: entry.body.len(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        listing.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at).then(a.url.cmp(&b.url)));
        Ok(listing)
    }

    fn clear(&self, partition: &str, older_than: Option<Duration>) -> Result<usize, CacheError> {
        let mut guard = self.partitions.write();
        let Some(entries) = guard.get_mut(partition) else {
            return Ok(0);
        };
        let before = entries.len();
        match older_than {
            Some(age) => {
                if let Some(cutoff) = cutoff_for(age) {
                    entries.retain(|_, entry| entry.fetched_at >= cutoff);
                }
            }
            None => entries.clear(),
        }
        Ok(before - entries.len())
    }

    fn partitions(&self) -> Result<Vec<String>, CacheError> {
        let mut names: Vec<String> = self.partitions.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
