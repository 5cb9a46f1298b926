//! Durable request cache.
//!
//! Maps a [`RequestSignature`] to the raw document last fetched for it, plus
//! the metadata of that fetch. Entries are partitioned by stage so one data
//! type can be inspected or wiped without touching the others.

pub mod cache_location;
pub mod memory;
pub mod sqlite;

pub use cache_location::{CacheLocation, CacheStrategy};
pub use memory::MemoryRequestCache;
pub use sqlite::SqliteRequestCache;

use crate::errors::{CacheError, CacheWriteError};
use crate::signature::RequestSignature;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A previously fetched document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub signature: RequestSignature,
    pub body: String,
    pub fetched_at: DateTime<Utc>,
    pub status: u16,
    pub content_encoding: Option<String>,
}

impl CacheEntry {
    pub fn new(
        signature: RequestSignature,
        body: impl Into<String>,
        status: u16,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            signature,
            body: body.into(),
            fetched_at,
            status,
            content_encoding: None,
        }
    }

    pub fn with_encoding(mut self, encoding: Option<String>) -> Self {
        self.content_encoding = encoding;
        self
    }
}

/// Summary of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub partition: String,
    pub entries: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    /// Bytes on disk for persistent caches, body bytes for in-memory ones.
    pub size_bytes: u64,
}

impl CacheStats {
    pub fn empty(partition: &str) -> Self {
        Self {
            partition: partition.to_string(),
            entries: 0,
            oldest: None,
            newest: None,
            size_bytes: 0,
        }
    }
}

/// One line of a partition listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheListing {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub status: u16,
    pub body_bytes: usize,
}

/// Signature-keyed document store shared by every stage of a run.
///
/// Implementations must give read-after-write consistency within a process
/// and overwrite on repeated `put` of the same signature.
pub trait RequestCache: Send + Sync {
    fn get(
        &self,
        partition: &str,
        signature: &RequestSignature,
    ) -> Result<Option<CacheEntry>, CacheError>;

    /// Store `entry`, replacing any existing entry for its signature.
    fn put(&self, partition: &str, entry: CacheEntry) -> Result<CacheEntry, CacheWriteError>;

    /// Read faults count as absent.
    fn has(&self, partition: &str, signature: &RequestSignature) -> bool {
        matches!(self.get(partition, signature), Ok(Some(_)))
    }

    fn stats(&self, partition: &str) -> Result<CacheStats, CacheError>;

    /// Cached documents in a partition, newest first.
    fn list(&self, partition: &str) -> Result<Vec<CacheListing>, CacheError>;

    /// Remove entries from a partition, optionally only those fetched more than
    /// `older_than` ago. Returns the number removed.
    fn clear(&self, partition: &str, older_than: Option<Duration>) -> Result<usize, CacheError>;

    /// Partitions that currently hold entries (or have backing storage).
    fn partitions(&self) -> Result<Vec<String>, CacheError>;

    /// Look `signature` up in every partition except `skip`. The same page is
    /// needed by more than one stage (a season page feeds both score tables
    /// and fixtures), and a document fetched once is served to all of them.
    fn find_elsewhere(
        &self,
        skip: &str,
        signature: &RequestSignature,
    ) -> Result<Option<(String, CacheEntry)>, CacheError> {
        for partition in self.partitions()? {
            if partition == skip {
                continue;
            }
            if let Some(entry) = self.get(&partition, signature)? {
                return Ok(Some((partition, entry)));
            }
        }
        Ok(None)
    }
}

/// Cutoff for `clear(.., Some(age))`. An age reaching past the earliest
/// representable instant has no cutoff, and nothing is that old.
pub(crate) fn cutoff_for(age: Duration) -> Option<DateTime<Utc>> {
    Utc::now().checked_sub_signed(age)
}

/// Partition names become file names; keep them to a safe alphabet.
pub(crate) fn validate_partition(partition: &str) -> Result<(), String> {
    if partition.is_empty() {
        return Err("partition name is empty".to_string());
    }
    if !partition
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(format!(
            "partition name '{}' may only contain lowercase letters, digits and '_'",
            partition
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_partition() {
        assert!(validate_partition("score_table").is_ok());
        assert!(validate_partition("").is_err());
        assert!(validate_partition("../etc").is_err());
        assert!(validate_partition("Season").is_err());
    }

    #[test]
    fn test_cutoff_for_huge_age_is_none() {
        assert!(cutoff_for(Duration::days(7)).is_some());
        assert_eq!(cutoff_for(Duration::days(4_000_000_000)), None);
    }

    #[test]
    fn test_find_elsewhere_skips_own_partition() {
        let cache = MemoryRequestCache::new();
        let sig = RequestSignature::parse("https://fbref.com/en/comps/9/history/").unwrap();
        cache
            .put("score_table", CacheEntry::new(sig.clone(), "page", 200, Utc::now()))
            .unwrap();

        let (partition, entry) = cache.find_elsewhere("fixture", &sig).unwrap().unwrap();
        assert_eq!(partition, "score_table");
        assert_eq!(entry.body, "page");
        assert_eq!(cache.find_elsewhere("score_table", &sig).unwrap(), None);
    }

    #[test]
    fn test_entry_builder() {
        let sig = RequestSignature::parse("https://fbref.com/en/comps/").unwrap();
        let entry = CacheEntry::new(sig.clone(), "<html></html>", 200, Utc::now())
            .with_encoding(Some("gzip".into()));
        assert_eq!(entry.signature, sig);
        assert_eq!(entry.content_encoding.as_deref(), Some("gzip"));
    }
}
