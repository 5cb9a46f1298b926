//! SQLite-backed request cache, one database file per partition.

use super::{cutoff_for, validate_partition, CacheEntry, CacheListing, CacheStats, RequestCache};
use crate::errors::{CacheError, CacheWriteError};
use crate::signature::RequestSignature;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const FILE_SUFFIX: &str = "_cache.db";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS html_cache (
        signature TEXT PRIMARY KEY,
        url TEXT NOT NULL,
        body TEXT NOT NULL,
        status INTEGER NOT NULL,
        encoding TEXT,
        fetched_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_html_cache_fetched_at ON html_cache(fetched_at);";

/// Persistent cache stored as `<directory>/<partition>_cache.db`.
///
/// Connections are opened lazily and kept for the life of the cache.
pub struct SqliteRequestCache {
    directory: PathBuf,
    connections: Mutex<HashMap<String, Connection>>,
}

impl std::fmt::Debug for SqliteRequestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRequestCache")
            .field("directory", &self.directory)
            .field("open_partitions", &self.connections.lock().len())
            .finish()
    }
}

impl SqliteRequestCache {
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).with_context(|| {
            format!("Failed to create cache directory: {}", directory.display())
        })?;
        log::debug!("Request cache at {}", directory.display());
        Ok(Self {
            directory,
            connections: Mutex::new(HashMap::new()),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn partition_path(&self, partition: &str) -> PathBuf {
        self.directory.join(format!("{}{}", partition, FILE_SUFFIX))
    }

    /// Run `f` against the partition's connection. With `create == false` a
    /// partition that has no database file yields `Ok(None)` instead of
    /// creating one.
    fn with_connection<T>(
        &self,
        partition: &str,
        create: bool,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> std::result::Result<Option<T>, String> {
        validate_partition(partition)?;
        let mut connections = self.connections.lock();

        if !connections.contains_key(partition) {
            let path = self.partition_path(partition);
            if !create && !path.exists() {
                return Ok(None);
            }
            let conn = Connection::open(&path)
                .map_err(|e| format!("failed to open {}: {}", path.display(), e))?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| format!("failed to initialize {}: {}", path.display(), e))?;
            connections.insert(partition.to_string(), conn);
        }

        match connections.get(partition) {
            Some(conn) => f(conn).map(Some).map_err(|e| e.to_string()),
            None => Ok(None),
        }
    }

    fn read_error(partition: &str) -> impl Fn(String) -> CacheError + '_ {
        move |message| CacheError {
            partition: partition.to_string(),
            message,
        }
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

impl RequestCache for SqliteRequestCache {
    fn get(
        &self,
        partition: &str,
        signature: &RequestSignature,
    ) -> Result<Option<CacheEntry>, CacheError> {
        let key = signature.cache_key();
        let row = self
            .with_connection(partition, false, |conn| {
                conn.query_row(
                    "SELECT body, status, encoding, fetched_at FROM html_cache WHERE signature = ?1",
                    params![key],
                    |row| {
                        let body: String = row.get(0)?;
                        let status: u16 = row.get(1)?;
                        let encoding: Option<String> = row.get(2)?;
                        let fetched_at: String = row.get(3)?;
                        Ok((body, status, encoding, fetched_at))
                    },
                )
                .optional()
            })
            .map_err(Self::read_error(partition))?
            .flatten();

        let Some((body, status, encoding, fetched_at)) = row else {
            return Ok(None);
        };
        let fetched_at = parse_timestamp(&fetched_at).map_err(|e| CacheError {
            partition: partition.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(
            CacheEntry::new(signature.clone(), body, status, fetched_at).with_encoding(encoding),
        ))
    }

    fn put(&self, partition: &str, entry: CacheEntry) -> Result<CacheEntry, CacheWriteError> {
        let key = entry.signature.cache_key();
        let fetched_at = format_timestamp(&entry.fetched_at);
        self.with_connection(partition, true, |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO html_cache (signature, url, body, status, encoding, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key,
                    entry.signature.as_str(),
                    entry.body,
                    entry.status,
                    entry.content_encoding,
                    fetched_at
                ],
            )
        })
        .map_err(|message| CacheWriteError {
            partition: partition.to_string(),
            signature: entry.signature.clone(),
            message,
        })?;
        Ok(entry)
    }

    fn stats(&self, partition: &str) -> Result<CacheStats, CacheError> {
        let row = self
            .with_connection(partition, false, |conn| {
                conn.query_row(
                    "SELECT COUNT(*), MIN(fetched_at), MAX(fetched_at) FROM html_cache",
                    [],
                    |row| {
                        let count: i64 = row.get(0)?;
                        let oldest: Option<String> = row.get(1)?;
                        let newest: Option<String> = row.get(2)?;
                        Ok((count, oldest, newest))
                    },
                )
            })
            .map_err(Self::read_error(partition))?;

        let Some((count, oldest, newest)) = row else {
            return Ok(CacheStats::empty(partition));
        };
        let to_ts = |raw: Option<String>| raw.and_then(|s| parse_timestamp(&s).ok());
        let size_bytes = fs::metadata(self.partition_path(partition))
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(CacheStats {
            partition: partition.to_string(),
            entries: count.max(0) as usize,
            oldest: to_ts(oldest),
            newest: to_ts(newest),
            size_bytes,
        })
    }

    fn list(&self, partition: &str) -> Result<Vec<CacheListing>, CacheError> {
        let rows = self
            .with_connection(partition, false, |conn| {
                let mut stmt = conn.prepare(
                    "SELECT url, fetched_at, status, LENGTH(body) FROM html_cache
                     ORDER BY fetched_at DESC, url ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        let fetched_at: String = row.get(1)?;
                        let body_bytes: i64 = row.get(3)?;
                        Ok(CacheListing {
                            url: row.get(0)?,
                            fetched_at: parse_timestamp(&fetched_at)?,
                            status: row.get(2)?,
                            body_bytes: body_bytes.max(0) as usize,
                        })
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .map_err(Self::read_error(partition))?;
        Ok(rows.unwrap_or_default())
    }

    fn clear(&self, partition: &str, older_than: Option<Duration>) -> Result<usize, CacheError> {
        let removed = self
            .with_connection(partition, false, |conn| match older_than {
                Some(age) => match cutoff_for(age) {
                    Some(cutoff) => conn.execute(
                        "DELETE FROM html_cache WHERE fetched_at < ?1",
                        params![format_timestamp(&cutoff)],
                    ),
                    None => Ok(0),
                },
                None => conn.execute("DELETE FROM html_cache", []),
            })
            .map_err(Self::read_error(partition))?
            .unwrap_or(0);
        if removed > 0 {
            log::info!("Removed {} cached entries from '{}'", removed, partition);
        }
        Ok(removed)
    }

    fn partitions(&self) -> Result<Vec<String>, CacheError> {
        let entries = fs::read_dir(&self.directory).map_err(|e| CacheError {
            partition: "*".to_string(),
            message: format!("failed to read {}: {}", self.directory.display(), e),
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name();
                let name = file_name.to_str()?.strip_suffix(FILE_SUFFIX)?.to_string();
                validate_partition(&name).ok().map(|_| name)
            })
            .collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sig(path: &str) -> RequestSignature {
        RequestSignature::parse(&format!("https://fbref.com{}", path)).unwrap()
    }

    #[test]
    fn test_put_then_get_roundtrips_metadata() {
        let dir = TempDir::new().unwrap();
        let cache = SqliteRequestCache::open(dir.path()).unwrap();
        let fetched_at = Utc::now();
        let entry = CacheEntry::new(sig("/en/comps/"), "<html>comps</html>", 200, fetched_at)
            .with_encoding(Some("utf-8".into()));

        cache.put("competition", entry).unwrap();
        let loaded = cache.get("competition", &sig("/en/comps/")).unwrap().unwrap();

        assert_eq!(loaded.body, "<html>comps</html>");
        assert_eq!(loaded.status, 200);
        assert_eq!(loaded.content_encoding.as_deref(), Some("utf-8"));
        assert_eq!(
            loaded.fetched_at.timestamp_micros(),
            fetched_at.timestamp_micros()
        );
        assert!(dir.path().join("competition_cache.db").exists());
    }

    #[test]
    fn test_missing_partition_reads_as_empty_without_creating_file() {
        let dir = TempDir::new().unwrap();
        let cache = SqliteRequestCache::open(dir.path()).unwrap();

        assert_eq!(cache.get("match", &sig("/x")).unwrap(), None);
        assert_eq!(cache.stats("match").unwrap().entries, 0);
        assert!(cache.list("match").unwrap().is_empty());
        assert!(!dir.path().join("match_cache.db").exists());
    }

    #[test]
    fn test_put_is_idempotent_per_signature() {
        let dir = TempDir::new().unwrap();
        let cache = SqliteRequestCache::open(dir.path()).unwrap();
        for body in ["one", "two"] {
            cache
                .put("season", CacheEntry::new(sig("/s"), body, 200, Utc::now()))
                .unwrap();
        }
        assert_eq!(cache.stats("season").unwrap().entries, 1);
        assert_eq!(cache.get("season", &sig("/s")).unwrap().unwrap().body, "two");
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = SqliteRequestCache::open(dir.path()).unwrap();
            cache
                .put("fixture", CacheEntry::new(sig("/f"), "body", 200, Utc::now()))
                .unwrap();
        }
        let reopened = SqliteRequestCache::open(dir.path()).unwrap();
        assert!(reopened.has("fixture", &sig("/f")));
        assert_eq!(reopened.partitions().unwrap(), vec!["fixture".to_string()]);
    }

    #[test]
    fn test_clear_with_age_beyond_calendar_removes_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = SqliteRequestCache::open(dir.path()).unwrap();
        cache
            .put("match", CacheEntry::new(sig("/m"), "body", 200, Utc::now()))
            .unwrap();

        assert_eq!(
            cache.clear("match", Some(Duration::days(4_000_000_000))).unwrap(),
            0
        );
        assert!(cache.has("match", &sig("/m")));
    }

    #[test]
    fn test_invalid_partition_is_write_error() {
        let dir = TempDir::new().unwrap();
        let cache = SqliteRequestCache::open(dir.path()).unwrap();
        let err = cache
            .put("../escape", CacheEntry::new(sig("/f"), "body", 200, Utc::now()))
            .unwrap_err();
        assert_eq!(err.partition, "../escape");
    }
}
