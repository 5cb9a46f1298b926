use chrono::{Duration, Utc};
use pitchcrawl::cache::{CacheEntry, CacheLocation, CacheStrategy, RequestCache, SqliteRequestCache};
use pitchcrawl::cache::cache_location::CACHE_DIR_ENV;
use pitchcrawl::signature::RequestSignature;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

// Helper to manage environment variables safely in tests
struct EnvGuard {
    vars: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn new() -> Self {
        Self { vars: Vec::new() }
    }

    fn set(&mut self, key: &str, value: &str) {
        let old = std::env::var(key).ok();
        self.vars.push((key.to_string(), old));
        std::env::set_var(key, value);
    }

    fn remove(&mut self, key: &str) {
        let old = std::env::var(key).ok();
        self.vars.push((key.to_string(), old));
        std::env::remove_var(key);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, old_value) in self.vars.iter().rev() {
            match old_value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn sig(path: &str) -> RequestSignature {
    RequestSignature::parse(&format!("https://fbref.com{}", path)).unwrap()
}

fn entry(path: &str, body: &str, age_days: i64) -> CacheEntry {
    CacheEntry::new(sig(path), body, 200, Utc::now() - Duration::days(age_days))
}

#[test]
fn test_entries_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let cache = SqliteRequestCache::open(dir.path()).unwrap();
        cache
            .put("season", entry("/en/comps/9/history/Premier-League-Seasons", "<table/>", 0))
            .unwrap();
    }

    let cache = SqliteRequestCache::open(dir.path()).unwrap();
    let hit = cache
        .get("season", &sig("/en/comps/9/history/Premier-League-Seasons"))
        .unwrap()
        .expect("entry persisted");
    assert_eq!(hit.body, "<table/>");
    assert_eq!(hit.status, 200);
    assert!(cache.partition_path("season").exists());
}

#[test]
fn test_put_replaces_existing_entry() {
    let dir = TempDir::new().unwrap();
    let cache = SqliteRequestCache::open(dir.path()).unwrap();
    let path = "/en/comps/9/2024-2025/2024-2025-Premier-League-Stats";

    cache.put("score_table", entry(path, "old", 3)).unwrap();
    cache.put("score_table", entry(path, "new", 0)).unwrap();

    assert_eq!(cache.get("score_table", &sig(path)).unwrap().unwrap().body, "new");
    assert_eq!(cache.stats("score_table").unwrap().entries, 1);
}

#[test]
fn test_stats_list_and_clear() {
    let dir = TempDir::new().unwrap();
    let cache = SqliteRequestCache::open(dir.path()).unwrap();
    cache.put("match", entry("/en/matches/a1/Liverpool-Arsenal", "a", 10)).unwrap();
    cache.put("match", entry("/en/matches/b2/Chelsea-Liverpool", "bb", 1)).unwrap();
    cache.put("fixture", entry("/en/comps/9/schedule/x", "c", 1)).unwrap();

    let stats = cache.stats("match").unwrap();
    assert_eq!(stats.entries, 2);
    assert!(stats.oldest.unwrap() < stats.newest.unwrap());

    let listing = cache.list("match").unwrap();
    assert_eq!(listing.len(), 2);
    assert!(listing[0].url.contains("Chelsea-Liverpool"), "newest first");

    let removed = cache.clear("match", Some(Duration::days(5))).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(cache.stats("match").unwrap().entries, 1);
    assert_eq!(cache.stats("fixture").unwrap().entries, 1);

    assert_eq!(
        cache.partitions().unwrap(),
        vec!["fixture".to_string(), "match".to_string()]
    );
}

#[test]
fn test_unknown_partition_reads_as_empty() {
    let dir = TempDir::new().unwrap();
    let cache = SqliteRequestCache::open(dir.path()).unwrap();

    assert!(cache.get("season", &sig("/en/comps/")).unwrap().is_none());
    assert_eq!(cache.stats("season").unwrap().entries, 0);
    assert!(!cache.partition_path("season").exists());
}

#[test]
fn test_invalid_partition_name_is_rejected() {
    let dir = TempDir::new().unwrap();
    let cache = SqliteRequestCache::open(dir.path()).unwrap();
    assert!(cache.put("../escape", entry("/en/comps/", "x", 0)).is_err());
}

#[test]
fn test_cache_location_precedence() {
    let mut env = EnvGuard::new();
    let from_env = TempDir::new().unwrap();
    let from_config = PathBuf::from("/config/cache");
    let from_flag = PathBuf::from("/flag/cache");

    env.set(CACHE_DIR_ENV, from_env.path().to_str().unwrap());
    assert_eq!(
        CacheLocation::resolve(Some(&from_flag), Some(&from_config)).strategy,
        CacheStrategy::Custom(from_flag.clone())
    );
    assert_eq!(
        CacheLocation::resolve(None, Some(&from_config)).get_cache_path(),
        from_env.path()
    );

    env.remove(CACHE_DIR_ENV);
    assert_eq!(
        CacheLocation::resolve(None, Some(&from_config)).get_cache_path(),
        from_config.as_path()
    );
    assert_eq!(CacheLocation::resolve(None, None).strategy, CacheStrategy::Shared);
}
