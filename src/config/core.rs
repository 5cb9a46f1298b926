use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::refresh::RefreshPolicy;
use super::retry::RetryConfig;
use super::scope::ScopeFilter;

pub const DEFAULT_BASE_URL: &str = "https://fbref.com";
pub const DEFAULT_DATABASE_PATH: &str = "pitchcrawl.db";

/// Root configuration structure for pitchcrawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Site root that relative links are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub throttle: ThrottleConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub refresh: RefreshPolicy,

    #[serde(default)]
    pub scope: ScopeFilter,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            throttle: ThrottleConfig::default(),
            retry: RetryConfig::default(),
            runner: RunnerConfig::default(),
            refresh: RefreshPolicy::default(),
            scope: ScopeFilter::default(),
            storage: StorageConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
    }
}

/// Minimum spacing between outbound requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Measured from the end of the previous request (default: 3000)
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl ThrottleConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Consecutive unit failures that abort a stage (default: 5)
    #[serde(default = "default_abort_threshold")]
    pub abort_after_consecutive_failures: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            abort_after_consecutive_failures: default_abort_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Record store database (default: ./pitchcrawl.db)
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Request cache directory (default: platform cache dir)
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (compatible; pitchcrawl/{})",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_min_interval_ms() -> u64 {
    3000
}

fn default_abort_threshold() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefreshMode;
    use crate::pipeline::{CompetitionType, StageId};
    use indoc::indoc;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.throttle.min_interval(), Duration::from_secs(3));
        assert_eq!(config.runner.abort_after_consecutive_failures, 5);
        assert_eq!(config.database_path(), PathBuf::from("pitchcrawl.db"));
    }

    #[test]
    fn test_full_file_parses() {
        let config: PipelineConfig = toml::from_str(indoc! {r#"
            base_url = "https://example.org"
            request_timeout_secs = 10

            [throttle]
            min_interval_ms = 500

            [retry]
            max_retries = 1

            [runner]
            abort_after_consecutive_failures = 2

            [refresh]
            default = "trust_cache"

            [refresh.stages]
            fixture = "refresh_current"

            [scope]
            competition_ids = [9, 11]
            competition_types = ["domestic"]
            years_back = 3
            current_seasons = ["2024-2025"]

            [storage]
            database_path = "/tmp/football.db"
        "#})
        .unwrap();

        assert_eq!(config.base_url, "https://example.org");
        assert_eq!(config.throttle.min_interval_ms, 500);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.runner.abort_after_consecutive_failures, 2);
        assert_eq!(
            config.refresh.mode_for(StageId::Fixture),
            RefreshMode::RefreshCurrent
        );
        assert_eq!(config.scope.competition_ids, vec![9, 11]);
        assert_eq!(config.scope.competition_types, vec![CompetitionType::Domestic]);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/football.db"));
        assert_eq!(config.cache.directory, None);
    }
}
