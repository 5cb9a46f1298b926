use indoc::indoc;
use pitchcrawl::config::{
    load_config_from, ConfigError, RefreshMode, RetryStrategy, CONFIG_FILE_NAME,
};
use pitchcrawl::pipeline::{CompetitionType, StageId};
use pretty_assertions::assert_eq;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_config_found_in_ancestor_directory() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join(CONFIG_FILE_NAME),
        indoc! {r#"
            [throttle]
            min_interval_ms = 1500

            [scope]
            competition_ids = [9, 12]
            competition_types = ["domestic"]
            current_seasons = ["2024-2025"]
        "#},
    )
    .unwrap();
    let nested = root.path().join("data").join("runs");
    fs::create_dir_all(&nested).unwrap();

    let loaded = load_config_from(None, nested).unwrap();

    assert_eq!(loaded.source, Some(root.path().join(CONFIG_FILE_NAME)));
    assert_eq!(loaded.config.throttle.min_interval(), Duration::from_millis(1500));
    assert_eq!(loaded.config.scope.competition_ids, vec![9, 12]);
    assert_eq!(
        loaded.config.scope.competition_types,
        vec![CompetitionType::Domestic]
    );
    assert!(loaded.config.scope.is_current_season("2024-2025"));
}

#[test]
fn test_no_config_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let loaded = load_config_from(None, dir.path().to_path_buf()).unwrap();
    assert_eq!(loaded.source, None);
    assert_eq!(loaded.config.runner.abort_after_consecutive_failures, 5);
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = load_config_from(Some(&missing), dir.path().to_path_buf()).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}

#[test]
fn test_refresh_and_retry_sections() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        indoc! {r#"
            [retry]
            max_retries = 5
            strategy = "fibonacci"
            base_delay_ms = 100
            max_delay_ms = 2000

            [refresh]
            default = "trust_cache"

            [refresh.stages]
            fixture = "force_refresh"
            score_table = "refresh_current"
        "#},
    )
    .unwrap();

    let config = load_config_from(Some(&path), dir.path().to_path_buf())
        .unwrap()
        .config;

    assert_eq!(config.retry.max_retries, 5);
    assert_eq!(config.retry.strategy, RetryStrategy::Fibonacci);
    assert_eq!(config.refresh.mode_for(StageId::Competition), RefreshMode::TrustCache);
    assert_eq!(config.refresh.mode_for(StageId::Fixture), RefreshMode::ForceRefresh);
    assert_eq!(
        config.refresh.mode_for(StageId::ScoreTable),
        RefreshMode::RefreshCurrent
    );
}

#[test]
fn test_invalid_values_are_all_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        indoc! {r#"
            base_url = "not a url"
            request_timeout_secs = 0

            [runner]
            abort_after_consecutive_failures = 0
        "#},
    )
    .unwrap();

    let err = load_config_from(None, dir.path().to_path_buf()).unwrap_err();
    let ConfigError::Invalid { errors } = err else {
        panic!("expected validation errors, got {:?}", err);
    };
    let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
    assert_eq!(
        fields,
        vec![
            "base_url",
            "request_timeout_secs",
            "runner.abort_after_consecutive_failures"
        ]
    );
}

#[test]
fn test_unknown_stage_in_refresh_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[refresh.stages]\nplayers = \"trust_cache\"\n",
    )
    .unwrap();

    let err = load_config_from(None, dir.path().to_path_buf()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}
