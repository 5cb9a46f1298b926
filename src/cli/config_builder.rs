//! Merge command-line overrides into the loaded configuration.

use crate::cli::args::RunArgs;
use crate::config::{validate_config, ConfigError, PipelineConfig};
use crate::pipeline::RunRequest;

/// Apply `run` flags on top of `config`. Repeatable flags replace the file's
/// list when given at all. `--cache-dir` is resolved separately by
/// [`CacheLocation`](crate::cache::CacheLocation) so it keeps precedence over
/// the environment.
pub fn apply_run_overrides(
    mut config: PipelineConfig,
    args: &RunArgs,
) -> Result<PipelineConfig, ConfigError> {
    if !args.competition_ids.is_empty() {
        config.scope.competition_ids = args.competition_ids.clone();
    }
    if !args.competition_types.is_empty() {
        config.scope.competition_types = args.competition_types.clone();
    }
    if args.years_back.is_some() {
        config.scope.years_back = args.years_back;
    }
    if !args.current_seasons.is_empty() {
        config.scope.current_seasons = args.current_seasons.clone();
    }
    for (stage, mode) in &args.refresh {
        config.refresh = config.refresh.with_stage(*stage, *mode);
    }
    if let Some(database) = &args.database {
        config.storage.database_path = Some(database.clone());
    }
    if let Some(interval) = args.min_interval_ms {
        config.throttle.min_interval_ms = interval;
    }

    validate_config(&config)?;
    Ok(config)
}

pub fn build_run_request(config: &PipelineConfig, args: &RunArgs) -> RunRequest {
    RunRequest::new(
        args.stages.clone(),
        config.scope.clone(),
        config.refresh.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefreshMode;
    use crate::pipeline::{CompetitionType, StageId};
    use std::path::PathBuf;

    #[test]
    fn test_flags_override_file_values() {
        let mut config = PipelineConfig::default();
        config.scope.competition_ids = vec![1, 2];
        config.scope.current_seasons = vec!["2023-2024".into()];

        let args = RunArgs {
            competition_types: vec![CompetitionType::National],
            current_seasons: vec!["2024-2025".into()],
            refresh: vec![(StageId::Match, RefreshMode::TrustCache)],
            database: Some(PathBuf::from("/tmp/x.db")),
            min_interval_ms: Some(250),
            ..RunArgs::default()
        };
        let merged = apply_run_overrides(config, &args).unwrap();

        assert_eq!(merged.scope.competition_ids, vec![1, 2]);
        assert_eq!(merged.scope.competition_types, vec![CompetitionType::National]);
        assert_eq!(merged.scope.current_seasons, vec!["2024-2025".to_string()]);
        assert_eq!(merged.refresh.mode_for(StageId::Match), RefreshMode::TrustCache);
        assert_eq!(merged.database_path(), PathBuf::from("/tmp/x.db"));
        assert_eq!(merged.throttle.min_interval_ms, 250);
    }

    #[test]
    fn test_request_defaults_to_all_stages() {
        let config = PipelineConfig::default();
        let request = build_run_request(&config, &RunArgs::default());
        assert_eq!(request.ordered_stages(), StageId::ALL.to_vec());
    }
}
