//! Stage runner: drive one stage's work units through fetch, extract and
//! upsert, isolating per-unit failures.

use super::cancel::CancellationToken;
use super::stage::{StageId, StageState};
use super::work::{StageProgress, WorkUnit};
use crate::config::{RefreshPolicy, ScopeFilter};
use crate::errors::{ExtractionWarning, StageAbortedError, StorageWriteError, UnitFailure};
use crate::extract::{ExtractContext, ExtractionResult, Extractor};
use crate::fetch::Fetcher;
use crate::progress::ProgressSink;
use crate::storage::{Record, RecordStore};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use url::Url;

/// Outcome of one stage run.
#[derive(Debug, Clone)]
pub struct StageRunResult {
    pub stage: StageId,
    pub succeeded: usize,
    pub failed: usize,
    /// Already processed this run, or extraction produced nothing usable.
    pub skipped: usize,
    pub records_upserted: usize,
    pub warnings: Vec<ExtractionWarning>,
    pub failures: Vec<UnitFailure>,
    /// Units this stage discovered for downstream stages.
    pub follow_ups: Vec<WorkUnit>,
    pub aborted: Option<StageAbortedError>,
    pub duration: Duration,
}

impl StageRunResult {
    pub fn new(stage: StageId) -> Self {
        Self {
            stage,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            records_upserted: 0,
            warnings: Vec::new(),
            failures: Vec::new(),
            follow_ups: Vec::new(),
            aborted: None,
            duration: Duration::ZERO,
        }
    }

    /// A stage that never ran because its input could not be selected.
    pub fn aborted(stage: StageId, error: StageAbortedError) -> Self {
        Self {
            aborted: Some(error),
            ..Self::new(stage)
        }
    }

    pub fn state(&self) -> StageState {
        if self.aborted.is_some() {
            StageState::Aborted
        } else {
            StageState::Completed
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    /// One line for progress output and logs.
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{}: {} succeeded, {} failed, {} skipped, {} records in {:.2}s",
            self.state(),
            self.succeeded,
            self.failed,
            self.skipped,
            self.records_upserted,
            self.duration.as_secs_f64()
        );
        if let Some(aborted) = &self.aborted {
            line.push_str(&format!(" ({})", aborted.reason));
        }
        line
    }
}

/// Per-run settings shared by every stage.
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub base_url: Url,
    pub abort_threshold: u32,
    pub refresh: RefreshPolicy,
    pub scope: ScopeFilter,
}

enum UnitOutcome {
    Succeeded {
        records: usize,
        follow_ups: Vec<WorkUnit>,
    },
    Skipped,
    Failed(UnitFailure),
}

pub struct StageRunner<'a> {
    fetcher: &'a Fetcher,
    store: &'a dyn RecordStore,
    progress: &'a dyn ProgressSink,
    settings: &'a RunnerSettings,
    cancel: CancellationToken,
}

impl<'a> StageRunner<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        store: &'a dyn RecordStore,
        progress: &'a dyn ProgressSink,
        settings: &'a RunnerSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            progress,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run `units` in order. Follow-ups for `stage` itself are appended to the
    /// queue; follow-ups for other stages are returned in the result.
    pub fn run(
        &self,
        stage: StageId,
        units: Vec<WorkUnit>,
        progress: &mut StageProgress,
    ) -> StageRunResult {
        let extractor = Extractor::for_stage(stage);
        let threshold = self.settings.abort_threshold.max(1);
        let start = Instant::now();
        let mut result = StageRunResult::new(stage);
        let mut queue: VecDeque<WorkUnit> = units.into();
        let mut total = queue.len();
        let mut handled = 0;
        let mut consecutive_failures = 0u32;

        log::info!("{}: {} work unit(s)", stage, total);
        self.progress.start_stage(stage, total);

        while let Some(unit) = queue.pop_front() {
            if self.cancel.is_cancelled() {
                log::warn!("{}: cancelled with {} unit(s) left", stage, queue.len() + 1);
                result.aborted = Some(StageAbortedError::cancelled(stage));
                break;
            }
            handled += 1;

            if progress.is_processed(&unit.signature) {
                log::debug!("{}: already processed {}", stage, unit.signature);
                result.skipped += 1;
                self.progress.report(stage, handled, total);
                continue;
            }

            match self.run_unit(extractor, &unit, &mut result.warnings) {
                UnitOutcome::Succeeded {
                    records,
                    follow_ups,
                } => {
                    progress.mark_processed(&unit.signature);
                    consecutive_failures = 0;
                    result.succeeded += 1;
                    result.records_upserted += records;
                    for follow_up in follow_ups {
                        if follow_up.stage == stage {
                            total += 1;
                            queue.push_back(follow_up);
                        } else {
                            result.follow_ups.push(follow_up);
                        }
                    }
                }
                UnitOutcome::Skipped => {
                    progress.mark_processed(&unit.signature);
                    consecutive_failures = 0;
                    result.skipped += 1;
                }
                UnitOutcome::Failed(failure) => {
                    log::error!("{}: {}", stage, failure);
                    consecutive_failures += 1;
                    result.failed += 1;
                    result.failures.push(failure);

                    if consecutive_failures >= threshold {
                        log::error!(
                            "{}: aborting after {} consecutive failures",
                            stage,
                            consecutive_failures
                        );
                        result.aborted = Some(StageAbortedError::consecutive_failures(
                            stage,
                            consecutive_failures,
                            threshold,
                        ));
                        self.progress.report(stage, handled, total);
                        break;
                    }
                }
            }
            self.progress.report(stage, handled, total);
        }

        result.duration = start.elapsed();
        let summary = result.summary_line();
        if result.is_aborted() {
            log::warn!("{} {}", stage, summary);
        } else {
            log::info!("{} {}", stage, summary);
        }
        self.progress.complete_stage(stage, &summary);
        result
    }

    fn run_unit(
        &self,
        extractor: Extractor,
        unit: &WorkUnit,
        warnings: &mut Vec<ExtractionWarning>,
    ) -> UnitOutcome {
        let force_refresh = self
            .settings
            .refresh
            .force_refresh(unit, &self.settings.scope);
        let outcome = match self.fetcher.fetch(
            unit.stage.cache_partition(),
            &unit.signature,
            force_refresh,
        ) {
            Ok(outcome) => outcome,
            Err(e) => return UnitOutcome::Failed(e.into()),
        };

        let ctx = ExtractContext::new(unit, &self.settings.base_url);
        let ExtractionResult {
            records,
            follow_ups,
            warnings: unit_warnings,
        } = extractor.extract(outcome.body(), &ctx);

        for warning in &unit_warnings {
            log::warn!("{}", warning);
            self.progress.warn(&warning.to_string());
        }
        let nothing_usable = records.is_empty() && !unit_warnings.is_empty();
        warnings.extend(unit_warnings);
        if nothing_usable {
            return UnitOutcome::Skipped;
        }

        match self.upsert_all(&records) {
            Ok(()) => UnitOutcome::Succeeded {
                records: records.len(),
                follow_ups,
            },
            Err(e) => UnitOutcome::Failed(e.into()),
        }
    }

    fn upsert_all(&self, records: &[Record]) -> Result<(), StorageWriteError> {
        for record in records {
            self.store.upsert(record.table, &record.key, &record.fields)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryRequestCache;
    use crate::config::{RefreshMode, RetryConfig};
    use crate::pipeline::{CompetitionRef, CompetitionType, ParentRef, SeasonRef};
    use crate::progress::{RecordingProgressSink, SilentProgressSink};
    use crate::signature::RequestSignature;
    use crate::storage::{MemoryRecordStore, RecordFilter};
    use crate::testkit::{pages, FailingRecordStore, ScriptedTransport};
    use std::sync::Arc;

    const BASE: &str = "https://fbref.com";

    fn settings(threshold: u32) -> RunnerSettings {
        RunnerSettings {
            base_url: Url::parse(BASE).unwrap(),
            abort_threshold: threshold,
            refresh: RefreshPolicy::uniform(RefreshMode::RefreshCurrent),
            scope: ScopeFilter {
                current_seasons: vec!["2024-2025".into()],
                ..ScopeFilter::default()
            },
        }
    }

    fn fetcher(transport: &Arc<ScriptedTransport>) -> Fetcher {
        Fetcher::new(
            transport.clone(),
            Arc::new(MemoryRequestCache::new()),
            Duration::ZERO,
            RetryConfig::disabled(),
        )
    }

    fn premier_league() -> CompetitionRef {
        CompetitionRef {
            id: 9,
            name: "Premier League".into(),
            kind: CompetitionType::Domestic,
            last_season: Some("2024-2025".into()),
        }
    }

    fn standings_unit(season: &str) -> (String, WorkUnit) {
        let url = format!("{}{}", BASE, pages::season_link(9, "Premier League", season));
        let unit = WorkUnit::new(
            StageId::ScoreTable,
            RequestSignature::parse(&url).unwrap(),
            ParentRef::Season(SeasonRef {
                competition: premier_league(),
                season: season.into(),
            }),
        );
        (url, unit)
    }

    #[test]
    fn test_failing_unit_is_isolated() {
        let (a_url, a) = standings_unit("2020-2021");
        let (b_url, b) = standings_unit("2021-2022");
        let (c_url, c) = standings_unit("2022-2023");
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_page(&a_url, pages::standings(9, "2020-2021", &["Manchester City", "Arsenal"]))
                .with_failure(&b_url, "connection reset")
                .with_page(&c_url, pages::standings(9, "2022-2023", &["Manchester City"])),
        );
        let fetcher = fetcher(&transport);
        let store = MemoryRecordStore::new();
        let settings = settings(2);
        let runner = StageRunner::new(&fetcher, &store, &SilentProgressSink, &settings);

        let mut progress = StageProgress::new(StageId::ScoreTable);
        let result = runner.run(StageId::ScoreTable, vec![a, b, c], &mut progress);

        assert_eq!(result.state(), StageState::Completed);
        assert_eq!((result.succeeded, result.failed), (2, 1));
        assert_eq!(result.records_upserted, 3);
        assert_eq!(store.count("score_table"), 3);
        assert_eq!(progress.len(), 2);
        assert!(matches!(result.failures[0], UnitFailure::Fetch(_)));
    }

    #[test]
    fn test_threshold_of_one_aborts_on_first_failure() {
        let (a_url, a) = standings_unit("2020-2021");
        let (b_url, b) = standings_unit("2021-2022");
        let (c_url, c) = standings_unit("2022-2023");
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_page(&a_url, pages::standings(9, "2020-2021", &["Arsenal"]))
                .with_failure(&b_url, "timeout")
                .with_page(&c_url, pages::standings(9, "2022-2023", &["Arsenal"])),
        );
        let fetcher = fetcher(&transport);
        let store = MemoryRecordStore::new();
        let settings = settings(1);
        let runner = StageRunner::new(&fetcher, &store, &SilentProgressSink, &settings);

        let mut progress = StageProgress::new(StageId::ScoreTable);
        let result = runner.run(StageId::ScoreTable, vec![a, b, c], &mut progress);

        assert_eq!(result.state(), StageState::Aborted);
        assert_eq!(transport.request_count(&c_url), 0);
        assert_eq!(store.count("score_table"), 1);
    }

    #[test]
    fn test_warning_only_unit_is_skipped_and_resets_streak() {
        let (a_url, a) = standings_unit("2019-2020");
        let (b_url, b) = standings_unit("2020-2021");
        let (c_url, c) = standings_unit("2021-2022");
        let transport = Arc::new(
            ScriptedTransport::new()
                .with_failure(&a_url, "timeout")
                .with_page(&b_url, "<html><body>maintenance</body></html>")
                .with_failure(&c_url, "timeout"),
        );
        let fetcher = fetcher(&transport);
        let store = MemoryRecordStore::new();
        let settings = settings(2);
        let recorder = RecordingProgressSink::new();
        let runner = StageRunner::new(&fetcher, &store, &recorder, &settings);

        let mut progress = StageProgress::new(StageId::ScoreTable);
        let result = runner.run(StageId::ScoreTable, vec![a, b, c], &mut progress);

        assert_eq!(result.state(), StageState::Completed);
        assert_eq!((result.failed, result.skipped), (2, 1));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(recorder.warnings().len(), 1);
    }

    #[test]
    fn test_duplicate_signature_runs_once() {
        let (url, unit) = standings_unit("2020-2021");
        let transport = Arc::new(
            ScriptedTransport::new().with_page(&url, pages::standings(9, "2020-2021", &["Arsenal"])),
        );
        let fetcher = fetcher(&transport);
        let store = MemoryRecordStore::new();
        let settings = settings(3);
        let runner = StageRunner::new(&fetcher, &store, &SilentProgressSink, &settings);

        let mut progress = StageProgress::new(StageId::ScoreTable);
        let result = runner.run(
            StageId::ScoreTable,
            vec![unit.clone(), unit],
            &mut progress,
        );
        assert_eq!((result.succeeded, result.skipped), (1, 1));
        assert_eq!(transport.request_count(&url), 1);
    }

    #[test]
    fn test_storage_failure_counts_as_unit_failure() {
        let (url, unit) = standings_unit("2020-2021");
        let transport = Arc::new(
            ScriptedTransport::new().with_page(&url, pages::standings(9, "2020-2021", &["Arsenal"])),
        );
        let fetcher = fetcher(&transport);
        let store = FailingRecordStore::new().rejecting("team=Arsenal");
        let settings = settings(3);
        let runner = StageRunner::new(&fetcher, &store, &SilentProgressSink, &settings);

        let mut progress = StageProgress::new(StageId::ScoreTable);
        let result = runner.run(StageId::ScoreTable, vec![unit], &mut progress);

        assert_eq!(result.failed, 1);
        assert!(matches!(result.failures[0], UnitFailure::Storage(_)));
        assert!(progress.is_empty());
        assert!(store
            .query("score_table", &RecordFilter::all())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_cancelled_before_first_unit() {
        let (url, unit) = standings_unit("2020-2021");
        let transport = Arc::new(ScriptedTransport::new().with_page(&url, "<html></html>"));
        let fetcher = fetcher(&transport);
        let store = MemoryRecordStore::new();
        let settings = settings(3);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runner = StageRunner::new(&fetcher, &store, &SilentProgressSink, &settings)
            .with_cancellation(cancel);

        let mut progress = StageProgress::new(StageId::ScoreTable);
        let result = runner.run(StageId::ScoreTable, vec![unit], &mut progress);

        assert_eq!(
            result.aborted,
            Some(StageAbortedError::cancelled(StageId::ScoreTable))
        );
        assert_eq!(transport.total_requests(), 0);
    }
}
