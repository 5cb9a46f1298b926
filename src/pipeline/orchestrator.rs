//! Pipeline orchestrator: run the requested stages in dependency order.
//!
//! Each stage's input is selected from the record store, so a stage whose
//! predecessor is not part of the request runs against whatever earlier runs
//! persisted. A requested predecessor that does not complete leaves its
//! dependents `Pending`.

use super::cancel::CancellationToken;
use super::runner::{RunnerSettings, StageRunResult, StageRunner};
use super::selection::select_units;
use super::stage::{StageId, StageState};
use super::work::{dedup_units, StageProgress, WorkUnit};
use crate::config::{RefreshPolicy, ScopeFilter};
use crate::errors::StageAbortedError;
use crate::fetch::{FetchStats, Fetcher};
use crate::progress::ProgressSink;
use crate::storage::RecordStore;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use url::Url;

/// What to run and against which slice of the data.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub stages: Vec<StageId>,
    pub scope: ScopeFilter,
    pub refresh: RefreshPolicy,
}

impl Default for RunRequest {
    fn default() -> Self {
        Self {
            stages: StageId::ALL.to_vec(),
            scope: ScopeFilter::default(),
            refresh: RefreshPolicy::default(),
        }
    }
}

impl RunRequest {
    pub fn new(stages: Vec<StageId>, scope: ScopeFilter, refresh: RefreshPolicy) -> Self {
        Self {
            stages,
            scope,
            refresh,
        }
    }

    /// Requested stages in topological order; all of them when none are named.
    pub fn ordered_stages(&self) -> Vec<StageId> {
        if self.stages.is_empty() {
            StageId::ALL.to_vec()
        } else {
            StageId::ordered(&self.stages)
        }
    }
}

/// Final state of one requested stage.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: StageId,
    pub state: StageState,
    /// Requested predecessor that kept this stage from running.
    pub blocked_by: Option<StageId>,
    /// Absent when the stage never ran.
    pub result: Option<StageRunResult>,
}

impl StageReport {
    fn blocked(stage: StageId, by: StageId) -> Self {
        Self {
            stage,
            state: StageState::Pending,
            blocked_by: Some(by),
            result: None,
        }
    }

    fn finished(result: StageRunResult) -> Self {
        Self {
            stage: result.stage,
            state: result.state(),
            blocked_by: None,
            result: Some(result),
        }
    }

    pub fn status_label(&self) -> String {
        match self.blocked_by {
            Some(by) => format!("skipped (blocked by {})", by),
            None => self.state.to_string(),
        }
    }
}

/// Counters of a stage report, flattened for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct StageCounts {
    pub stage: StageId,
    pub state: StageState,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub records_upserted: usize,
    pub abort_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stages: Vec<StageReport>,
    pub fetch: FetchStats,
    pub duration: Duration,
}

impl RunSummary {
    pub fn stage(&self, stage: StageId) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    pub fn any_aborted(&self) -> bool {
        self.stages
            .iter()
            .any(|report| report.state == StageState::Aborted)
    }

    pub fn records_upserted(&self) -> usize {
        self.stages
            .iter()
            .filter_map(|report| report.result.as_ref())
            .map(|result| result.records_upserted)
            .sum()
    }

    pub fn counts(&self) -> Vec<StageCounts> {
        self.stages
            .iter()
            .map(|report| {
                let result = report.result.as_ref();
                StageCounts {
                    stage: report.stage,
                    state: report.state,
                    succeeded: result.map_or(0, |r| r.succeeded),
                    failed: result.map_or(0, |r| r.failed),
                    skipped: result.map_or(0, |r| r.skipped),
                    warnings: result.map_or(0, |r| r.warnings.len()),
                    records_upserted: result.map_or(0, |r| r.records_upserted),
                    abort_reason: result
                        .and_then(|r| r.aborted.as_ref())
                        .map(|a| a.reason.to_string())
                        .or_else(|| report.blocked_by.map(|b| format!("blocked by {}", b))),
                }
            })
            .collect()
    }
}

pub struct Orchestrator<'a> {
    fetcher: &'a Fetcher,
    store: &'a dyn RecordStore,
    progress: &'a dyn ProgressSink,
    base_url: Url,
    abort_threshold: u32,
    cancel: CancellationToken,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        fetcher: &'a Fetcher,
        store: &'a dyn RecordStore,
        progress: &'a dyn ProgressSink,
        base_url: Url,
        abort_threshold: u32,
    ) -> Self {
        Self {
            fetcher,
            store,
            progress,
            base_url,
            abort_threshold,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(&self, request: &RunRequest) -> RunSummary {
        let start = Instant::now();
        let stages = request.ordered_stages();
        let settings = RunnerSettings {
            base_url: self.base_url.clone(),
            abort_threshold: self.abort_threshold,
            refresh: request.refresh.clone(),
            scope: request.scope.clone(),
        };
        let runner = StageRunner::new(self.fetcher, self.store, self.progress, &settings)
            .with_cancellation(self.cancel.clone());

        let mut states: BTreeMap<StageId, StageState> = stages
            .iter()
            .map(|stage| (*stage, StageState::Pending))
            .collect();
        let mut follow_ups: HashMap<StageId, Vec<WorkUnit>> = HashMap::new();
        let mut reports = Vec::with_capacity(stages.len());

        for (index, stage) in stages.iter().copied().enumerate() {
            log::info!("Stage {}/{}: {}", index + 1, stages.len(), stage);

            let blocker = stage.predecessors().iter().copied().find(|pred| {
                states
                    .get(pred)
                    .is_some_and(|state| *state != StageState::Completed)
            });
            if let Some(by) = blocker {
                let report = StageReport::blocked(stage, by);
                log::warn!("{}: {}", stage, report.status_label());
                self.progress
                    .warn(&format!("{} {}", stage, report.status_label()));
                reports.push(report);
                continue;
            }

            states.insert(stage, StageState::Running);
            let result = self.run_stage(stage, &runner, request, &mut follow_ups);
            for unit in &result.follow_ups {
                follow_ups.entry(unit.stage).or_default().push(unit.clone());
            }

            let report = StageReport::finished(result);
            debug_assert!(StageState::Running.can_transition_to(report.state));
            states.insert(stage, report.state);
            reports.push(report);
        }

        let summary = RunSummary {
            stages: reports,
            fetch: self.fetcher.stats(),
            duration: start.elapsed(),
        };
        log::info!(
            "Run finished in {:.2}s: {} records upserted, {} network requests, {} cache hits",
            summary.duration.as_secs_f64(),
            summary.records_upserted(),
            summary.fetch.network_requests,
            summary.fetch.cache_hits
        );
        summary
    }

    fn run_stage(
        &self,
        stage: StageId,
        runner: &StageRunner<'_>,
        request: &RunRequest,
        follow_ups: &mut HashMap<StageId, Vec<WorkUnit>>,
    ) -> StageRunResult {
        if self.cancel.is_cancelled() {
            return StageRunResult::aborted(stage, StageAbortedError::cancelled(stage));
        }

        let mut units = match select_units(stage, self.store, &request.scope, &self.base_url) {
            Ok(units) => units,
            Err(e) => {
                log::error!("{}: {}", stage, e);
                return StageRunResult::aborted(stage, StageAbortedError::input_selection(stage, &e));
            }
        };
        let selected = units.len();
        units.extend(follow_ups.remove(&stage).unwrap_or_default());
        let units = dedup_units(units);
        if units.len() > selected {
            log::debug!(
                "{}: {} unit(s) added from upstream follow-ups",
                stage,
                units.len() - selected
            );
        }

        let mut progress = StageProgress::new(stage);
        runner.run(stage, units, &mut progress)
    }
}
