//! Staged acquisition pipeline.
//!
//! Stages run in dependency order. Each one selects its work units from the
//! records its predecessors persisted, fetches through the shared throttle and
//! cache, extracts records and upserts them by natural key.

pub mod cancel;
pub mod orchestrator;
pub mod runner;
pub mod selection;
pub mod stage;
pub mod work;

pub use cancel::CancellationToken;
pub use orchestrator::{Orchestrator, RunRequest, RunSummary, StageCounts, StageReport};
pub use runner::{RunnerSettings, StageRunResult, StageRunner};
pub use selection::select_units;
pub use stage::{StageId, StageState};
pub use work::{
    dedup_units, CompetitionRef, CompetitionType, FixtureRef, ParentRef, SeasonRef, StageProgress,
    WorkUnit,
};
