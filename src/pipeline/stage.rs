//! Stage identifiers and the dependency graph between them.
//!
//! The set of stages is fixed: competitions feed seasons, seasons feed both
//! standings and fixtures, fixtures feed match reports.
//!
//! ```text
//! competition ──▶ season ──┬──▶ score_table
//!                          └──▶ fixture ──▶ match
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One pipeline phase, handling one data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Competition,
    Season,
    ScoreTable,
    Fixture,
    Match,
}

impl StageId {
    /// Every stage, in a valid topological order.
    pub const ALL: [StageId; 5] = [
        StageId::Competition,
        StageId::Season,
        StageId::ScoreTable,
        StageId::Fixture,
        StageId::Match,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Competition => "competition",
            Self::Season => "season",
            Self::ScoreTable => "score_table",
            Self::Fixture => "fixture",
            Self::Match => "match",
        }
    }

    /// Stages whose persisted output this stage reads as input.
    pub fn predecessors(&self) -> &'static [StageId] {
        match self {
            Self::Competition => &[],
            Self::Season => &[StageId::Competition],
            Self::ScoreTable => &[StageId::Season],
            Self::Fixture => &[StageId::Season],
            Self::Match => &[StageId::Fixture],
        }
    }

    /// Record-store table this stage writes.
    pub fn record_table(&self) -> &'static str {
        self.as_str()
    }

    /// Request-cache partition this stage reads and writes.
    pub fn cache_partition(&self) -> &'static str {
        self.as_str()
    }

    /// Sort a requested stage list into topological order, dropping duplicates.
    pub fn ordered(requested: &[StageId]) -> Vec<StageId> {
        Self::ALL
            .iter()
            .copied()
            .filter(|stage| requested.contains(stage))
            .collect()
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "competition" | "competitions" => Ok(Self::Competition),
            "season" | "seasons" => Ok(Self::Season),
            "score_table" | "standings" => Ok(Self::ScoreTable),
            "fixture" | "fixtures" => Ok(Self::Fixture),
            "match" | "matches" => Ok(Self::Match),
            other => Err(format!(
                "unknown stage '{}' (expected one of: competition, season, score_table, fixture, match)",
                other
            )),
        }
    }
}

/// Lifecycle of a stage within one run.
///
/// `Pending → Running → Completed`, or `Running → Aborted`. Both `Completed`
/// and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    Running,
    Completed,
    Aborted,
}

impl StageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: StageState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Aborted)
        )
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}
