//! Work units and the parent references that tie them to upstream records.

use super::stage::StageId;
use crate::signature::RequestSignature;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How the source site classifies a competition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionType {
    /// First-tier domestic club league.
    Domestic,
    /// International club cup (e.g. continental champions cups).
    International,
    /// National-team tournament.
    National,
}

impl CompetitionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::International => "international",
            Self::National => "national",
        }
    }

    /// Leagues are played as a single table; everything else is a tournament.
    pub fn is_league(&self) -> bool {
        matches!(self, Self::Domestic)
    }
}

impl fmt::Display for CompetitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompetitionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "domestic" => Ok(Self::Domestic),
            "international" => Ok(Self::International),
            "national" => Ok(Self::National),
            other => Err(format!(
                "unknown competition type '{}' (expected domestic, international or national)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionRef {
    pub id: u32,
    pub name: String,
    pub kind: CompetitionType,
    /// Most recent season listed for the competition, when known.
    pub last_season: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonRef {
    pub competition: CompetitionRef,
    pub season: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureRef {
    pub season: SeasonRef,
    pub date: Option<String>,
    pub home_team: String,
    pub away_team: String,
}

/// The upstream record a work unit was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentRef {
    /// Seed unit with no upstream record.
    Root,
    Competition(CompetitionRef),
    Season(SeasonRef),
    Fixture(FixtureRef),
}

impl ParentRef {
    pub fn competition(&self) -> Option<&CompetitionRef> {
        match self {
            Self::Root => None,
            Self::Competition(competition) => Some(competition),
            Self::Season(season) => Some(&season.competition),
            Self::Fixture(fixture) => Some(&fixture.season.competition),
        }
    }

    /// Season label this unit belongs to, when it belongs to one.
    pub fn season(&self) -> Option<&str> {
        match self {
            Self::Root | Self::Competition(_) => None,
            Self::Season(season) => Some(&season.season),
            Self::Fixture(fixture) => Some(&fixture.season.season),
        }
    }
}

/// One pending fetch-and-extract task within a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub signature: RequestSignature,
    pub stage: StageId,
    pub parent: ParentRef,
}

impl WorkUnit {
    pub fn new(stage: StageId, signature: RequestSignature, parent: ParentRef) -> Self {
        Self {
            signature,
            stage,
            parent,
        }
    }
}

/// Signatures already processed successfully by one stage during this run.
#[derive(Debug, Clone)]
pub struct StageProgress {
    stage: StageId,
    processed: HashSet<RequestSignature>,
}

impl StageProgress {
    pub fn new(stage: StageId) -> Self {
        Self {
            stage,
            processed: HashSet::new(),
        }
    }

    pub fn stage(&self) -> StageId {
        self.stage
    }

    pub fn is_processed(&self, signature: &RequestSignature) -> bool {
        self.processed.contains(signature)
    }

    /// Returns false if the signature was already recorded.
    pub fn mark_processed(&mut self, signature: &RequestSignature) -> bool {
        self.processed.insert(signature.clone())
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}

/// Drop units whose signature already appeared earlier in the list.
pub fn dedup_units(units: Vec<WorkUnit>) -> Vec<WorkUnit> {
    let mut seen = HashSet::new();
    units
        .into_iter()
        .filter(|unit| seen.insert(unit.signature.clone()))
        .collect()
}
