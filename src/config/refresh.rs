//! Per-stage refresh policy.
//!
//! ```toml
//! [refresh]
//! default = "refresh_current"
//!
//! [refresh.stages]
//! competition = "trust_cache"
//! match = "trust_cache"
//! ```

use super::scope::ScopeFilter;
use crate::pipeline::{ParentRef, StageId, WorkUnit};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Whether a cached document is acceptable for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Always serve from cache when present.
    TrustCache,
    /// Always go to the network.
    ForceRefresh,
    /// Go to the network only for units belonging to a current season.
    #[default]
    RefreshCurrent,
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TrustCache => "trust_cache",
            Self::ForceRefresh => "force_refresh",
            Self::RefreshCurrent => "refresh_current",
        })
    }
}

impl FromStr for RefreshMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "trust_cache" | "cache" => Ok(Self::TrustCache),
            "force_refresh" | "force" => Ok(Self::ForceRefresh),
            "refresh_current" | "current" => Ok(Self::RefreshCurrent),
            other => Err(format!(
                "unknown refresh mode '{}' (expected trust_cache, force_refresh or refresh_current)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshPolicy {
    #[serde(default)]
    pub default: RefreshMode,

    /// Per-stage overrides of `default`.
    #[serde(default)]
    pub stages: BTreeMap<StageId, RefreshMode>,
}

impl RefreshPolicy {
    pub fn uniform(mode: RefreshMode) -> Self {
        Self {
            default: mode,
            stages: BTreeMap::new(),
        }
    }

    pub fn with_stage(mut self, stage: StageId, mode: RefreshMode) -> Self {
        self.stages.insert(stage, mode);
        self
    }

    pub fn mode_for(&self, stage: StageId) -> RefreshMode {
        self.stages.get(&stage).copied().unwrap_or(self.default)
    }

    /// Decide `force_refresh` for one unit.
    pub fn force_refresh(&self, unit: &WorkUnit, scope: &ScopeFilter) -> bool {
        match self.mode_for(unit.stage) {
            RefreshMode::TrustCache => false,
            RefreshMode::ForceRefresh => true,
            RefreshMode::RefreshCurrent => is_current(&unit.parent, scope),
        }
    }
}

/// A competition's history page is current while its latest season is, or
/// when the latest season is unknown. The competition index is never current.
fn is_current(parent: &ParentRef, scope: &ScopeFilter) -> bool {
    match parent {
        ParentRef::Root => false,
        ParentRef::Competition(competition) => competition
            .last_season
            .as_deref()
            .is_none_or(|season| scope.is_current_season(season)),
        ParentRef::Season(_) | ParentRef::Fixture(_) => parent
            .season()
            .is_some_and(|season| scope.is_current_season(season)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{CompetitionRef, CompetitionType, SeasonRef};
    use crate::signature::RequestSignature;

    fn season_unit(season: &str) -> WorkUnit {
        WorkUnit::new(
            StageId::ScoreTable,
            RequestSignature::parse(&format!("https://fbref.com/en/comps/9/{}/", season)).unwrap(),
            ParentRef::Season(SeasonRef {
                competition: CompetitionRef {
                    id: 9,
                    name: "Premier League".into(),
                    kind: CompetitionType::Domestic,
                    last_season: Some("2024-2025".into()),
                },
                season: season.into(),
            }),
        )
    }

    fn scope() -> ScopeFilter {
        ScopeFilter {
            current_seasons: vec!["2024-2025".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_refresh_current_only_for_current_season() {
        let policy = RefreshPolicy::default();
        assert!(policy.force_refresh(&season_unit("2024-2025"), &scope()));
        assert!(!policy.force_refresh(&season_unit("2019-2020"), &scope()));
    }

    #[test]
    fn test_stage_override_beats_default() {
        let policy = RefreshPolicy::uniform(RefreshMode::TrustCache)
            .with_stage(StageId::ScoreTable, RefreshMode::ForceRefresh);
        assert!(policy.force_refresh(&season_unit("2019-2020"), &scope()));
        assert_eq!(policy.mode_for(StageId::Match), RefreshMode::TrustCache);
    }

    #[test]
    fn test_root_unit_is_historical() {
        let unit = WorkUnit::new(
            StageId::Competition,
            RequestSignature::parse("https://fbref.com/en/comps/").unwrap(),
            ParentRef::Root,
        );
        assert!(!RefreshPolicy::default().force_refresh(&unit, &scope()));
    }

    #[test]
    fn test_policy_from_toml() {
        let policy: RefreshPolicy = toml::from_str(
            r#"
            default = "trust_cache"

            [stages]
            score_table = "refresh_current"
            match = "force_refresh"
            "#,
        )
        .unwrap();
        assert_eq!(policy.mode_for(StageId::Season), RefreshMode::TrustCache);
        assert_eq!(policy.mode_for(StageId::Match), RefreshMode::ForceRefresh);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("force".parse::<RefreshMode>().unwrap(), RefreshMode::ForceRefresh);
        assert_eq!(
            "refresh-current".parse::<RefreshMode>().unwrap(),
            RefreshMode::RefreshCurrent
        );
        assert!("sometimes".parse::<RefreshMode>().is_err());
    }
}
