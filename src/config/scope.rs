//! Which competitions and seasons a run covers.

use crate::pipeline::{CompetitionRef, CompetitionType};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    /// Restrict to these competition ids. Empty means all.
    #[serde(default)]
    pub competition_ids: Vec<u32>,

    /// Restrict to these competition types. Empty means all.
    #[serde(default)]
    pub competition_types: Vec<CompetitionType>,

    /// Keep seasons starting no earlier than `reference_year - years_back`.
    #[serde(default)]
    pub years_back: Option<u32>,

    /// Season labels treated as in progress (e.g. "2024-2025", "2025").
    #[serde(default)]
    pub current_seasons: Vec<String>,

    /// Year `years_back` counts from; the current calendar year when unset.
    #[serde(default)]
    pub reference_year: Option<i32>,
}

impl ScopeFilter {
    pub fn matches_competition(&self, competition: &CompetitionRef) -> bool {
        (self.competition_ids.is_empty() || self.competition_ids.contains(&competition.id))
            && (self.competition_types.is_empty()
                || self.competition_types.contains(&competition.kind))
    }

    /// Seasons whose label carries no year are always kept.
    pub fn includes_season(&self, season: &str) -> bool {
        let Some(years_back) = self.years_back else {
            return true;
        };
        match season_start_year(season) {
            Some(start) => {
                let earliest = i32::try_from(years_back)
                    .map_or(i32::MIN, |back| self.reference_year().saturating_sub(back));
                start >= earliest
            }
            None => true,
        }
    }

    pub fn is_current_season(&self, season: &str) -> bool {
        self.current_seasons.iter().any(|s| s == season.trim())
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
            .unwrap_or_else(|| chrono::Utc::now().year())
    }
}

/// First year in a season label: "2024-2025" → 2024, "2022" → 2022.
pub fn season_start_year(season: &str) -> Option<i32> {
    let digits: String = season
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn competition(id: u32, kind: CompetitionType) -> CompetitionRef {
        CompetitionRef {
            id,
            name: format!("Competition {}", id),
            kind,
            last_season: None,
        }
    }

    #[test]
    fn test_empty_scope_matches_everything() {
        let scope = ScopeFilter::default();
        assert!(scope.matches_competition(&competition(9, CompetitionType::Domestic)));
        assert!(scope.includes_season("1992-1993"));
    }

    #[test]
    fn test_competition_filters_combine() {
        let scope = ScopeFilter {
            competition_ids: vec![9, 8],
            competition_types: vec![CompetitionType::International],
            ..Default::default()
        };
        assert!(scope.matches_competition(&competition(8, CompetitionType::International)));
        assert!(!scope.matches_competition(&competition(9, CompetitionType::Domestic)));
        assert!(!scope.matches_competition(&competition(1, CompetitionType::International)));
    }

    #[test]
    fn test_huge_years_back_keeps_every_season() {
        for years_back in [u32::MAX, 1 << 31, 5_000] {
            let scope = ScopeFilter {
                years_back: Some(years_back),
                reference_year: Some(2025),
                ..Default::default()
            };
            assert!(scope.includes_season("2024-2025"), "years_back = {}", years_back);
            assert!(scope.includes_season("1888-1889"), "years_back = {}", years_back);
        }
    }

    #[test]
    fn test_years_back_uses_start_year() {
        let scope = ScopeFilter {
            years_back: Some(2),
            reference_year: Some(2025),
            ..Default::default()
        };
        assert!(scope.includes_season("2023-2024"));
        assert!(scope.includes_season("2025"));
        assert!(!scope.includes_season("2022-2023"));
        assert!(scope.includes_season("unknown"));
    }

    #[test]
    fn test_season_start_year() {
        assert_eq!(season_start_year("2024-2025"), Some(2024));
        assert_eq!(season_start_year("2022"), Some(2022));
        assert_eq!(season_start_year("24-25"), None);
    }

    #[test]
    fn test_current_season_is_explicit() {
        let scope = ScopeFilter {
            current_seasons: vec!["2024-2025".into()],
            ..Default::default()
        };
        assert!(scope.is_current_season("2024-2025"));
        assert!(!scope.is_current_season("2023-2024"));
    }
}
