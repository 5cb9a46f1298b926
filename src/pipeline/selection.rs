//! Input selection: turn a predecessor stage's persisted records into work
//! units for the next stage.
//!
//! Selection reads only from the record store, so any stage can be re-run on
//! its own against whatever earlier runs left behind.

use super::stage::StageId;
use super::work::{CompetitionRef, CompetitionType, FixtureRef, ParentRef, SeasonRef, WorkUnit};
use crate::config::ScopeFilter;
use crate::errors::StorageError;
use crate::extract::fixture_link_for;
use crate::signature::RequestSignature;
use crate::storage::{RecordFilter, RecordStore, StoredRecord};
use url::Url;

/// Path of the competitions index, the single seed unit.
pub const COMPETITION_INDEX_PATH: &str = "/en/comps/";

/// Work units for `stage`, in predecessor-record order.
pub fn select_units(
    stage: StageId,
    store: &dyn RecordStore,
    scope: &ScopeFilter,
    base_url: &Url,
) -> Result<Vec<WorkUnit>, StorageError> {
    let units = match stage {
        StageId::Competition => seed_units(base_url),
        StageId::Season => season_units(store, scope, base_url)?,
        StageId::ScoreTable => season_page_units(store, scope, base_url, StageId::ScoreTable)?,
        StageId::Fixture => season_page_units(store, scope, base_url, StageId::Fixture)?,
        StageId::Match => match_units(store, scope, base_url)?,
    };
    log::debug!("Selected {} {} unit(s)", units.len(), stage);
    Ok(units)
}

fn seed_units(base_url: &Url) -> Vec<WorkUnit> {
    match RequestSignature::resolve(base_url, COMPETITION_INDEX_PATH) {
        Ok(signature) => vec![WorkUnit::new(StageId::Competition, signature, ParentRef::Root)],
        Err(e) => {
            log::error!("{}", e);
            Vec::new()
        }
    }
}

/// Push the id/type parts of the scope down into the store query.
fn scope_filter(scope: &ScopeFilter) -> RecordFilter {
    RecordFilter::all()
        .one_of("competition_id", scope.competition_ids.iter().copied())
        .one_of(
            "competition_type",
            scope.competition_types.iter().map(|kind| kind.as_str()),
        )
}

fn competition_ref(record: &StoredRecord, last_season_field: &str) -> Option<CompetitionRef> {
    let id = record.u64_field("competition_id")?;
    let kind = record
        .str_field("competition_type")?
        .parse::<CompetitionType>()
        .ok()?;
    Some(CompetitionRef {
        id: u32::try_from(id).ok()?,
        name: record.str_field("competition_name").unwrap_or_default().to_string(),
        kind,
        last_season: record.str_field(last_season_field).map(str::to_string),
    })
}

fn resolve(base_url: &Url, link: &str) -> Option<RequestSignature> {
    match RequestSignature::resolve(base_url, link) {
        Ok(signature) => Some(signature),
        Err(e) => {
            log::warn!("Skipping unusable link: {}", e);
            None
        }
    }
}

fn season_units(
    store: &dyn RecordStore,
    scope: &ScopeFilter,
    base_url: &Url,
) -> Result<Vec<WorkUnit>, StorageError> {
    let records = store.query(StageId::Competition.record_table(), &scope_filter(scope))?;

    Ok(records
        .iter()
        .filter_map(|record| {
            let competition = competition_ref(record, "last_season")?;
            if !scope.matches_competition(&competition) {
                return None;
            }
            let link = record.str_field("competition_link")?;
            let signature = resolve(base_url, link)?;
            Some(WorkUnit::new(
                StageId::Season,
                signature,
                ParentRef::Competition(competition),
            ))
        })
        .collect())
}

/// Score-table and fixture units both hang off a season record; fixtures use
/// the schedule page derived from the season link.
fn season_page_units(
    store: &dyn RecordStore,
    scope: &ScopeFilter,
    base_url: &Url,
    stage: StageId,
) -> Result<Vec<WorkUnit>, StorageError> {
    let records = store.query(StageId::Season.record_table(), &scope_filter(scope))?;
    let mut units = Vec::new();

    for record in &records {
        let Some(competition) = competition_ref(record, "competition_last_season") else {
            continue;
        };
        let Some(season) = record.str_field("season") else {
            continue;
        };
        if !scope.matches_competition(&competition) || !scope.includes_season(season) {
            continue;
        }
        let Some(season_link) = record.str_field("season_link") else {
            log::warn!("No season link for {} {}", competition.name, season);
            continue;
        };

        // A national tournament still in progress has neither a final table
        // nor a complete schedule.
        if competition.kind == CompetitionType::National && scope.is_current_season(season) {
            log::info!(
                "Skipping current season of national tournament: {} {}",
                season,
                competition.name
            );
            continue;
        }

        let link = if stage == StageId::Fixture {
            fixture_link_for(season_link)
        } else {
            season_link.to_string()
        };

        let Some(signature) = resolve(base_url, &link) else {
            continue;
        };
        let parent = ParentRef::Season(SeasonRef {
            competition,
            season: season.to_string(),
        });
        units.push(WorkUnit::new(stage, signature, parent));
    }
    Ok(units)
}

fn match_units(
    store: &dyn RecordStore,
    scope: &ScopeFilter,
    base_url: &Url,
) -> Result<Vec<WorkUnit>, StorageError> {
    let records = store.query(StageId::Fixture.record_table(), &scope_filter(scope))?;

    Ok(records
        .iter()
        .filter_map(|record| {
            let link = record.str_field("match_report_link")?;
            if !link.contains("/matches/") {
                return None;
            }
            let competition = competition_ref(record, "competition_last_season")?;
            let season = record.str_field("season")?;
            if !scope.matches_competition(&competition) || !scope.includes_season(season) {
                return None;
            }
            let signature = resolve(base_url, link)?;
            let parent = ParentRef::Fixture(FixtureRef {
                season: SeasonRef {
                    competition,
                    season: season.to_string(),
                },
                date: record.str_field("date").map(str::to_string),
                home_team: record.str_field("home_team")?.to_string(),
                away_team: record.str_field("away_team")?.to_string(),
            });
            Some(WorkUnit::new(StageId::Match, signature, parent))
        })
        .collect())
}
