//! Scores-and-fixtures page of a season.

use super::html::{self, has_class, row_cells, table_by_id, TBODY_ROW, TD, TH, THEAD_ROW};
use super::{ExtractContext, ExtractionResult};
use crate::pipeline::{CompetitionRef, FixtureRef, ParentRef, SeasonRef, StageId, WorkUnit};
use crate::signature::RequestSignature;
use crate::storage::{NaturalKey, Record};
use scraper::{ElementRef, Html};
use std::collections::{BTreeMap, HashSet};

/// Schedule link for a season stats link.
///
/// `/en/comps/9/2024-2025/2024-2025-Premier-League-Stats` becomes
/// `/en/comps/9/2024-2025/schedule/2024-2025-Premier-League-Scores-and-Fixtures`.
/// Links not ending in `-Stats` are returned unchanged.
pub fn fixture_link_for(season_link: &str) -> String {
    let Some(stem) = season_link.strip_suffix("-Stats") else {
        return season_link.to_string();
    };
    let link = format!("{}-Scores-and-Fixtures", stem);
    let mut parts: Vec<&str> = link.split('/').collect();
    if parts.len() >= 5 {
        parts.insert(parts.len() - 1, "schedule");
    }
    parts.join("/")
}

/// Columns a row must have for it to be a fixture.
const ESSENTIAL: [&str; 4] = ["day", "date", "home_team", "away_team"];

/// Map header cells of the first `thead` row to field names.
fn column_mapping(table: ElementRef<'_>) -> Option<BTreeMap<&'static str, usize>> {
    let header_row = table.select(&THEAD_ROW).next()?;
    let mut mapping = BTreeMap::new();

    for (index, cell) in row_cells(header_row).into_iter().enumerate() {
        let header = html::text(cell).to_ascii_lowercase();
        let stat = cell.value().attr("data-stat").unwrap_or_default();
        let field = if header.contains("round") {
            "round"
        } else if header.contains("wk") || header.contains("week") {
            "week"
        } else if header.contains("day") {
            "day"
        } else if header.contains("date") {
            "date"
        } else if header.contains("time") {
            "time"
        } else if header.contains("home") {
            "home_team"
        } else if header.contains("xg") {
            // The score column separates the home and away xG columns.
            if stat.contains("away") || mapping.contains_key("score") {
                "away_xg"
            } else {
                "home_xg"
            }
        } else if header.contains("score") {
            "score"
        } else if header.contains("away") {
            "away_team"
        } else if header.contains("attendance") {
            "attendance"
        } else if header.contains("venue") {
            "venue"
        } else if header.contains("referee") {
            "referee"
        } else if header.contains("match") && header.contains("report") {
            "match_report"
        } else if header.contains("notes") {
            "notes"
        } else {
            continue;
        };
        mapping.entry(field).or_insert(index);
    }

    ESSENTIAL
        .iter()
        .all(|column| mapping.contains_key(column))
        .then_some(mapping)
}

fn league_tables<'a>(document: &'a Html, season: &str, competition_id: u32) -> Vec<ElementRef<'a>> {
    [
        format!("sched_{}_{}_1", season, competition_id),
        format!("sched_{}_{}", season, competition_id),
    ]
    .iter()
    .find_map(|id| table_by_id(document, id))
    .into_iter()
    .collect()
}

fn tournament_tables<'a>(
    document: &'a Html,
    season: &str,
    competition_id: u32,
) -> Vec<ElementRef<'a>> {
    if let Some(all) = table_by_id(document, "sched_all") {
        return vec![all];
    }
    ["1", "2", "3"]
        .iter()
        .filter_map(|n| table_by_id(document, &format!("sched_{}_{}_{}", season, competition_id, n)))
        .collect()
}

/// `(home, away)` goals from a score like `2–1` or `(4) 1–1 (3)`.
fn parse_score(score: &str) -> Option<(i64, i64)> {
    let mut plain = String::new();
    let mut depth = 0;
    for c in score.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 => plain.push(c),
            _ => {}
        }
    }
    let (home, away) = plain.split_once(['–', '-'])?;
    Some((home.trim().parse().ok()?, away.trim().parse().ok()?))
}

struct RowContext<'a> {
    competition: &'a CompetitionRef,
    season: &'a str,
    columns: &'a BTreeMap<&'static str, usize>,
    current_round: Option<&'a str>,
}

fn parse_row(
    row: ElementRef<'_>,
    rc: &RowContext<'_>,
    ctx: &ExtractContext<'_>,
) -> Option<Record> {
    let cells = row_cells(row);
    if rc.columns.values().any(|index| *index >= cells.len()) {
        return None;
    }
    let cell = |field: &str| rc.columns.get(field).map(|i| cells[*i]);
    let text = |field: &str| cell(field).and_then(html::non_empty_text);
    let team = |field: &str| {
        cell(field).map(|c| match html::first_link(c) {
            Some((name, link)) => (name, html::squad_id(&link)),
            None => (html::text(c), None),
        })
    };

    let day = text("day")?;
    let date = text("date")?;
    let (home_team, home_team_id) = team("home_team").filter(|(name, _)| !name.is_empty())?;
    let (away_team, away_team_id) = team("away_team").filter(|(name, _)| !name.is_empty())?;

    let round = text("round")
        .or_else(|| rc.current_round.map(str::to_string))
        .unwrap_or_else(|| rc.competition.name.clone());
    let score = text("score");
    let (home_score, away_score) = score
        .as_deref()
        .and_then(parse_score)
        .map_or((None, None), |(h, a)| (Some(h), Some(a)));
    let match_report_link = cell("match_report")
        .and_then(html::first_link)
        .map(|(_, link)| link)
        .filter(|link| !link.is_empty())
        .map(|link| ctx.absolute(&link));

    let mut record = Record::new(
        StageId::Fixture.record_table(),
        NaturalKey::new()
            .with("competition_id", rc.competition.id)
            .with("season", rc.season)
            .with("date", &date)
            .with("home_team", &home_team)
            .with("away_team", &away_team),
    );
    record
        .set("competition_id", rc.competition.id)
        .set("competition_name", rc.competition.name.as_str())
        .set("competition_type", rc.competition.kind.as_str())
        .set("competition_last_season", rc.competition.last_season.clone())
        .set("season", rc.season)
        .set("round", round)
        .set("week", text("week").and_then(|w| html::parse_int(&w)))
        .set("day", day)
        .set("date", date)
        .set("time", text("time"))
        .set("home_team", home_team)
        .set("home_team_id", home_team_id)
        .set("home_team_xg", text("home_xg").and_then(|x| html::parse_float(&x)))
        .set("score", score)
        .set("home_score", home_score)
        .set("away_score", away_score)
        .set("away_team_xg", text("away_xg").and_then(|x| html::parse_float(&x)))
        .set("away_team", away_team)
        .set("away_team_id", away_team_id)
        .set("attendance", text("attendance").and_then(|a| html::parse_int(&a)))
        .set("venue", text("venue"))
        .set("referee", text("referee"))
        .set("match_report_link", match_report_link)
        .set("notes", text("notes").unwrap_or_default());
    Some(record)
}

/// Match-report follow-up for a fixture record, when it links to a played match.
fn match_unit(record: &Record, season: &SeasonRef) -> Option<WorkUnit> {
    let link = record.get_str("match_report_link")?;
    if !link.contains("/matches/") {
        return None;
    }
    let signature = RequestSignature::parse(link).ok()?;
    let parent = ParentRef::Fixture(FixtureRef {
        season: season.clone(),
        date: record.get_str("date").map(str::to_string),
        home_team: record.get_str("home_team")?.to_string(),
        away_team: record.get_str("away_team")?.to_string(),
    });
    Some(WorkUnit::new(StageId::Match, signature, parent))
}

pub(super) fn extract(document: &Html, ctx: &ExtractContext<'_>) -> ExtractionResult {
    let (Some(competition), Some(season)) = (ctx.competition(), ctx.season()) else {
        return ExtractionResult::warning(ctx.warning("fixture page has no parent season"));
    };

    let (preferred, fallback) = if competition.kind.is_league() {
        (
            league_tables(document, season, competition.id),
            tournament_tables(document, season, competition.id),
        )
    } else {
        (
            tournament_tables(document, season, competition.id),
            league_tables(document, season, competition.id),
        )
    };
    let tables = if preferred.is_empty() { fallback } else { preferred };
    if tables.is_empty() {
        return ExtractionResult::warning(ctx.warning(format!(
            "no fixtures table found for {} {}",
            competition.name, season
        )));
    }

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for table in tables {
        let Some(columns) = column_mapping(table) else {
            log::debug!(
                "Skipping table {} without fixture columns",
                table.value().id().unwrap_or("<no id>")
            );
            continue;
        };

        let mut current_round: Option<String> = None;
        for row in table.select(&TBODY_ROW) {
            // Repeated column headers.
            if has_class(row, "thead") {
                continue;
            }
            // In tournaments, a row of header cells only announces the next round.
            if row.select(&TH).next().is_some() && row.select(&TD).next().is_none() {
                if !competition.kind.is_league() {
                    if let Some(label) = html::non_empty_text(row) {
                        current_round = Some(label);
                    }
                }
                continue;
            }

            let rc = RowContext {
                competition,
                season,
                columns: &columns,
                current_round: current_round.as_deref(),
            };
            let Some(record) = parse_row(row, &rc, ctx) else {
                continue;
            };
            let identity = format!(
                "{}_{}_{}",
                record.get_str("date").unwrap_or_default(),
                record.get_str("home_team").unwrap_or_default(),
                record.get_str("away_team").unwrap_or_default()
            );
            if seen.insert(identity) {
                records.push(record);
            }
        }
    }

    if records.is_empty() {
        return ExtractionResult::warning(ctx.warning(format!(
            "no fixtures parsed for {} {}",
            competition.name, season
        )));
    }

    let season_ref = SeasonRef {
        competition: competition.clone(),
        season: season.to_string(),
    };
    let follow_ups = records
        .iter()
        .filter_map(|record| match_unit(record, &season_ref))
        .collect();
    ExtractionResult {
        records,
        follow_ups,
        warnings: Vec::new(),
    }
}
