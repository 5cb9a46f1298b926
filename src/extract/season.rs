//! Competition history page: one row per season.

use super::html::{
    self, body_rows, column_headers, first_link, row_cells, split_trailing_count, table_by_id,
};
use super::{ExtractContext, ExtractionResult};
use crate::pipeline::{CompetitionRef, StageId};
use crate::storage::{NaturalKey, Record};
use scraper::{ElementRef, Html};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    season: usize,
    squads: Option<usize>,
    champion: Option<usize>,
    runner_up: Option<usize>,
    top_scorer: Option<usize>,
}

impl Columns {
    /// Layout of club tournament history tables, used when the header is
    /// missing: Season, Competition, # Squads, Champion, Runner-Up, Final,
    /// Top Scorer.
    const POSITIONAL: Columns = Columns {
        season: 0,
        squads: Some(2),
        champion: Some(3),
        runner_up: Some(4),
        top_scorer: Some(6),
    };

    fn from_headers(headers: &[String]) -> Self {
        if headers.is_empty() {
            return Self::POSITIONAL;
        }
        let find = |pred: &dyn Fn(&str) -> bool| {
            headers
                .iter()
                .position(|h| pred(h.to_ascii_lowercase().as_str()))
        };
        Columns {
            season: find(&|h| h == "season" || h == "year").unwrap_or(0),
            squads: find(&|h| h.contains("squads")),
            champion: find(&|h| h == "champion"),
            runner_up: find(&|h| h.starts_with("runner")),
            top_scorer: find(&|h| h.contains("top scorer")),
        }
    }
}

pub(super) fn extract(document: &Html, ctx: &ExtractContext<'_>) -> ExtractionResult {
    let Some(competition) = ctx.competition() else {
        return ExtractionResult::warning(ctx.warning("season page has no parent competition"));
    };
    let Some(table) = table_by_id(document, "seasons") else {
        return ExtractionResult::warning(
            ctx.warning(format!("seasons table not found for {}", competition.name)),
        );
    };

    let columns = Columns::from_headers(&column_headers(table));
    let records: Vec<Record> = body_rows(table)
        .into_iter()
        .filter_map(|row| parse_row(&row_cells(row), columns, competition))
        .collect();

    log::debug!("{}: {} seasons", competition.name, records.len());
    if records.is_empty() {
        return ExtractionResult::warning(
            ctx.warning(format!("no seasons parsed for {}", competition.name)),
        );
    }
    ExtractionResult::with_records(records)
}

fn parse_row(
    cells: &[ElementRef<'_>],
    columns: Columns,
    competition: &CompetitionRef,
) -> Option<Record> {
    let (season, link) = first_link(*cells.get(columns.season)?)?;
    if season.is_empty() {
        return None;
    }
    let cell = |index: Option<usize>| {
        index
            .and_then(|i| cells.get(i))
            .and_then(|c| html::non_empty_text(*c))
    };

    let mut record = Record::new(
        StageId::Season.record_table(),
        NaturalKey::new()
            .with("competition_id", competition.id)
            .with("season", &season),
    );
    record
        .set("competition_id", competition.id)
        .set("competition_name", competition.name.as_str())
        .set("competition_type", competition.kind.as_str())
        .set("competition_last_season", competition.last_season.clone())
        .set("season", season.as_str())
        .set("season_link", link);

    let (champion, champion_points) = match cell(columns.champion) {
        Some(text) => {
            let (name, points) = split_trailing_count(&text);
            (Some(name), points)
        }
        None => (None, None),
    };
    let (top_scorers, top_goals) = match cell(columns.top_scorer) {
        Some(text) => {
            let (names, goals) = split_trailing_count(&text);
            let names: Vec<Value> = names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(Value::from)
                .collect();
            (Value::Array(names), goals)
        }
        None => (Value::Array(Vec::new()), None),
    };

    record
        .set("champion", champion)
        .set("champion_points", champion_points)
        .set("runner_up", cell(columns.runner_up))
        .set("top_scorer", top_scorers)
        .set("top_goals", top_goals)
        .set(
            "num_squads",
            cell(columns.squads).and_then(|s| html::parse_int(&s)),
        );
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_from_league_headers() {
        let headers: Vec<String> = ["Season", "Competition Name", "# Squads", "Champion", "Top Scorer"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let columns = Columns::from_headers(&headers);
        assert_eq!(columns.season, 0);
        assert_eq!(columns.squads, Some(2));
        assert_eq!(columns.champion, Some(3));
        assert_eq!(columns.runner_up, None);
        assert_eq!(columns.top_scorer, Some(4));
    }

    #[test]
    fn test_missing_header_uses_tournament_layout() {
        assert_eq!(Columns::from_headers(&[]), Columns::POSITIONAL);
    }
}
