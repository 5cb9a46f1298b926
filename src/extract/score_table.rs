//! Overall standings table of a season page.

use super::html::{self, body_rows, column_headers, first_link, row_cells, TABLE};
use super::{ExtractContext, ExtractionResult};
use crate::pipeline::StageId;
use crate::storage::{NaturalKey, Record};
use scraper::{ElementRef, Html};
use serde_json::Value;
use std::collections::HashMap;

/// Table id suffixes the site uses for the overall table, tried in order.
const OVERALL_ID_SUFFIXES: [&str; 6] = ["", "1", "2", "11", "12", "12A"];

/// Header text to field name.
fn normalize_header(header: &str) -> String {
    let lower = header.trim().to_ascii_lowercase();
    let field = match lower.as_str() {
        "rk" => "rank",
        "squad" => "team",
        "mp" => "matches_played",
        "w" => "wins",
        "d" => "draws",
        "l" => "losses",
        "gf" => "goals_for",
        "ga" => "goals_against",
        "gd" => "goal_difference",
        "pts" => "points",
        "pts/mp" => "points_per_match_played",
        "xg" => "expected_goals",
        "xga" => "expected_goals_allowed",
        "xgd" => "expected_goals_difference",
        "xgd/90" => "expected_goals_difference_per_90_minutes",
        "attendance" => "attendance",
        "top team scorer" => "top_team_scorer",
        "goalkeeper" => "goalkeeper",
        "notes" => "notes",
        _ => return lower,
    };
    field.to_string()
}

/// Numeric rank, or the stage a knockout team went out in.
fn parse_rank(text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        return Value::Null;
    }
    if let Ok(rank) = text.parse::<u32>() {
        return Value::from(rank);
    }
    match text {
        "W" => Value::from(1),
        "F" => Value::from(2),
        "SF" => Value::from("semi-final"),
        "QF" => Value::from("quarter-final"),
        "R16" => Value::from("round of 16"),
        "R32" => Value::from("round of 32"),
        "KO" => Value::from("knockout"),
        "GR" => Value::from("group stage"),
        "GR1" => Value::from("first group stage"),
        "GR2" => Value::from("second group stage"),
        "Rd1" => Value::from("first round"),
        "Rd2" => Value::from("second round"),
        "Lg" => Value::from("league stage"),
        other => Value::from(other),
    }
}

const INT_FIELDS: [&str; 8] = [
    "matches_played",
    "wins",
    "draws",
    "losses",
    "goals_for",
    "goals_against",
    "goal_difference",
    "points",
];

const FLOAT_FIELDS: [&str; 5] = [
    "points_per_match_played",
    "expected_goals",
    "expected_goals_allowed",
    "expected_goals_difference",
    "expected_goals_difference_per_90_minutes",
];

fn find_overall_table<'a>(document: &'a Html, competition_id: u32) -> Option<ElementRef<'a>> {
    let by_headers = document.select(&TABLE).find(|table| {
        let headers = column_headers(*table);
        headers.iter().any(|h| h.contains("Top Team Scorer"))
            && headers.iter().any(|h| h.contains("Goalkeeper"))
    });
    if by_headers.is_some() {
        return by_headers;
    }

    let by_id = OVERALL_ID_SUFFIXES.iter().find_map(|suffix| {
        html::table_by_id(
            document,
            &format!("results{}{}_overall", competition_id, suffix),
        )
    });
    if by_id.is_some() {
        return by_id;
    }

    document.select(&TABLE).find(|table| {
        table.value().id().is_some_and(|id| {
            let id = id.to_ascii_lowercase();
            id.contains("results") && id.contains("overall")
        })
    })
}

pub(super) fn extract(document: &Html, ctx: &ExtractContext<'_>) -> ExtractionResult {
    let (Some(competition), Some(season)) = (ctx.competition(), ctx.season()) else {
        return ExtractionResult::warning(ctx.warning("standings page has no parent season"));
    };
    let Some(table) = find_overall_table(document, competition.id) else {
        return ExtractionResult::warning(ctx.warning(format!(
            "overall table not found for {} {}",
            competition.name, season
        )));
    };
    if let Some(id) = table.value().id() {
        log::debug!("Using standings table {}", id);
    }

    let columns: HashMap<String, usize> = column_headers(table)
        .iter()
        .enumerate()
        .map(|(index, header)| (normalize_header(header), index))
        .filter(|(field, _)| !field.is_empty())
        .collect();

    let records: Vec<Record> = body_rows(table)
        .into_iter()
        .filter_map(|row| {
            let cells = row_cells(row);
            let read = |field: &str| {
                columns
                    .get(field)
                    .and_then(|i| cells.get(*i))
                    .map(|c| html::text(*c))
            };

            let team_cell = columns
                .get("team")
                .and_then(|i| cells.get(*i))
                .or_else(|| cells.get(1))?;
            let (team, team_link) =
                first_link(*team_cell).unwrap_or_else(|| (html::text(*team_cell), String::new()));
            if team.is_empty() {
                return None;
            }

            let mut record = Record::new(
                StageId::ScoreTable.record_table(),
                NaturalKey::new()
                    .with("competition_id", competition.id)
                    .with("season", season)
                    .with("team", &team),
            );
            record
                .set("competition_id", competition.id)
                .set("competition_name", competition.name.as_str())
                .set("season", season)
                .set(
                    "rank",
                    parse_rank(&read("rank").unwrap_or_else(|| {
                        cells.first().map(|c| html::text(*c)).unwrap_or_default()
                    })),
                )
                .set("team", team.as_str())
                .set("team_id", html::squad_id(&team_link))
                .set("team_link", team_link.as_str());

            for field in INT_FIELDS {
                record.set(field, read(field).and_then(|t| html::parse_int(&t)));
            }
            for field in FLOAT_FIELDS {
                record.set(field, read(field).and_then(|t| html::parse_float(&t)));
            }
            if let Some(attendance) = read("attendance") {
                record.set("attendance", html::parse_int(&attendance));
            }
            if let Some(scorer) = read("top_team_scorer").filter(|s| !s.is_empty()) {
                let (name, goals) = html::split_trailing_count(&scorer);
                record
                    .set("top_team_scorer", name)
                    .set("top_team_scorer_goals", goals);
            }
            for field in ["goalkeeper", "notes"] {
                if let Some(value) = read(field) {
                    record.set(field, value);
                }
            }
            Some(record)
        })
        .collect();

    if records.is_empty() {
        return ExtractionResult::warning(ctx.warning(format!(
            "standings table for {} {} has no team rows",
            competition.name, season
        )));
    }
    ExtractionResult::with_records(records)
}
