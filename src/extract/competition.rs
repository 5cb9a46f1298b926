//! Competition index (`/en/comps/`).

use super::html::{self, body_rows, first_link, row_cells, table_by_id, LINK};
use super::{ExtractContext, ExtractionResult};
use crate::pipeline::{CompetitionType, StageId};
use crate::storage::{NaturalKey, Record};
use scraper::{ElementRef, Html};
use serde_json::{json, Value};

/// Index tables and the competition type each one lists.
const TABLES: [(&str, CompetitionType); 3] = [
    ("comps_1_fa_club_league_senior", CompetitionType::Domestic),
    ("comps_intl_club_cup", CompetitionType::International),
    ("comps_intl_fa_nonqualifier_senior", CompetitionType::National),
];

/// Rows shorter than this are section labels, not competitions.
const MIN_CELLS: usize = 6;

pub(super) fn extract(document: &Html, ctx: &ExtractContext<'_>) -> ExtractionResult {
    let mut records = Vec::new();
    let mut missing = Vec::new();

    for (table_id, kind) in TABLES {
        let Some(table) = table_by_id(document, table_id) else {
            missing.push(table_id);
            continue;
        };
        let before = records.len();
        records.extend(
            body_rows(table)
                .into_iter()
                .map(row_cells)
                .filter(|cells| cells.len() >= MIN_CELLS)
                .filter_map(|cells| parse_row(&cells, kind)),
        );
        log::debug!("{}: {} competitions", table_id, records.len() - before);
    }

    if records.is_empty() {
        return ExtractionResult::warning(ctx.warning(format!(
            "no competitions found (missing tables: {})",
            missing.join(", ")
        )));
    }

    let mut result = ExtractionResult::with_records(records);
    if !missing.is_empty() {
        result
            .warnings
            .push(ctx.warning(format!("missing tables: {}", missing.join(", "))));
    }
    result
}

fn parse_row(cells: &[ElementRef<'_>], kind: CompetitionType) -> Option<Record> {
    let (name, link) = first_link(cells[0])?;
    let id = html::competition_id(&link)?;
    let cell = |index: usize| cells.get(index).map(|c| html::text(*c));

    let mut record = Record::new(
        StageId::Competition.record_table(),
        NaturalKey::new().with("competition_id", id),
    );
    record
        .set("competition_id", id)
        .set("competition_name", name)
        .set("competition_link", link)
        .set("competition_type", kind.as_str())
        .set("gender", cell(1));

    match kind {
        CompetitionType::Domestic => {
            // The country cell may hold a flag link before the country link.
            let country = cells[2]
                .select(&LINK)
                .last()
                .map(html::text)
                .or_else(|| cell(2));
            record
                .set("country", country)
                .set("governing_body", Value::Null)
                .set("tier", "1st")
                .set("first_season", cell(3))
                .set("last_season", cell(4))
                .set("awards", awards(cells.get(5).copied()));
        }
        CompetitionType::International | CompetitionType::National => {
            record
                .set("country", Value::Null)
                .set("governing_body", cell(2))
                .set("first_season", cell(3))
                .set("last_season", cell(4))
                .set("tier", cell(5).unwrap_or_default())
                .set("awards", awards(cells.get(6).copied()));
        }
    }
    Some(record)
}

fn awards(cell: Option<ElementRef<'_>>) -> Value {
    let awards: Vec<Value> = cell
        .into_iter()
        .flat_map(|cell| cell.select(&LINK))
        .filter_map(|a| {
            let name = html::text(a);
            let link = a.value().attr("href").unwrap_or_default();
            (!name.is_empty() && !link.is_empty())
                .then(|| json!({"award_name": name, "award_link": link}))
        })
        .collect();
    Value::Array(awards)
}
