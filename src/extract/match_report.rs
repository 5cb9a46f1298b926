//! Match report page: scorebox, lineups, event timeline and team stats.

use super::html::{self, first_link, row_cells, selector, LINK, ROW};
use super::{ExtractContext, ExtractionResult};
use crate::pipeline::StageId;
use crate::storage::{NaturalKey, Record};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Map, Value};

static SCOREBOX: Lazy<Selector> = Lazy::new(|| selector("div.scorebox"));
static SCOREBOX_META: Lazy<Selector> = Lazy::new(|| selector("div.scorebox_meta"));
static TEAM_NAME: Lazy<Selector> = Lazy::new(|| selector("strong a"));
static SCORE: Lazy<Selector> = Lazy::new(|| selector("div.score"));
static DATAPOINT: Lazy<Selector> = Lazy::new(|| selector("div.datapoint"));
static LINEUP: Lazy<Selector> = Lazy::new(|| selector("div.lineup"));
static EVENT: Lazy<Selector> = Lazy::new(|| selector("div#events_wrap div.event"));
static EVENT_ICON: Lazy<Selector> = Lazy::new(|| selector("div.event_icon"));
static DIV: Lazy<Selector> = Lazy::new(|| selector("div"));
static SPAN: Lazy<Selector> = Lazy::new(|| selector("span"));
static SMALL: Lazy<Selector> = Lazy::new(|| selector("small"));
static TEAM_STATS_TABLE: Lazy<Selector> = Lazy::new(|| selector("div#team_stats table"));
static TEAM_STATS_EXTRA: Lazy<Selector> = Lazy::new(|| selector("div#team_stats_extra"));

static MINUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\+\d*)?'?)").expect("minute pattern"));
static PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("percent pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Home,
    Away,
}

impl Side {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
        }
    }
}

pub(super) fn extract(document: &Html, ctx: &ExtractContext<'_>) -> ExtractionResult {
    let Some(match_id) = html::match_id(ctx.url()) else {
        return ExtractionResult::warning(ctx.warning("match id not found in link"));
    };

    let teams = scorebox_teams(document);
    let meta = scorebox_meta(document);
    let (home_lineup, away_lineup) = lineups(document);
    let events = events(document);
    let team_stats = team_stats(document);

    if teams.is_empty() && home_lineup.is_empty() && away_lineup.is_empty() && events.is_empty() {
        return ExtractionResult::warning(ctx.warning(format!(
            "no scorebox, lineups or events on match {}",
            match_id
        )));
    }

    let mut record = Record::new(
        StageId::Match.record_table(),
        NaturalKey::new().with("match_id", &match_id),
    );
    record
        .set("match_id", match_id)
        .set("match_link", ctx.url());

    if let Some(competition) = ctx.competition() {
        record
            .set("competition_id", competition.id)
            .set("competition_name", competition.name.as_str());
    }
    record.set("season", ctx.season());

    let fixture = match &ctx.unit.parent {
        crate::pipeline::ParentRef::Fixture(fixture) => Some(fixture),
        _ => None,
    };
    record.set("date", fixture.and_then(|f| f.date.clone()));

    for (index, side) in [Side::Home, Side::Away].into_iter().enumerate() {
        let prefix = side.as_str();
        let team = teams.get(index);
        let fallback_name = fixture.map(|f| match side {
            Side::Home => f.home_team.clone(),
            Side::Away => f.away_team.clone(),
        });
        record
            .set(
                &format!("{}_team", prefix),
                team.and_then(|t| t.name.clone()).or(fallback_name),
            )
            .set(
                &format!("{}_team_id", prefix),
                team.and_then(|t| t.id.clone()),
            )
            .set(&format!("{}_score", prefix), team.and_then(|t| t.score))
            .set(
                &format!("{}_manager", prefix),
                team.and_then(|t| t.manager.clone()),
            )
            .set(
                &format!("{}_captain", prefix),
                team.and_then(|t| t.captain.clone()),
            );
    }

    record
        .set("venue", meta.venue)
        .set("attendance", meta.attendance)
        .set("referee", meta.referee)
        .set("officials", Value::from(meta.officials))
        .set("home_lineup", Value::Array(home_lineup))
        .set("away_lineup", Value::Array(away_lineup))
        .set("events", Value::Array(events))
        .set("team_stats", team_stats);

    ExtractionResult::with_records(vec![record])
}

#[derive(Debug, Default)]
struct TeamBox {
    name: Option<String>,
    id: Option<String>,
    score: Option<i64>,
    manager: Option<String>,
    captain: Option<String>,
}

/// The two team blocks of the scorebox, home first.
fn scorebox_teams(document: &Html) -> Vec<TeamBox> {
    let Some(scorebox) = document.select(&SCOREBOX).next() else {
        return Vec::new();
    };
    scorebox
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "div" && !html::has_class(*child, "scorebox_meta"))
        .take(2)
        .map(|block| {
            let mut team = TeamBox::default();
            if let Some(link) = block.select(&TEAM_NAME).next() {
                team.name = html::non_empty_text(link);
                team.id = link.value().attr("href").and_then(html::squad_id);
            }
            team.score = block
                .select(&SCORE)
                .next()
                .and_then(|s| html::parse_int(&html::text(s)));
            for datapoint in block.select(&DATAPOINT) {
                let text = html::text(datapoint);
                let Some((label, value)) = text.split_once(':') else {
                    continue;
                };
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                match label.trim() {
                    "Manager" => team.manager = value,
                    "Captain" => team.captain = value,
                    _ => {}
                }
            }
            team
        })
        .collect()
}

#[derive(Debug, Default)]
struct MatchMeta {
    venue: Option<String>,
    attendance: Option<i64>,
    referee: Option<String>,
    officials: Vec<String>,
}

fn scorebox_meta(document: &Html) -> MatchMeta {
    let mut meta = MatchMeta::default();
    let Some(block) = document.select(&SCOREBOX_META).next() else {
        return meta;
    };
    for line in block.children().filter_map(ElementRef::wrap) {
        let text = html::text(line);
        let Some((label, value)) = text.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match label.trim() {
            "Venue" => meta.venue = Some(value.to_string()).filter(|v| !v.is_empty()),
            "Attendance" => meta.attendance = html::parse_int(value),
            "Officials" => {
                meta.officials = value
                    .split('·')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect();
                meta.referee = meta
                    .officials
                    .iter()
                    .find_map(|o| o.strip_suffix("(Referee)"))
                    .map(|name| name.trim().to_string());
            }
            _ => {}
        }
    }
    meta
}

/// `(home, away)` players; each entry carries whether the player started.
fn lineups(document: &Html) -> (Vec<Value>, Vec<Value>) {
    let mut home = Vec::new();
    let mut away = Vec::new();

    for lineup in document.select(&LINEUP) {
        let side = match lineup.value().id() {
            Some("a") => &mut home,
            Some("b") => &mut away,
            _ => continue,
        };
        let mut starter = true;
        for row in lineup.select(&ROW) {
            let cells = row_cells(row);
            if cells.len() == 1 && html::text(cells[0]).contains("Bench") {
                starter = false;
                continue;
            }
            if cells.len() < 2 || cells[0].value().name() != "td" {
                continue;
            }
            let Some((name, link)) = first_link(cells[1]) else {
                continue;
            };
            side.push(json!({
                "number": html::non_empty_text(cells[0]),
                "name": name,
                "player_id": html::player_id(&link),
                "starter": starter,
            }));
        }
    }
    (home, away)
}

fn event_kind(event: ElementRef<'_>) -> Option<&'static str> {
    let icon = event.select(&EVENT_ICON).next()?;
    let classes: Vec<&str> = icon.value().classes().collect();
    [
        ("own_goal", "Own Goal"),
        ("penalty_goal", "Penalty Goal"),
        ("goal", "Goal"),
        ("yellow_red_card", "Second Yellow Card"),
        ("yellow_card", "Yellow Card"),
        ("red_card", "Red Card"),
        ("substitute_in", "Substitute"),
        ("substitute_out", "Substitute"),
    ]
    .iter()
    .find(|(class, _)| classes.contains(class))
    .map(|(_, kind)| *kind)
}

fn events(document: &Html) -> Vec<Value> {
    document
        .select(&EVENT)
        .filter_map(|event| {
            let kind = event_kind(event)?;
            let header = event.select(&DIV).next()?;
            let minute = MINUTE
                .captures(&html::text(header))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())?;
            let score = header.select(&SPAN).next().and_then(html::non_empty_text);
            let team = if html::has_class(event, "b") {
                Side::Away
            } else {
                Side::Home
            };

            let players: Vec<String> = event.select(&LINK).map(html::text).collect();
            let (player, substitute_for) = match kind {
                "Substitute" => (players.first().cloned(), players.get(1).cloned()),
                _ => (players.first().cloned(), None),
            };
            let assist = event
                .select(&SMALL)
                .map(html::text)
                .find_map(|t| t.split_once("Assist:").map(|(_, name)| name.trim().to_string()))
                .filter(|name| !name.is_empty());

            Some(json!({
                "minute": minute,
                "score": score,
                "event": kind,
                "team": team.as_str(),
                "player": player,
                "assist_player": assist,
                "substitute_for": substitute_for,
            }))
        })
        .collect()
}

fn map_stat_name(name: &str) -> Option<&'static str> {
    let mapped = match name.trim().to_ascii_lowercase().as_str() {
        "possession" => "possession%",
        "passing accuracy" => "passing_accuracy%",
        "shots on target" => "shots_on_target%",
        "saves" => "saves%",
        "cards" => "cards",
        "fouls" => "fouls",
        "corners" => "corners",
        "crosses" => "crosses",
        "touches" => "touches",
        "tackles" => "tackles",
        "interceptions" => "interceptions",
        "aerials won" => "aerials_won",
        "clearances" => "clearances",
        "offsides" => "offsides",
        "goal kicks" => "goal_kicks",
        "throw ins" => "throw_ins",
        "long balls" => "long_balls",
        _ => return None,
    };
    Some(mapped)
}

/// Percentage stats keep only the percentage (`"290 of 381 — 76%"` is 76).
fn parse_stat_value(text: &str, stat: &str) -> Value {
    if stat.ends_with('%') {
        return PERCENT
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map_or(Value::Null, Value::from);
    }
    if let Some(n) = html::parse_int(text) {
        return Value::from(n);
    }
    html::parse_float(text).map_or_else(|| Value::from(text), Value::from)
}

fn team_stats(document: &Html) -> Value {
    let mut home = Map::new();
    let mut away = Map::new();

    if let Some(table) = document.select(&TEAM_STATS_TABLE).next() {
        let mut current: Option<&'static str> = None;
        // The first row names the teams.
        for row in table.select(&ROW).skip(1) {
            let cells = row_cells(row);
            match cells.as_slice() {
                [label] => current = map_stat_name(&html::text(*label)),
                [h, a] => {
                    let (h, a) = (html::text(*h), html::text(*a));
                    if let Some(stat) = current.take() {
                        if !h.is_empty() && !a.is_empty() {
                            home.insert(stat.to_string(), parse_stat_value(&h, stat));
                            away.insert(stat.to_string(), parse_stat_value(&a, stat));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    if let Some(extra) = document.select(&TEAM_STATS_EXTRA).next() {
        for group in extra.children().filter_map(ElementRef::wrap) {
            let texts: Vec<String> = group
                .children()
                .filter_map(ElementRef::wrap)
                .map(html::text)
                .filter(|t| !t.is_empty())
                .collect();
            // Leading team names, then (home, stat, away) triples.
            for triple in texts.get(2..).unwrap_or_default().chunks_exact(3) {
                let Some(stat) = map_stat_name(&triple[1]) else {
                    continue;
                };
                home.insert(stat.to_string(), parse_stat_value(&triple[0], stat));
                away.insert(stat.to_string(), parse_stat_value(&triple[2], stat));
            }
        }
    }

    json!({"home": home, "away": away})
}
