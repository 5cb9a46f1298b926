// Shared helpers for pitchcrawl integration tests
#![allow(dead_code)]

use pitchcrawl::cache::RequestCache;
use pitchcrawl::config::RetryConfig;
use pitchcrawl::extract::fixture_link_for;
use pitchcrawl::fetch::Fetcher;
use pitchcrawl::testkit::pages::{self, FixtureRow};
use pitchcrawl::testkit::ScriptedTransport;
use std::sync::Arc;
use std::time::Duration;

pub const BASE: &str = "https://fbref.com";
pub const INDEX: &str = "https://fbref.com/en/comps/";
pub const LEAGUE_ID: u32 = 9;
pub const LEAGUE: &str = "Premier League";
pub const TEAMS: [&str; 3] = ["Liverpool", "Arsenal", "Chelsea"];

pub fn absolute(link: &str) -> String {
    format!("{}{}", BASE, link)
}

pub fn history_url() -> String {
    absolute(&pages::history_link(LEAGUE_ID, LEAGUE))
}

pub fn season_url(season: &str) -> String {
    absolute(&pages::season_link(LEAGUE_ID, LEAGUE, season))
}

pub fn fixtures_url(season: &str) -> String {
    absolute(&fixture_link_for(&pages::season_link(LEAGUE_ID, LEAGUE, season)))
}

/// Fixture rows per season: two played and one upcoming in the current
/// season, one played in the previous one.
pub fn fixture_rows(season: &str) -> Vec<FixtureRow> {
    match season {
        "2024-2025" => vec![
            FixtureRow::played("2024-08-17", "Liverpool", "Arsenal", "2–0", "a1b2c3d4"),
            FixtureRow::played("2024-08-24", "Chelsea", "Liverpool", "1–1", "b2c3d4e5"),
            FixtureRow::upcoming("2025-05-25", "Arsenal", "Chelsea"),
        ],
        _ => vec![FixtureRow::played(
            "2023-08-12",
            "Arsenal",
            "Liverpool",
            "0–3",
            "c3d4e5f6",
        )],
    }
}

pub const SEASONS: [&str; 2] = ["2024-2025", "2023-2024"];

/// A transport scripted with every page of one league over two seasons.
pub fn scripted_league() -> ScriptedTransport {
    let mut transport = ScriptedTransport::new()
        .with_page(
            INDEX,
            pages::competition_index(&[(LEAGUE_ID, LEAGUE, SEASONS[0])], &[], &[]),
        )
        .with_page(
            &history_url(),
            pages::season_history(LEAGUE_ID, LEAGUE, &SEASONS),
        );

    for season in SEASONS {
        let rows = fixture_rows(season);
        transport = transport
            .with_page(
                &season_url(season),
                pages::standings(LEAGUE_ID, season, &TEAMS),
            )
            .with_page(
                &fixtures_url(season),
                pages::league_fixtures(LEAGUE_ID, season, &rows),
            );
        for row in &rows {
            if let Some(url) = row.match_url(BASE) {
                transport = transport.with_page(&url, pages::match_report(&row.home, &row.away, 2, 0));
            }
        }
    }
    transport
}

/// Every match report address in [`scripted_league`].
pub fn match_urls() -> Vec<String> {
    SEASONS
        .iter()
        .flat_map(|season| fixture_rows(season))
        .filter_map(|row| row.match_url(BASE))
        .collect()
}

pub fn fetcher(transport: &Arc<ScriptedTransport>, cache: Arc<dyn RequestCache>) -> Fetcher {
    Fetcher::new(transport.clone(), cache, Duration::ZERO, RetryConfig::disabled())
}
