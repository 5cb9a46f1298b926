//! Extraction and request-signature throughput on synthetic pages.

use criterion::{criterion_group, criterion_main, Criterion};
use pitchcrawl::extract::{ExtractContext, Extractor};
use pitchcrawl::pipeline::{CompetitionRef, CompetitionType, ParentRef, SeasonRef, StageId, WorkUnit};
use pitchcrawl::signature::RequestSignature;
use pitchcrawl::testkit::pages::{self, FixtureRow};
use std::hint::black_box;
use url::Url;

fn season_unit() -> WorkUnit {
    WorkUnit::new(
        StageId::Fixture,
        RequestSignature::parse(
            "https://fbref.com/en/comps/9/2024-2025/schedule/2024-2025-Premier-League-Scores-and-Fixtures",
        )
        .unwrap(),
        ParentRef::Season(SeasonRef {
            competition: CompetitionRef {
                id: 9,
                name: "Premier League".to_string(),
                kind: CompetitionType::Domestic,
                last_season: Some("2024-2025".to_string()),
            },
            season: "2024-2025".to_string(),
        }),
    )
}

fn bench_fixture_extraction(c: &mut Criterion) {
    // A full league season: 380 fixtures.
    let rows: Vec<FixtureRow> = (0..380)
        .map(|n| {
            FixtureRow::played(
                &format!("2024-{:02}-{:02}", 8 + n / 60, 1 + n % 28),
                &format!("Home {}", n % 20),
                &format!("Away {}", n / 20),
                "2–1",
                &format!("{:08x}", n),
            )
        })
        .collect();
    let body = pages::league_fixtures(9, "2024-2025", &rows);
    let unit = season_unit();
    let base = Url::parse("https://fbref.com").unwrap();
    let ctx = ExtractContext::new(&unit, &base);

    c.bench_function("fixtures_380_rows", |b| {
        b.iter(|| Extractor::Fixtures.extract(black_box(&body), &ctx))
    });
}

fn bench_standings_extraction(c: &mut Criterion) {
    let teams: Vec<String> = (0..20).map(|n| format!("Team {}", n)).collect();
    let names: Vec<&str> = teams.iter().map(String::as_str).collect();
    let body = pages::standings(9, "2024-2025", &names);
    let mut unit = season_unit();
    unit.stage = StageId::ScoreTable;
    let base = Url::parse("https://fbref.com").unwrap();
    let ctx = ExtractContext::new(&unit, &base);

    c.bench_function("standings_20_teams", |b| {
        b.iter(|| Extractor::ScoreTable.extract(black_box(&body), &ctx))
    });
}

fn bench_signature(c: &mut Criterion) {
    let params = [("season", "2024-2025"), ("comp", "9"), ("page", "3"), ("sort", "date")];
    c.bench_function("signature_with_params", |b| {
        b.iter(|| {
            RequestSignature::with_params(
                black_box("https://FBREF.com/en/comps/9/schedule/?x=1#top"),
                params,
            )
            .map(|sig| sig.cache_key())
        })
    });
}

criterion_group!(
    benches,
    bench_fixture_extraction,
    bench_standings_extraction,
    bench_signature
);
criterion_main!(benches);
