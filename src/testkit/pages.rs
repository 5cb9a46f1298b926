//! Minimal HTML documents shaped like the site's pages.
//!
//! Each builder produces only the markup the matching extractor reads, so
//! tests can script a [`ScriptedTransport`](super::ScriptedTransport) with
//! pages that parse into a known number of records.

/// Squad ids on the site are short hex strings; derive a stable one per name.
pub fn squad_id(team: &str) -> String {
    team.bytes().take(4).map(|b| format!("{:02x}", b)).collect()
}

fn slug(name: &str) -> String {
    name.replace(' ', "-")
}

/// Site-relative history link used by [`competition_index`].
pub fn history_link(id: u32, name: &str) -> String {
    format!("/en/comps/{}/history/{}-Seasons", id, slug(name))
}

/// Site-relative season stats link used by [`season_history`].
pub fn season_link(id: u32, name: &str, season: &str) -> String {
    format!("/en/comps/{}/{}/{}-{}-Stats", id, season, season, slug(name))
}

/// `(id, name, last_season)` of one listed competition.
pub type CompetitionEntry<'a> = (u32, &'a str, &'a str);

fn competition_table(id: &str, rows: &[CompetitionEntry<'_>], club_league: bool) -> String {
    let body: String = rows
        .iter()
        .map(|(comp_id, name, last)| {
            let middle = if club_league {
                r#"<td><a href="/en/country/ENG/">eng</a> <a href="/en/country/ENG/">England</a></td>"#
                    .to_string()
            } else {
                "<td>UEFA</td>".to_string()
            };
            let tier = if club_league { "" } else { "<td></td>" };
            format!(
                r#"<tr><th><a href="{link}">{name}</a></th><td>M</td>{middle}<td>1992-1993</td><td>{last}</td>{tier}<td><a href="/en/players/abc123/Top-Scorer">Golden Boot</a></td></tr>"#,
                link = history_link(*comp_id, name),
                name = name,
                middle = middle,
                last = last,
                tier = tier,
            )
        })
        .collect();
    format!(
        r#"<table id="{id}"><thead><tr><th>Competition Name</th><th>Gender</th><th>Country</th><th>First Season</th><th>Last Season</th><th>Awards</th></tr></thead><tbody><tr class="spacer"><td></td></tr>{body}</tbody></table>"#,
        id = id,
        body = body,
    )
}

/// The competitions index with the three classified tables.
pub fn competition_index(
    domestic: &[CompetitionEntry<'_>],
    international: &[CompetitionEntry<'_>],
    national: &[CompetitionEntry<'_>],
) -> String {
    format!(
        "<html><body>{}{}{}</body></html>",
        competition_table("comps_1_fa_club_league_senior", domestic, true),
        competition_table("comps_intl_club_cup", international, false),
        competition_table("comps_intl_fa_nonqualifier_senior", national, false),
    )
}

/// A competition history page listing `seasons`, newest first as given.
pub fn season_history(id: u32, name: &str, seasons: &[&str]) -> String {
    let body: String = seasons
        .iter()
        .map(|season| {
            format!(
                r#"<tr><th><a href="{link}">{season}</a></th><td>{name}</td><td>20</td><td><a href="/en/squads/{champ_id}/Liverpool-Stats">Liverpool</a> - 84</td><td>Arsenal</td><td>Erling Haaland, Mohamed Salah - 29</td></tr>"#,
                link = season_link(id, name, season),
                season = season,
                name = name,
                champ_id = squad_id("Liverpool"),
            )
        })
        .collect();
    format!(
        r#"<html><body><table id="seasons"><thead><tr><th>Season</th><th>Competition Name</th><th># Squads</th><th>Champion</th><th>Runner-Up</th><th>Top Scorer</th></tr></thead><tbody>{}</tbody></table></body></html>"#,
        body
    )
}

/// Season page carrying an overall standings table for `teams`, in rank order.
pub fn standings(id: u32, season: &str, teams: &[&str]) -> String {
    let body: String = teams
        .iter()
        .enumerate()
        .map(|(index, team)| {
            let points = 90 - index as i64 * 3;
            format!(
                r#"<tr><th>{rank}</th><td><a href="/en/squads/{squad}/{slug}-Stats">{team}</a></td><td>38</td><td>25</td><td>9</td><td>4</td><td>86</td><td>41</td><td>+45</td><td>{points}</td><td>2.21</td><td>82.2</td><td>38.1</td><td>+44.1</td><td>+1.16</td><td>60,312</td><td>Mohamed Salah - 29</td><td>Alisson</td><td></td></tr>"#,
                rank = index + 1,
                squad = squad_id(team),
                slug = slug(team),
                team = team,
                points = points,
            )
        })
        .collect();
    format!(
        r#"<html><body><table id="results{season}{id}1_overall"><thead><tr><th>Rk</th><th>Squad</th><th>MP</th><th>W</th><th>D</th><th>L</th><th>GF</th><th>GA</th><th>GD</th><th>Pts</th><th>Pts/MP</th><th>xG</th><th>xGA</th><th>xGD</th><th>xGD/90</th><th>Attendance</th><th>Top Team Scorer</th><th>Goalkeeper</th><th>Notes</th></tr></thead><tbody>{body}</tbody></table></body></html>"#,
        season = season,
        id = id,
        body = body,
    )
}

/// One scheduled or played fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureRow {
    pub date: String,
    pub home: String,
    pub away: String,
    pub score: Option<String>,
    pub match_id: Option<String>,
}

impl FixtureRow {
    pub fn played(date: &str, home: &str, away: &str, score: &str, match_id: &str) -> Self {
        Self {
            date: date.to_string(),
            home: home.to_string(),
            away: away.to_string(),
            score: Some(score.to_string()),
            match_id: Some(match_id.to_string()),
        }
    }

    pub fn upcoming(date: &str, home: &str, away: &str) -> Self {
        Self {
            date: date.to_string(),
            home: home.to_string(),
            away: away.to_string(),
            score: None,
            match_id: None,
        }
    }

    /// Absolute match report address as the fixture extractor stores it.
    pub fn match_url(&self, base_url: &str) -> Option<String> {
        self.match_id
            .as_ref()
            .map(|id| format!("{}{}", base_url.trim_end_matches('/'), self.report_path(id)))
    }

    fn report_path(&self, match_id: &str) -> String {
        format!("/en/matches/{}/{}-{}", match_id, slug(&self.home), slug(&self.away))
    }

    fn to_html(&self, week: usize) -> String {
        let report = match &self.match_id {
            Some(id) => format!(r#"<a href="{}">Match Report</a>"#, self.report_path(id)),
            None => format!(
                r#"<a href="/en/stathead/matchup/teams/{}/{}">Head-to-Head</a>"#,
                squad_id(&self.home),
                squad_id(&self.away)
            ),
        };
        format!(
            r#"<tr><th>{week}</th><td>Sat</td><td>{date}</td><td>15:00</td><td><a href="/en/squads/{home_id}/{home_slug}-Stats">{home}</a></td><td>1.8</td><td>{score}</td><td>0.9</td><td><a href="/en/squads/{away_id}/{away_slug}-Stats">{away}</a></td><td>52,000</td><td>Anfield</td><td>Anthony Taylor</td><td>{report}</td><td></td></tr>"#,
            week = week,
            date = self.date,
            home_id = squad_id(&self.home),
            home_slug = slug(&self.home),
            home = self.home,
            score = self.score.as_deref().unwrap_or_default(),
            away_id = squad_id(&self.away),
            away_slug = slug(&self.away),
            away = self.away,
            report = report,
        )
    }
}

/// League schedule page (`sched_<season>_<id>_1`). A repeated header row and
/// a spacer row are included the way the site interleaves them.
pub fn league_fixtures(id: u32, season: &str, rows: &[FixtureRow]) -> String {
    let mut body = String::new();
    for (index, row) in rows.iter().enumerate() {
        if index > 0 && index % 2 == 0 {
            body.push_str(r#"<tr class="thead"><th>Wk</th><th>Day</th><th>Date</th></tr>"#);
            body.push_str(r#"<tr class="spacer"><td colspan="14"></td></tr>"#);
        }
        body.push_str(&row.to_html(index + 1));
    }
    format!(
        r#"<html><body><table id="sched_{season}_{id}_1">{head}<tbody>{body}</tbody></table></body></html>"#,
        season = season,
        id = id,
        head = FIXTURE_HEAD,
        body = body,
    )
}

/// Tournament schedule page (`sched_all`) with round header rows.
pub fn tournament_fixtures(rounds: &[(&str, Vec<FixtureRow>)]) -> String {
    let mut body = String::new();
    for (round, rows) in rounds {
        body.push_str(&format!(r#"<tr><th colspan="14">{}</th></tr>"#, round));
        for row in rows {
            body.push_str(&row.to_html(0).replacen("<th>0</th>", "<th></th>", 1));
        }
    }
    format!(
        r#"<html><body><table id="sched_all">{}<tbody>{}</tbody></table></body></html>"#,
        FIXTURE_HEAD, body
    )
}

const FIXTURE_HEAD: &str = r#"<thead><tr><th>Wk</th><th>Day</th><th>Date</th><th>Time</th><th>Home</th><th data-stat="home_xg">xG</th><th>Score</th><th data-stat="away_xg">xG</th><th>Away</th><th>Attendance</th><th>Venue</th><th>Referee</th><th>Match Report</th><th>Notes</th></tr></thead>"#;

/// Match report with a scorebox, both lineups, three events and team stats.
pub fn match_report(home: &str, away: &str, home_score: u32, away_score: u32) -> String {
    format!(
        r#"<html><body>
<div class="scorebox">
  <div><strong><a href="/en/squads/{home_id}/{home_slug}-Stats">{home}</a></strong><div class="scores"><div class="score">{home_score}</div></div><div class="datapoint"><strong>Manager</strong>: Arne Slot</div><div class="datapoint"><strong>Captain</strong>: Virgil van Dijk</div></div>
  <div><strong><a href="/en/squads/{away_id}/{away_slug}-Stats">{away}</a></strong><div class="scores"><div class="score">{away_score}</div></div><div class="datapoint"><strong>Manager</strong>: Marco Silva</div></div>
  <div class="scorebox_meta">
    <div><strong>Venue</strong>: Anfield, Liverpool</div>
    <div><strong>Attendance</strong>: 60,312</div>
    <div><strong>Officials</strong>: Anthony Taylor (Referee) · Gary Beswick (AR1)</div>
  </div>
</div>
<div class="lineup" id="a"><table>
  <tr><th colspan="2">{home} (4-3-3)</th></tr>
  <tr><td>1</td><td><a href="/en/players/1467af0d/Alisson">Alisson</a></td></tr>
  <tr><td>11</td><td><a href="/en/players/e342ad68/Mohamed-Salah">Mohamed Salah</a></td></tr>
  <tr><th colspan="2">Bench</th></tr>
  <tr><td>9</td><td><a href="/en/players/4d77b365/Darwin-Nunez">Darwin Núñez</a></td></tr>
</table></div>
<div class="lineup" id="b"><table>
  <tr><th colspan="2">{away} (4-2-3-1)</th></tr>
  <tr><td>1</td><td><a href="/en/players/9bf2f7ae/Bernd-Leno">Bernd Leno</a></td></tr>
</table></div>
<div id="events_wrap">
  <div class="event a"><div>17&rsquo; <span>1:0</span></div><div class="event_icon goal"></div><div><a href="/en/players/e342ad68/Mohamed-Salah">Mohamed Salah</a> <small>Assist: <a href="/en/players/x/Trent">Trent Alexander-Arnold</a></small></div></div>
  <div class="event b"><div>55&rsquo; <span>1:0</span></div><div class="event_icon yellow_card"></div><div><a href="/en/players/9bf2f7ae/Bernd-Leno">Bernd Leno</a></div></div>
  <div class="event a"><div>70&rsquo; <span>1:0</span></div><div class="event_icon substitute_in"></div><div><a href="/en/players/4d77b365/Darwin-Nunez">Darwin Núñez</a> for <a href="/en/players/e342ad68/Mohamed-Salah">Mohamed Salah</a></div></div>
</div>
<div id="team_stats"><table>
  <tr><th>{home}</th><th>{away}</th></tr>
  <tr><th colspan="2">Possession</th></tr>
  <tr><td>62%</td><td>38%</td></tr>
</table></div>
</body></html>"#,
        home_id = squad_id(home),
        home_slug = slug(home),
        home = home,
        home_score = home_score,
        away_id = squad_id(away),
        away_slug = slug(away),
        away = away,
        away_score = away_score,
    )
}
