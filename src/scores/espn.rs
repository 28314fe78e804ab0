use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use super::provider::{DaySlate, ProviderQuery, ScoreProvider, NO_GAMES_SORT_INDEX};

/// Score provider backed by ESPN's public scoreboard API.
pub struct EspnProvider {
    http: Client,
    /// Base URL for overriding in tests
    base_url: String,
}

const DEFAULT_BASE_URL: &str = "https://site.api.espn.com/apis/site/v2/sports";

impl EspnProvider {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(EspnProvider {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// ESPN path segment for a league id.
    fn sport_path(league: &str) -> Option<&'static str> {
        let path = match league.to_uppercase().as_str() {
            "MLB" => "baseball/mlb",
            "NFL" => "football/nfl",
            "NBA" => "basketball/nba",
            "NHL" => "hockey/nhl",
            "WNBA" => "basketball/wnba",
            "MLS" => "soccer/usa.1",
            "NCAAF" => "football/college-football",
            "NCAAM" => "basketball/mens-college-basketball",
            _ => return None,
        };
        Some(path)
    }

    fn scoreboard_url(&self, league: &str, date: NaiveDate) -> Result<String> {
        let path = Self::sport_path(league)
            .with_context(|| format!("ESPN has no scoreboard mapping for league '{}'", league))?;
        Ok(format!(
            "{}/{}/scoreboard?dates={}",
            self.base_url,
            path,
            date.format("%Y%m%d")
        ))
    }
}

#[async_trait]
impl ScoreProvider for EspnProvider {
    fn name(&self) -> &str {
        "ESPN"
    }

    async fn fetch_games(&self, query: &ProviderQuery, date: NaiveDate) -> Result<DaySlate> {
        if !query.season.contains(date) {
            return Ok(DaySlate::empty());
        }
        let url = self.scoreboard_url(&query.league, date)?;
        debug!("Fetching scoreboard from {}", url);

        let resp = self.http.get(&url).send().await.context("ESPN request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("ESPN error: {}", resp.status());
        }

        let raw: Value = resp.json().await.context("Failed to parse ESPN response")?;

        let mut slate = parse_scoreboard(&raw);
        if let Some(teams) = &query.teams {
            slate.games.retain(|g| {
                ["homeTeam", "awayTeam"].iter().any(|side| {
                    g[*side]["abbreviation"]
                        .as_str()
                        .is_some_and(|code| teams.iter().any(|t| t.eq_ignore_ascii_case(code)))
                })
            });
        }
        Ok(slate)
    }
}

fn parse_scoreboard(raw: &Value) -> DaySlate {
    let events = match raw["events"].as_array() {
        Some(a) => a,
        None => return DaySlate::empty(),
    };

    let games: Vec<Value> = events.iter().filter_map(parse_event).collect();

    let sort_index = games
        .iter()
        .filter_map(|g| g["startTime"].as_str().and_then(parse_start_time))
        .map(|t| i64::from(t.hour() * 60 + t.minute()))
        .min()
        .unwrap_or(NO_GAMES_SORT_INDEX);

    DaySlate {
        no_games_today: games.is_empty(),
        sort_index,
        games,
    }
}

fn parse_event(ev: &Value) -> Option<Value> {
    let competition = ev["competitions"].as_array()?.first()?;
    let competitors = competition["competitors"].as_array()?;
    let side = |home_away: &str| competitors.iter().find(|c| c["homeAway"] == home_away);
    let home = side("home")?;
    let away = side("away")?;

    let team = |c: &Value| -> Option<Value> {
        let abbreviation = c["team"]["abbreviation"].as_str()?;
        Some(json!({
            "abbreviation": abbreviation,
            "displayName": c["team"]["displayName"].as_str().unwrap_or_default(),
        }))
    };
    let score = |c: &Value| c["score"].as_str().and_then(|s| s.parse::<i64>().ok());
    let home_team = team(home)?;
    let away_team = team(away)?;

    Some(json!({
        "gameId": ev["id"].as_str().unwrap_or_default(),
        "startTime": ev["date"].as_str().unwrap_or_default(),
        "homeTeam": home_team,
        "awayTeam": away_team,
        "homeScore": score(home),
        "awayScore": score(away),
        "state": competition["status"]["type"]["state"].as_str().unwrap_or("pre"),
        "status": competition["status"]["type"]["shortDetail"].as_str().unwrap_or_default(),
    }))
}

/// ESPN dates look like `2024-07-15T20:10Z`; full RFC 3339 is accepted too.
fn parse_start_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%MZ")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}
