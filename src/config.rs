use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use serde::Deserialize;

use crate::error::SearchError;
use crate::scores::date::ToGameDate;
use crate::scores::season::SeasonWindow;

pub const PROVIDER_IDS: &[&str] = &["espn", "fixture"];

/// Season-aware scoreboard feed with a guaranteed minimum of games
#[derive(Parser, Debug, Clone)]
#[command(name = "scoreboard-feed", version, about)]
pub struct Config {
    /// JSON file with one entry per league; overrides the single-league flags
    #[arg(long, env = "LEAGUES_FILE")]
    pub leagues_file: Option<PathBuf>,

    /// League id for a single-league run (e.g. MLB, NFL)
    #[arg(long, env = "LEAGUE")]
    pub league: Option<String>,

    /// Team codes to follow, comma separated
    #[arg(long, env = "TEAMS", value_delimiter = ',')]
    pub teams: Vec<String>,

    /// Minimum number of games to show; 0 shows only the base date
    #[arg(long, env = "MINIMUM_GAMES", default_value = "0")]
    pub minimum_games: usize,

    /// Season start as MM-DD
    #[arg(long, env = "SEASON_FROM")]
    pub season_from: Option<String>,

    /// Season end as MM-DD (may be before the start for seasons spanning New Year)
    #[arg(long, env = "SEASON_TO")]
    pub season_to: Option<String>,

    /// Score provider for the single league: espn | fixture
    #[arg(long, env = "PROVIDER", default_value = "espn")]
    pub provider: String,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, env = "FAKE_DATE")]
    pub fake_date: Option<String>,

    /// Serve the score API on this address instead of printing once
    #[arg(long, env = "SERVE_ADDR")]
    pub serve_addr: Option<String>,

    /// Seconds between background refreshes when serving
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "60")]
    pub refresh_interval_secs: u64,

    /// ESPN scoreboard base URL
    #[arg(long, env = "ESPN_BASE_URL")]
    pub espn_base_url: Option<String>,

    /// Root directory of the fixture provider
    #[arg(long, env = "FIXTURES_DIR", default_value = "fixtures")]
    pub fixtures_dir: PathBuf,

    /// Per-call provider timeout in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "10")]
    pub provider_timeout_secs: u64,
}

/// One league to follow.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeagueConfig {
    pub league: String,
    pub teams: Vec<String>,
    #[serde(default, alias = "minimumNumberOfGames")]
    pub minimum_games: usize,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_provider() -> String {
    "espn".to_string()
}

impl LeagueConfig {
    pub fn season(&self) -> Result<SeasonWindow, SearchError> {
        SeasonWindow::parse(self.from.as_deref(), self.to.as_deref())
    }

    fn validate(&self) -> Result<()> {
        if self.league.trim().is_empty() {
            anyhow::bail!("league id must not be empty");
        }
        if self.teams.is_empty() {
            anyhow::bail!("{}: at least one team is required", self.league);
        }
        if self.teams.iter().any(|t| t.trim().is_empty()) {
            anyhow::bail!("{}: blank team code in {:?}", self.league, self.teams);
        }
        if !PROVIDER_IDS.contains(&self.provider.to_lowercase().as_str()) {
            anyhow::bail!(
                "{}: unknown provider '{}', expected one of {:?}",
                self.league,
                self.provider,
                PROVIDER_IDS
            );
        }
        self.season()
            .with_context(|| format!("{}: bad season window", self.league))?;
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.leagues_file.is_none() && self.league.is_none() {
            anyhow::bail!("either --leagues-file or --league is required");
        }
        if self.refresh_interval_secs == 0 {
            anyhow::bail!("refresh_interval_secs must be positive");
        }
        if self.provider_timeout_secs == 0 {
            anyhow::bail!("provider_timeout_secs must be positive");
        }
        self.fake_date()?;
        Ok(())
    }

    pub fn fake_date(&self) -> Result<Option<NaiveDate>> {
        self.fake_date
            .as_deref()
            .map(|d| d.to_game_date().context("FAKE_DATE"))
            .transpose()
    }

    /// Leagues from the leagues file, or the single league from the flags.
    pub fn leagues(&self) -> Result<Vec<LeagueConfig>> {
        let leagues = match &self.leagues_file {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read leagues file {}", path.display()))?;
                serde_json::from_str::<Vec<LeagueConfig>>(&text)
                    .with_context(|| format!("Malformed leagues file {}", path.display()))?
            }
            None => vec![LeagueConfig {
                league: self.league.clone().unwrap_or_default(),
                teams: self.teams.clone(),
                minimum_games: self.minimum_games,
                from: self.season_from.clone(),
                to: self.season_to.clone(),
                provider: self.provider.clone(),
            }],
        };

        if leagues.is_empty() {
            anyhow::bail!("no leagues configured");
        }
        for league in &leagues {
            league.validate()?;
        }
        Ok(leagues)
    }
}
