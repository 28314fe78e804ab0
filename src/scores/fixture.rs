//! Offline provider reading day slates from JSON files.
//!
//! Layout: `{root}/{LEAGUE}/{YYYY-MM-DD}.json`. A file holds either a bare
//! array of game records or `{"sortIndex": n, "games": [...]}`. A missing
//! file or a date outside the league's season is an empty day; any other
//! I/O failure is an error.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::date::iso_date;
use super::provider::{DaySlate, ProviderQuery, ScoreProvider, NO_GAMES_SORT_INDEX};

pub struct FixtureProvider {
    root: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    Games(Vec<Value>),
    Slate {
        #[serde(rename = "sortIndex")]
        sort_index: Option<i64>,
        games: Vec<Value>,
    },
}

impl FixtureProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FixtureProvider { root: root.into() }
    }

    fn day_path(&self, league: &str, date: NaiveDate) -> PathBuf {
        self.root.join(league).join(format!("{}.json", iso_date(date)))
    }
}

#[async_trait]
impl ScoreProvider for FixtureProvider {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn fetch_games(&self, query: &ProviderQuery, date: NaiveDate) -> Result<DaySlate> {
        if !query.season.contains(date) {
            debug!("{} is outside the {} season ({})", iso_date(date), query.league, query.season);
            return Ok(DaySlate::empty());
        }

        let path = self.day_path(&query.league, date);
        let exists = tokio::fs::try_exists(&path)
            .await
            .with_context(|| format!("Failed to check fixture {}", path.display()))?;
        if !exists {
            debug!("No fixture at {}", path.display());
            return Ok(DaySlate::empty());
        }
        read_slate(&path).await
    }
}

async fn read_slate(path: &Path) -> Result<DaySlate> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let file: FixtureFile = serde_json::from_str(&text)
        .with_context(|| format!("Malformed fixture {}", path.display()))?;

    let (games, sort_index) = match file {
        FixtureFile::Games(games) => (games, None),
        FixtureFile::Slate { sort_index, games } => (games, sort_index),
    };
    let no_games_today = games.is_empty();
    let sort_index = match sort_index {
        Some(idx) => idx,
        None if no_games_today => NO_GAMES_SORT_INDEX,
        None => 0,
    };
    Ok(DaySlate {
        games,
        sort_index,
        no_games_today,
    })
}
