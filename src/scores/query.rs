use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use super::date::ToGameDate;
use super::provider::{ProviderQuery, ScoreProvider};
use super::season::SeasonWindow;
use crate::error::SearchError;

/// Input of one search invocation.
#[derive(Clone)]
pub struct SearchQuery {
    pub league: String,
    /// Team codes, deduplicated, in configured order.
    pub teams: Vec<String>,
    pub base_date: NaiveDate,
    /// 0 keeps the single-day behavior.
    pub minimum_games: usize,
    pub season: SeasonWindow,
    pub provider: Arc<dyn ScoreProvider>,
}

impl SearchQuery {
    /// Validate and build a query. Fails before anything is fetched when the
    /// league, teams or base date are unusable.
    pub fn new(
        league: &str,
        teams: &[String],
        base_date: impl ToGameDate,
        minimum_games: usize,
        season: SeasonWindow,
        provider: Arc<dyn ScoreProvider>,
    ) -> Result<Self, SearchError> {
        let league = league.trim();
        if league.is_empty() {
            return Err(SearchError::MalformedQuery("league is empty".into()));
        }

        let mut codes: Vec<String> = Vec::with_capacity(teams.len());
        for team in teams {
            let code = team.trim();
            if code.is_empty() {
                return Err(SearchError::MalformedQuery(format!(
                    "{league}: blank team code"
                )));
            }
            if !codes.iter().any(|c| c.eq_ignore_ascii_case(code)) {
                codes.push(code.to_string());
            }
        }
        if codes.is_empty() {
            return Err(SearchError::MalformedQuery(format!(
                "{league}: at least one team is required"
            )));
        }

        Ok(SearchQuery {
            league: league.to_string(),
            teams: codes,
            base_date: base_date.to_game_date()?,
            minimum_games,
            season,
            provider,
        })
    }

    /// Provider request for the unfiltered slate of the league.
    pub fn provider_query(&self) -> ProviderQuery {
        ProviderQuery {
            league: self.league.clone(),
            teams: None,
            season: self.season,
        }
    }
}

impl fmt::Debug for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchQuery")
            .field("league", &self.league)
            .field("teams", &self.teams)
            .field("base_date", &self.base_date)
            .field("minimum_games", &self.minimum_games)
            .field("season", &self.season)
            .field("provider", &self.provider.name())
            .finish()
    }
}
