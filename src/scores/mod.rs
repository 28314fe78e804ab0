pub mod cache;
pub mod date;
pub mod espn;
pub mod fallback;
pub mod fetcher;
pub mod fixture;
pub mod game;
pub mod payload;
pub mod provider;
pub mod query;
pub mod search;
pub mod season;

pub use cache::DailyCache;
pub use date::Clock;
pub use espn::EspnProvider;
pub use fixture::FixtureProvider;
pub use payload::ScoreUpdate;
pub use provider::{ProviderRegistry, ScoreProvider};
pub use query::SearchQuery;
pub use search::GameSearch;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::LeagueConfig;
use crate::error::SearchError;

/// The configured leagues plus everything needed to search them.
pub struct ScoreFeed {
    leagues: Vec<LeagueConfig>,
    registry: ProviderRegistry,
    search: GameSearch,
}

impl ScoreFeed {
    pub fn new(leagues: Vec<LeagueConfig>, registry: ProviderRegistry, search: GameSearch) -> Self {
        ScoreFeed {
            leagues,
            registry,
            search,
        }
    }

    pub fn leagues(&self) -> &[LeagueConfig] {
        &self.leagues
    }

    pub fn search(&self) -> &GameSearch {
        &self.search
    }

    pub fn league(&self, id: &str) -> Option<&LeagueConfig> {
        self.leagues.iter().find(|l| l.league.eq_ignore_ascii_case(id))
    }

    /// Build the query for a configured league. `base_date` defaults to the
    /// clock's today and `minimum` to the configured minimum.
    pub fn query_for(
        &self,
        league: &LeagueConfig,
        base_date: Option<NaiveDate>,
        minimum: Option<usize>,
    ) -> Result<SearchQuery, SearchError> {
        let provider = self.registry.get(&league.provider).ok_or_else(|| {
            SearchError::MalformedQuery(format!(
                "{}: unknown provider '{}' (known: {:?})",
                league.league,
                league.provider,
                self.registry.ids()
            ))
        })?;
        SearchQuery::new(
            &league.league,
            &league.teams,
            base_date.unwrap_or_else(|| self.search.clock().today()),
            minimum.unwrap_or(league.minimum_games),
            league.season()?,
            provider,
        )
    }

    /// Search every configured league once.
    ///
    /// Leagues are independent and run concurrently; each search is
    /// sequential internally. Leagues whose query cannot be built are logged
    /// and left out.
    pub async fn refresh_all(&self) -> Vec<ScoreUpdate> {
        let mut queries = Vec::with_capacity(self.leagues.len());
        for league in &self.leagues {
            match self.query_for(league, None, None) {
                Ok(query) => queries.push(query),
                Err(e) => warn!("Skipping {}: {}", league.league, e),
            }
        }

        let searches = queries.iter().map(|q| self.search.run(q));
        futures_util::future::join_all(searches).await
    }
}

/// Spawns a background task that refreshes every league at the given
/// interval and sends each batch of payloads through the returned channel.
pub fn start_refresh_loop(feed: Arc<ScoreFeed>, interval: Duration) -> mpsc::Receiver<Vec<ScoreUpdate>> {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        info!(
            "Score refresher started ({} leagues, interval={:?})",
            feed.leagues().len(),
            interval
        );
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let updates = feed.refresh_all().await;
            let failed = updates.iter().filter(|u| u.error).count();
            if failed > 0 {
                warn!("{} of {} league searches failed", failed, updates.len());
            }
            if tx.send(updates).await.is_err() {
                info!("Score update receiver dropped, stopping refresher");
                break;
            }
        }
    });

    rx
}
