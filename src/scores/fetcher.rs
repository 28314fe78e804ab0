use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::cache::{CachedDay, DailyCache};
use super::date::iso_date;
use super::game::{filter_to_teams, Game};
use super::provider::NO_GAMES_SORT_INDEX;
use super::query::SearchQuery;

/// Where a day's games came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySource {
    Cache,
    Provider,
    /// The provider failed or timed out; the day counts as empty.
    Failed,
}

/// One resolved day, already filtered to the query's teams.
#[derive(Debug, Clone)]
pub struct FetchedDay {
    pub games: Vec<Game>,
    pub sort_index: i64,
    pub source: DaySource,
}

impl FetchedDay {
    fn failed() -> Self {
        FetchedDay {
            games: Vec::new(),
            sort_index: NO_GAMES_SORT_INDEX,
            source: DaySource::Failed,
        }
    }
}

/// Resolves a single `(league, date)` through the cache or the provider.
pub struct DayFetcher {
    cache: DailyCache,
    timeout: Duration,
}

impl DayFetcher {
    pub fn new(cache: DailyCache, timeout: Duration) -> Self {
        DayFetcher { cache, timeout }
    }

    /// Fetch the team games of `date`.
    ///
    /// Offset 0 is "today" and always goes to the provider since its scores
    /// are live; other days are served from the cache when possible. Every
    /// successful provider answer is cached unfiltered. Provider errors and
    /// timeouts are logged and yield an empty day.
    pub async fn fetch_day(&self, query: &SearchQuery, date: NaiveDate, offset: i64) -> FetchedDay {
        let league = query.league.as_str();

        if offset != 0 {
            if let Some(day) = self.cache.get(league, date).await {
                let games = filter_to_teams(&day.games, &query.teams);
                debug!(
                    "[{}] Cache hit for {} (day offset: {}): {} of {} games match",
                    league,
                    iso_date(date),
                    offset,
                    games.len(),
                    day.games.len()
                );
                return FetchedDay {
                    games,
                    sort_index: day.sort_index,
                    source: DaySource::Cache,
                };
            }
        }

        let provider_query = query.provider_query();
        let fetch = query.provider.fetch_games(&provider_query, date);
        let slate = match tokio::time::timeout(self.timeout, fetch).await {
            Ok(Ok(slate)) => slate,
            Ok(Err(e)) => {
                warn!(
                    "[{}] Provider '{}' failed for {}: {:#}",
                    league,
                    query.provider.name(),
                    iso_date(date),
                    e
                );
                return FetchedDay::failed();
            }
            Err(_) => {
                warn!(
                    "[{}] Provider '{}' timed out after {:?} for {}",
                    league,
                    query.provider.name(),
                    self.timeout,
                    iso_date(date)
                );
                return FetchedDay::failed();
            }
        };

        if slate.no_games_today {
            debug!(
                "[{}] Provider '{}' reports no games on {}",
                league,
                query.provider.name(),
                iso_date(date)
            );
        }

        let raw_count = slate.games.len();
        let all_games: Vec<Game> = slate.games.into_iter().filter_map(Game::from_raw).collect();
        if all_games.len() < raw_count {
            debug!(
                "[{}] Dropped {} records without both teams on {}",
                league,
                raw_count - all_games.len(),
                iso_date(date)
            );
        }

        let games = filter_to_teams(&all_games, &query.teams);
        info!(
            "Fetched {} games for {} on {} (day offset: {}, {} team games)",
            all_games.len(),
            league,
            iso_date(date),
            offset,
            games.len()
        );

        self.cache
            .insert(
                league,
                date,
                CachedDay {
                    games: all_games,
                    sort_index: slate.sort_index,
                },
            )
            .await;

        FetchedDay {
            games,
            sort_index: slate.sort_index,
            source: DaySource::Provider,
        }
    }
}
