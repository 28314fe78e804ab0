//! Expanding-window search for a minimum number of team games.
//!
//! The base date is fetched first. If that is not enough, days are visited
//! at increasing distance, past before future, up to [`MAX_DAY_OFFSET`] days
//! each way. If the team games found still fall short, nearby non-team games
//! from the cache fill the gap.
//!
//! Visiting order decides which games win when more are available than
//! needed, so days of one search are always fetched one after another.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chrono::NaiveDate;
use futures_util::FutureExt;
use tracing::{debug, error, info};

use super::cache::DailyCache;
use super::date::{iso_date, shift_days, Clock};
use super::fallback::fill_from_cache;
use super::fetcher::DayFetcher;
use super::payload::{DayBuckets, ScoreUpdate};
use super::query::SearchQuery;
use crate::error::SearchError;

/// How many days the search reaches into the past and into the future.
pub const MAX_DAY_OFFSET: i64 = 20;

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub buckets: DayBuckets,
    pub total_games: usize,
    pub fallback_games: usize,
    pub no_games_today: bool,
    pub out_of_season: bool,
}

/// Per-invocation bookkeeping.
#[derive(Default)]
struct SearchState {
    processed: HashSet<NaiveDate>,
    total: usize,
    buckets: DayBuckets,
}

impl SearchState {
    fn satisfied(&self, minimum: usize) -> bool {
        self.total >= minimum
    }
}

/// Runs searches against a shared daily cache.
pub struct GameSearch {
    cache: DailyCache,
    fetcher: DayFetcher,
    clock: Clock,
}

impl GameSearch {
    pub fn new(cache: DailyCache, clock: Clock, provider_timeout: Duration) -> Self {
        GameSearch {
            fetcher: DayFetcher::new(cache.clone(), provider_timeout),
            cache,
            clock,
        }
    }

    pub fn cache(&self) -> &DailyCache {
        &self.cache
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Run one search and turn the result into a payload.
    ///
    /// The cache is rolled over first if the clock moved to a new day. A
    /// failure of the search loop itself, panics included, is logged and
    /// yields the degraded payload instead of propagating.
    pub async fn run(&self, query: &SearchQuery) -> ScoreUpdate {
        self.cache.roll_over(self.clock.today()).await;

        let provider = query.provider.name().to_string();
        let result = AssertUnwindSafe(self.search(query)).catch_unwind().await;
        let failure = match result {
            Ok(Ok(outcome)) => {
                return ScoreUpdate {
                    league: query.league.clone(),
                    provider,
                    base_date: query.base_date,
                    total_games: outcome.total_games,
                    fallback_games: outcome.fallback_games,
                    no_games_today: outcome.no_games_today,
                    out_of_season: outcome.out_of_season,
                    scores: outcome.buckets,
                    error: false,
                };
            }
            Ok(Err(e)) => e,
            Err(panic) => SearchError::Orchestration(panic_message(panic.as_ref())),
        };

        error!(
            "[{}] Search around {} failed: {}",
            query.league,
            iso_date(query.base_date),
            failure
        );
        ScoreUpdate::degraded(&query.league, &provider, query.base_date)
    }

    /// The search itself, without cache rollover or failure absorption.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        let minimum = query.minimum_games;
        let base = query.base_date;
        info!(
            "Looking for minimum {} games for {} around {}",
            minimum,
            query.league,
            iso_date(base)
        );

        let mut state = SearchState::default();
        let out_of_season = !query.season.contains(base);

        self.visit(query, &mut state, base, 0).await;
        let no_games_today = state.total == 0;

        if minimum > 0 {
            let mut offset = 1;
            while offset <= MAX_DAY_OFFSET && !state.satisfied(minimum) {
                let past = shift_days(base, -offset)?;
                self.visit(query, &mut state, past, -offset).await;
                if state.satisfied(minimum) {
                    break;
                }

                let future = shift_days(base, offset)?;
                self.visit(query, &mut state, future, offset).await;
                offset += 1;
            }
        }

        let mut fallback_games = 0;
        if !state.satisfied(minimum) {
            fallback_games =
                fill_from_cache(&self.cache, query, &mut state.buckets, minimum - state.total).await;
            state.total += fallback_games;
        }

        debug_assert_eq!(state.total, state.buckets.total_games());
        info!(
            "[{}] Found {} of {} games across {} days ({} fallback)",
            query.league,
            state.total,
            minimum,
            state.buckets.len(),
            fallback_games
        );

        Ok(SearchOutcome {
            total_games: state.total,
            buckets: state.buckets,
            fallback_games,
            no_games_today,
            out_of_season,
        })
    }

    /// Resolve one date unless it was already processed in this search.
    async fn visit(&self, query: &SearchQuery, state: &mut SearchState, date: NaiveDate, offset: i64) {
        if !state.processed.insert(date) {
            return;
        }
        if !query.season.contains(date) {
            debug!(
                "[{}] Skipping {} - not in season ({})",
                query.league,
                iso_date(date),
                query.season
            );
            return;
        }

        let day = self.fetcher.fetch_day(query, date, offset).await;
        debug!(
            "[{}] {} resolved from {:?}: {} team games",
            query.league,
            iso_date(date),
            day.source,
            day.games.len()
        );
        if !day.games.is_empty() {
            state.total += day.games.len();
            state.buckets.add(date, day.sort_index, day.games);
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::date::ToGameDate;
    use crate::scores::game::Game;
    use crate::scores::provider::{DaySlate, ProviderQuery, ScoreProvider};
    use crate::scores::season::SeasonWindow;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Serves a fixed schedule and records every date it is asked for.
    #[derive(Default)]
    struct ScriptedProvider {
        schedule: HashMap<NaiveDate, Vec<Value>>,
        failing: HashSet<NaiveDate>,
        panicking: HashSet<NaiveDate>,
        calls: Mutex<Vec<NaiveDate>>,
    }

    impl ScriptedProvider {
        fn with_games(mut self, day: &str, games: &[(&str, &str)]) -> Self {
            let raw = games
                .iter()
                .map(|(h, a)| json!({"hTeam": h, "vTeam": a}))
                .collect();
            self.schedule.insert(date(day), raw);
            self
        }

        fn failing_on(mut self, day: &str) -> Self {
            self.failing.insert(date(day));
            self
        }

        fn panicking_on(mut self, day: &str) -> Self {
            self.panicking.insert(date(day));
            self
        }

        fn calls(&self) -> Vec<NaiveDate> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ScoreProvider for ScriptedProvider {
        async fn fetch_games(&self, _: &ProviderQuery, date: NaiveDate) -> anyhow::Result<DaySlate> {
            self.calls.lock().unwrap().push(date);
            if self.panicking.contains(&date) {
                panic!("provider exploded");
            }
            if self.failing.contains(&date) {
                anyhow::bail!("HTTP 500");
            }
            let games = self.schedule.get(&date).cloned().unwrap_or_default();
            Ok(DaySlate {
                no_games_today: games.is_empty(),
                sort_index: 1,
                games,
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.to_game_date().unwrap()
    }

    fn search_on(today: &str) -> GameSearch {
        GameSearch::new(
            DailyCache::new(),
            Clock::Fixed(date(today)),
            Duration::from_secs(5),
        )
    }

    fn query(
        provider: &Arc<ScriptedProvider>,
        teams: &[&str],
        minimum: usize,
        season: SeasonWindow,
    ) -> SearchQuery {
        let teams: Vec<String> = teams.iter().map(|t| t.to_string()).collect();
        SearchQuery::new("MLB", &teams, "2024-07-15", minimum, season, provider.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_minimum_zero_is_single_day() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with_games("2024-07-15", &[("SEA", "TOR"), ("NYY", "BOS")])
                .with_games("2024-07-14", &[("SEA", "OAK")]),
        );
        let search = search_on("2024-07-15");
        let update = search
            .run(&query(&provider, &["SEA"], 0, SeasonWindow::year_round()))
            .await;

        assert_eq!(provider.calls(), vec![date("2024-07-15")]);
        assert_eq!(update.scores.dates(), vec![date("2024-07-15")]);
        assert_eq!(update.total_games, 1);
        assert!(!update.error);
    }

    #[tokio::test]
    async fn test_minimum_met_today_fetches_nothing_else() {
        let provider = Arc::new(
            ScriptedProvider::default().with_games("2024-07-15", &[("SEA", "TOR"), ("TOR", "BOS")]),
        );
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA", "TOR"], 2, SeasonWindow::year_round()))
            .await;

        assert_eq!(provider.calls(), vec![date("2024-07-15")]);
        assert_eq!(update.total_games, 2);
    }

    #[tokio::test]
    async fn test_short_today_expands_past_before_future() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with_games("2024-07-15", &[("SEA", "TOR"), ("SEA", "TOR")])
                .with_games("2024-07-13", &[("SEA", "OAK")]),
        );
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA"], 3, SeasonWindow::year_round()))
            .await;

        assert_eq!(
            provider.calls(),
            vec![
                date("2024-07-15"),
                date("2024-07-14"),
                date("2024-07-16"),
                date("2024-07-13"),
            ]
        );
        assert_eq!(update.total_games, 3);
        assert_eq!(update.scores.dates(), vec![date("2024-07-15"), date("2024-07-13")]);
        assert_eq!(update.fallback_games, 0);
    }

    #[tokio::test]
    async fn test_past_hit_stops_before_future_of_same_offset() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with_games("2024-07-14", &[("SEA", "OAK")])
                .with_games("2024-07-16", &[("SEA", "HOU")]),
        );
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA"], 1, SeasonWindow::year_round()))
            .await;

        assert_eq!(provider.calls(), vec![date("2024-07-15"), date("2024-07-14")]);
        assert_eq!(update.scores.dates(), vec![date("2024-07-14")]);
        assert!(update.no_games_today);
    }

    #[tokio::test]
    async fn test_sparse_schedule_respects_ceiling() {
        // One SEA game every third day, far too few for a minimum of 30.
        let mut provider = ScriptedProvider::default();
        let base = date("2024-07-15");
        for offset in (-25..=25).step_by(3) {
            let day = iso_date(shift_days(base, offset).unwrap());
            provider = provider.with_games(&day, &[("SEA", "TOR")]);
        }
        let provider = Arc::new(provider);
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA"], 30, SeasonWindow::year_round()))
            .await;

        let calls = provider.calls();
        assert_eq!(calls.len(), 41);
        let unique: HashSet<NaiveDate> = calls.iter().copied().collect();
        assert_eq!(unique.len(), calls.len(), "a date was fetched twice");
        assert!(calls.iter().all(|d| (*d - base).num_days().abs() <= MAX_DAY_OFFSET));

        assert!(update.total_games <= 30);
        assert!(update.scores.len() > 1);
        let dates = update.scores.dates();
        let unique_dates: HashSet<NaiveDate> = dates.iter().copied().collect();
        assert_eq!(unique_dates.len(), dates.len());
        assert_eq!(update.total_games, update.scores.total_games());
    }

    #[tokio::test]
    async fn test_out_of_season_days_are_never_fetched() {
        let provider = Arc::new(ScriptedProvider::default().with_games("2024-07-17", &[("SEA", "TOR")]));
        let season = SeasonWindow::parse(Some("07-15"), Some("07-17")).unwrap();
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA"], 1, season))
            .await;

        assert_eq!(
            provider.calls(),
            vec![date("2024-07-15"), date("2024-07-16"), date("2024-07-17")]
        );
        assert_eq!(update.total_games, 1);
        assert!(!update.out_of_season);
    }

    #[tokio::test]
    async fn test_out_of_season_base_date_flagged() {
        let provider = Arc::new(ScriptedProvider::default());
        let season = SeasonWindow::parse(Some("09-01"), Some("02-15")).unwrap();
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA"], 0, season))
            .await;

        assert!(provider.calls().is_empty());
        assert!(update.out_of_season);
        assert!(update.scores.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_skips_day_and_continues() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .failing_on("2024-07-14")
                .with_games("2024-07-16", &[("SEA", "HOU")]),
        );
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA"], 1, SeasonWindow::year_round()))
            .await;

        assert!(!update.error);
        assert_eq!(update.scores.dates(), vec![date("2024-07-16")]);
    }

    #[tokio::test]
    async fn test_fallback_fills_with_nearest_non_team_games() {
        let provider = Arc::new(
            ScriptedProvider::default()
                .with_games("2024-07-15", &[("SEA", "TOR"), ("NYY", "BOS")])
                .with_games("2024-07-10", &[("LAD", "SF")])
                .with_games("2024-07-30", &[("HOU", "TEX")]),
        );
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA"], 3, SeasonWindow::year_round()))
            .await;

        assert_eq!(update.total_games, 3);
        assert_eq!(update.fallback_games, 2);
        let today = update.scores.get(date("2024-07-15")).unwrap();
        assert_eq!(today.games, vec![Game::new("SEA", "TOR"), Game::new("NYY", "BOS")]);
        let earlier = update.scores.get(date("2024-07-10")).unwrap();
        assert_eq!(earlier.games, vec![Game::new("LAD", "SF")]);
        assert!(update.scores.get(date("2024-07-30")).is_none());
    }

    #[tokio::test]
    async fn test_fallback_never_duplicates_team_games() {
        let provider = Arc::new(
            ScriptedProvider::default().with_games("2024-07-15", &[("SEA", "TOR"), ("TOR", "SEA")]),
        );
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA"], 5, SeasonWindow::year_round()))
            .await;

        assert_eq!(update.total_games, 2);
        assert_eq!(update.fallback_games, 0);
    }

    #[tokio::test]
    async fn test_cache_shared_within_day_and_dropped_on_rollover() {
        let provider = Arc::new(ScriptedProvider::default().with_games("2024-07-14", &[("SEA", "OAK")]));
        let cache = DailyCache::new();
        let q = query(&provider, &["SEA"], 1, SeasonWindow::year_round());

        let day_one = GameSearch::new(cache.clone(), Clock::Fixed(date("2024-07-15")), Duration::from_secs(5));
        day_one.run(&q).await;
        assert_eq!(provider.calls().len(), 2);

        let day_two = GameSearch::new(cache.clone(), Clock::Fixed(date("2024-07-16")), Duration::from_secs(5));
        day_two.run(&q).await;
        // Rollover dropped the cache, so yesterday was fetched again.
        assert_eq!(provider.calls().len(), 4);

        day_two.run(&q).await;
        // Same day: only the base date is refetched.
        assert_eq!(provider.calls().len(), 5);
        assert_eq!(provider.calls()[4], date("2024-07-15"));
    }

    #[tokio::test]
    async fn test_panic_in_search_degrades_payload() {
        let provider = Arc::new(ScriptedProvider::default().panicking_on("2024-07-15"));
        let update = search_on("2024-07-15")
            .run(&query(&provider, &["SEA"], 3, SeasonWindow::year_round()))
            .await;

        assert!(update.error);
        assert_eq!(update.scores.dates(), vec![date("2024-07-15")]);
        assert!(update.scores.get(date("2024-07-15")).unwrap().games.is_empty());
    }

    #[tokio::test]
    async fn test_date_overflow_is_an_orchestration_failure() {
        let provider = Arc::new(ScriptedProvider::default());
        let teams = vec!["SEA".to_string()];
        let q = SearchQuery::new("MLB", &teams, NaiveDate::MAX, 2, SeasonWindow::year_round(), provider.clone())
            .unwrap();
        let search = search_on("2024-07-15");

        assert!(matches!(
            search.search(&q).await,
            Err(SearchError::DateOutOfRange { .. })
        ));
        assert!(search.run(&q).await.error);
    }
}
