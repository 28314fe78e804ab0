//! Process-wide cache of fetched day slates.
//!
//! Entries are keyed by `(league, date)` and hold the full, unfiltered list
//! of games the provider returned, so a later fallback scan can reuse games
//! of teams nobody asked for. There is no per-entry expiry: the whole cache
//! is dropped the first time a search runs on a new calendar day.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::date::{iso_date, ToGameDate};
use super::game::Game;
use crate::error::SearchError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    pub league: String,
    pub date: NaiveDate,
}

impl CacheKey {
    /// Key for any date representation; rejects dates that are not `YYYY-MM-DD`.
    pub fn new(league: &str, date: impl ToGameDate) -> Result<Self, SearchError> {
        Ok(CacheKey::at(league, date.to_game_date()?))
    }

    fn at(league: &str, date: NaiveDate) -> Self {
        CacheKey {
            league: league.to_string(),
            date,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.league, iso_date(self.date))
    }
}

/// A cached day: unfiltered games plus the provider's sort hint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedDay {
    pub games: Vec<Game>,
    pub sort_index: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub games: usize,
    pub last_cleared: Option<NaiveDate>,
}

/// Shared cache handle; clones point at the same store.
#[derive(Clone, Default)]
pub struct DailyCache {
    inner: Arc<RwLock<CacheInner>>,
}

#[derive(Default)]
struct CacheInner {
    /// Ordered so a league's entries come out chronologically.
    days: BTreeMap<CacheKey, CachedDay>,
    last_cleared: Option<NaiveDate>,
}

impl DailyCache {
    pub fn new() -> Self {
        DailyCache::default()
    }

    /// Drop everything if `today` differs from the last date seen.
    /// Returns whether a clear happened.
    pub async fn roll_over(&self, today: NaiveDate) -> bool {
        {
            let mut inner = self.inner.write().await;
            if inner.last_cleared == Some(today) {
                return false;
            }
            inner.last_cleared = Some(today);
        }
        let dropped = self.clear().await;
        info!(
            "Daily cache rolled over to {} ({} entries dropped)",
            iso_date(today),
            dropped
        );
        true
    }

    /// Remove every entry without touching the rollover marker. Returns the
    /// number of entries dropped.
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;
        let dropped = inner.days.len();
        inner.days.clear();
        dropped
    }

    pub async fn get(&self, league: &str, date: NaiveDate) -> Option<CachedDay> {
        let key = CacheKey::at(league, date);
        self.inner.read().await.days.get(&key).cloned()
    }

    /// Like [`get`](Self::get), for a date in any accepted representation.
    pub async fn lookup(
        &self,
        league: &str,
        date: impl ToGameDate,
    ) -> Result<Option<CachedDay>, SearchError> {
        let key = CacheKey::new(league, date)?;
        Ok(self.inner.read().await.days.get(&key).cloned())
    }

    /// Store a day's slate. Concurrent writers for the same key race and the
    /// last write wins.
    pub async fn insert(&self, league: &str, date: NaiveDate, day: CachedDay) {
        let key = CacheKey::at(league, date);
        debug!("Caching {} ({} games)", key, day.games.len());
        self.inner.write().await.days.insert(key, day);
    }

    /// Every cached day of `league`, oldest first.
    pub async fn league_entries(&self, league: &str) -> Vec<(NaiveDate, CachedDay)> {
        let inner = self.inner.read().await;
        inner
            .days
            .iter()
            .filter(|(key, _)| key.league == league)
            .map(|(key, day)| (key.date, day.clone()))
            .collect()
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.read().await;
        CacheStats {
            entries: inner.days.len(),
            games: inner.days.values().map(|d| d.games.len()).sum(),
            last_cleared: inner.last_cleared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn date(s: &str) -> NaiveDate {
        s.to_game_date().unwrap()
    }

    fn day(games: &[(&str, &str)]) -> CachedDay {
        CachedDay {
            games: games.iter().map(|(h, a)| Game::new(h, a)).collect(),
            sort_index: 0,
        }
    }

    #[test]
    fn test_cache_key_normalizes_date_forms() {
        let rich = Utc.with_ymd_and_hms(2024, 7, 15, 18, 5, 0).unwrap();
        for key in [
            CacheKey::new("MLB", "2024-07-15"),
            CacheKey::new("MLB", rich),
            CacheKey::new("MLB", date("2024-07-15")),
        ] {
            assert_eq!(key.unwrap().to_string(), "MLB-2024-07-15");
        }
    }

    #[test]
    fn test_cache_key_rejects_malformed_date() {
        assert!(matches!(
            CacheKey::new("MLB", "07/15/2024"),
            Err(SearchError::InvalidDate(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_normalizes_date() {
        let cache = DailyCache::new();
        cache.insert("MLB", date("2024-07-15"), day(&[("SEA", "TOR")])).await;

        let rich = Utc.with_ymd_and_hms(2024, 7, 15, 23, 59, 0).unwrap();
        assert!(cache.lookup("MLB", rich).await.unwrap().is_some());
        assert!(cache.lookup("MLB", "2024-07-16").await.unwrap().is_none());
        assert!(cache.lookup("MLB", "15.07.2024").await.is_err());
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = DailyCache::new();
        cache.insert("MLB", date("2024-07-15"), day(&[("SEA", "TOR")])).await;

        let hit = cache.get("MLB", date("2024-07-15")).await.unwrap();
        assert_eq!(hit.games, vec![Game::new("SEA", "TOR")]);
        assert!(cache.get("NFL", date("2024-07-15")).await.is_none());
        assert!(cache.get("MLB", date("2024-07-16")).await.is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = DailyCache::new();
        cache.insert("MLB", date("2024-07-15"), day(&[("SEA", "TOR")])).await;
        cache.insert("MLB", date("2024-07-15"), day(&[("NYY", "BOS")])).await;

        let hit = cache.get("MLB", date("2024-07-15")).await.unwrap();
        assert_eq!(hit.games, vec![Game::new("NYY", "BOS")]);
    }

    #[tokio::test]
    async fn test_roll_over_clears_on_new_day_only() {
        let cache = DailyCache::new();
        assert!(cache.roll_over(date("2024-07-15")).await);
        cache.insert("MLB", date("2024-07-14"), day(&[("SEA", "TOR")])).await;

        assert!(!cache.roll_over(date("2024-07-15")).await);
        assert!(cache.get("MLB", date("2024-07-14")).await.is_some());

        assert!(cache.roll_over(date("2024-07-16")).await);
        assert!(cache.get("MLB", date("2024-07-14")).await.is_none());
        assert_eq!(cache.stats().await.last_cleared, Some(date("2024-07-16")));
    }

    #[tokio::test]
    async fn test_league_entries_are_chronological_and_scoped() {
        let cache = DailyCache::new();
        cache.insert("MLB", date("2024-07-16"), day(&[("A", "B")])).await;
        cache.insert("NFL", date("2024-07-15"), day(&[("KC", "NE")])).await;
        cache.insert("MLB", date("2024-07-14"), day(&[("C", "D")])).await;

        let dates: Vec<NaiveDate> = cache
            .league_entries("MLB")
            .await
            .into_iter()
            .map(|(d, _)| d)
            .collect();
        assert_eq!(dates, vec![date("2024-07-14"), date("2024-07-16")]);
    }

    #[tokio::test]
    async fn test_clones_share_the_store() {
        let cache = DailyCache::new();
        let other = cache.clone();
        other.insert("NBA", date("2025-01-15"), day(&[("LAL", "BOS")])).await;
        assert_eq!(cache.stats().await.entries, 1);

        assert_eq!(cache.clear().await, 1);
        assert_eq!(other.stats().await.entries, 0);
    }
}
