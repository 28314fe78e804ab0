//! Search output: per-date game buckets and the payload sent to consumers.

use chrono::NaiveDate;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::date::iso_date;
use super::game::Game;
use super::provider::NO_GAMES_SORT_INDEX;

/// Games found for one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    pub actual_date: NaiveDate,
    pub games: Vec<Game>,
    pub sort_index: i64,
}

/// Buckets keyed by date, kept in the order their dates were discovered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayBuckets {
    buckets: Vec<DayBucket>,
}

impl DayBuckets {
    pub fn new() -> Self {
        DayBuckets::default()
    }

    /// Append `games` to the bucket of `date`, creating it if needed.
    pub fn add(&mut self, date: NaiveDate, sort_index: i64, games: Vec<Game>) {
        match self.buckets.iter_mut().find(|b| b.actual_date == date) {
            Some(bucket) => bucket.games.extend(games),
            None => self.buckets.push(DayBucket {
                actual_date: date,
                games,
                sort_index,
            }),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DayBucket> {
        self.buckets.iter().find(|b| b.actual_date == date)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.buckets.iter().map(|b| b.actual_date).collect()
    }

    pub fn total_games(&self) -> usize {
        self.buckets.iter().map(|b| b.games.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DayBucket> {
        self.buckets.iter()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BucketBody<'a> {
    scores: &'a [Game],
    sort_index: i64,
}

impl Serialize for DayBuckets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for bucket in &self.buckets {
            map.serialize_entry(
                &iso_date(bucket.actual_date),
                &BucketBody {
                    scores: &bucket.games,
                    sort_index: bucket.sort_index,
                },
            )?;
        }
        map.end()
    }
}

/// Result of one search invocation as delivered to consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdate {
    pub league: String,
    pub provider: String,
    pub base_date: NaiveDate,
    pub scores: DayBuckets,
    pub total_games: usize,
    /// Games added by the fallback scan, not involving the configured teams.
    pub fallback_games: usize,
    pub no_games_today: bool,
    pub out_of_season: bool,
    pub error: bool,
}

impl ScoreUpdate {
    /// Payload for a search that failed outright: one empty bucket at the
    /// base date and the error flag set.
    pub fn degraded(league: &str, provider: &str, base_date: NaiveDate) -> Self {
        let mut scores = DayBuckets::new();
        scores.add(base_date, NO_GAMES_SORT_INDEX, Vec::new());
        ScoreUpdate {
            league: league.to_string(),
            provider: provider.to_string(),
            base_date,
            scores,
            total_games: 0,
            fallback_games: 0,
            no_games_today: true,
            out_of_season: false,
            error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scores::date::ToGameDate;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        s.to_game_date().unwrap()
    }

    #[test]
    fn test_add_merges_same_date() {
        let mut buckets = DayBuckets::new();
        buckets.add(date("2024-07-15"), 1, vec![Game::new("SEA", "TOR")]);
        buckets.add(date("2024-07-14"), 2, vec![Game::new("NYY", "BOS")]);
        buckets.add(date("2024-07-15"), 9, vec![Game::new("LAD", "SF")]);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets.total_games(), 3);
        let today = buckets.get(date("2024-07-15")).unwrap();
        assert_eq!(today.games.len(), 2);
        assert_eq!(today.sort_index, 1);
    }

    #[test]
    fn test_serializes_in_discovery_order() {
        let mut buckets = DayBuckets::new();
        buckets.add(date("2024-07-15"), 0, vec![Game::new("SEA", "TOR")]);
        buckets.add(date("2024-07-14"), 4, vec![]);
        buckets.add(date("2024-07-16"), 5, vec![]);

        let text = serde_json::to_string(&buckets).unwrap();
        let first = text.find("2024-07-15").unwrap();
        let second = text.find("2024-07-14").unwrap();
        let third = text.find("2024-07-16").unwrap();
        assert!(first < second && second < third, "{text}");

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value["2024-07-15"],
            json!({"scores": [{"home": "SEA", "away": "TOR"}], "sortIndex": 0})
        );
    }

    #[test]
    fn test_degraded_payload_shape() {
        let update = ScoreUpdate::degraded("MLB", "espn", date("2024-07-15"));
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value["error"], json!(true));
        assert_eq!(value["baseDate"], json!("2024-07-15"));
        assert_eq!(
            value["scores"],
            json!({"2024-07-15": {"scores": [], "sortIndex": 999}})
        );
    }
}
