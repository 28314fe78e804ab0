//! Last-resort fill when the expanding search ends short of the minimum.
//!
//! Candidates are cached games of the same league that involve none of the
//! query's teams. Team games are excluded by membership, not by comparing
//! against what is already bucketed: any team game in the cache was either
//! counted by the primary phase or rejected by it, and must not be
//! reconsidered here.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::cache::DailyCache;
use super::date::{day_distance, iso_date};
use super::game::Game;
use super::payload::DayBuckets;
use super::query::SearchQuery;

/// A non-team game picked to pad the result.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackPick {
    pub date: NaiveDate,
    pub sort_index: i64,
    pub game: Game,
}

/// Choose up to `needed` cached non-team games closest to the base date.
///
/// Ties in distance keep scan order, which is chronological, so the earlier
/// of two equally distant dates wins.
pub async fn select_fallback(cache: &DailyCache, query: &SearchQuery, needed: usize) -> Vec<FallbackPick> {
    if needed == 0 {
        return Vec::new();
    }

    let teams = query.teams.as_slice();
    let base_date = query.base_date;
    let mut candidates: Vec<(u64, FallbackPick)> = cache
        .league_entries(&query.league)
        .await
        .into_iter()
        .flat_map(|(date, day)| {
            let distance = day_distance(date, base_date);
            let sort_index = day.sort_index;
            day.games
                .into_iter()
                .filter(move |game| !game.involves_any(teams))
                .map(move |game| {
                    (
                        distance,
                        FallbackPick {
                            date,
                            sort_index,
                            game,
                        },
                    )
                })
        })
        .collect();

    debug!(
        "[{}] {} fallback candidates in cache, {} needed",
        query.league,
        candidates.len(),
        needed
    );

    candidates.sort_by_key(|(distance, _)| *distance);
    candidates
        .into_iter()
        .take(needed)
        .map(|(_, pick)| pick)
        .collect()
}

/// Select fallback games and add them to `buckets`. Returns how many were
/// added.
pub async fn fill_from_cache(
    cache: &DailyCache,
    query: &SearchQuery,
    buckets: &mut DayBuckets,
    needed: usize,
) -> usize {
    let picks = select_fallback(cache, query, needed).await;
    let added = picks.len();
    for pick in picks {
        buckets.add(pick.date, pick.sort_index, vec![pick.game]);
    }
    if added > 0 {
        info!(
            "[{}] Added {} fallback games around {} ({} still missing)",
            query.league,
            added,
            iso_date(query.base_date),
            needed - added
        );
    }
    added
}
