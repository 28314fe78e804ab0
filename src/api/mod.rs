use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::scores::cache::CachedDay;
use crate::scores::date::ToGameDate;
use crate::scores::{ScoreFeed, ScoreUpdate};

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<ScoreFeed>,
    /// Latest batch produced by the background refresher.
    pub latest: Arc<RwLock<Vec<ScoreUpdate>>>,
}

/// Build the Axum router for the score API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/scores", get(scores_handler))
        .route("/api/scores/:league", get(league_handler))
        .route("/api/cache", get(cache_handler))
        .route("/api/cache/:league/:date", get(cached_day_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /api/scores
async fn scores_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.latest.read().await.clone())
}

#[derive(Debug, Deserialize)]
struct LeagueParams {
    date: Option<String>,
    minimum: Option<usize>,
}

/// GET /api/scores/:league?date=YYYY-MM-DD&minimum=3
async fn league_handler(
    State(state): State<Arc<AppState>>,
    Path(league): Path<String>,
    Query(params): Query<LeagueParams>,
) -> Result<Json<ScoreUpdate>, (StatusCode, String)> {
    let config = state
        .feed
        .league(&league)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("league '{}' is not configured", league)))?;

    let base_date = params
        .date
        .as_deref()
        .map(|d| d.to_game_date())
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let query = state
        .feed
        .query_for(config, base_date, params.minimum)
        .map_err(|e| {
            let status = if e.is_malformed_input() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        })?;

    Ok(Json(state.feed.search().run(&query).await))
}

/// GET /api/cache
async fn cache_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.feed.search().cache().stats().await)
}

/// GET /api/cache/:league/:date
async fn cached_day_handler(
    State(state): State<Arc<AppState>>,
    Path((league, date)): Path<(String, String)>,
) -> Result<Json<CachedDay>, (StatusCode, String)> {
    let league = state
        .feed
        .league(&league)
        .map(|l| l.league.clone())
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("league '{}' is not configured", league)))?;

    state
        .feed
        .search()
        .cache()
        .lookup(&league, date.as_str())
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("{} {} is not cached", league, date)))
}
