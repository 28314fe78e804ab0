use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::season::SeasonWindow;

/// What a provider is asked for. `teams` is `None` when the caller wants the
/// full, unfiltered slate of the day.
#[derive(Debug, Clone)]
pub struct ProviderQuery {
    pub league: String,
    pub teams: Option<Vec<String>>,
    pub season: SeasonWindow,
}

/// One day's raw answer from a provider.
#[derive(Debug, Clone, Default)]
pub struct DaySlate {
    /// Raw game records, normalized later by the day fetcher.
    pub games: Vec<Value>,
    /// Provider-defined ordering hint for the day; 999 means "no games".
    pub sort_index: i64,
    pub no_games_today: bool,
}

pub const NO_GAMES_SORT_INDEX: i64 = 999;

impl DaySlate {
    pub fn empty() -> Self {
        DaySlate {
            games: Vec::new(),
            sort_index: NO_GAMES_SORT_INDEX,
            no_games_today: true,
        }
    }
}

/// Trait that every score provider must implement.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Fetch every game of `query.league` played on `date`.
    async fn fetch_games(&self, query: &ProviderQuery, date: NaiveDate) -> Result<DaySlate>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Providers by id, as referenced from league configuration.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ScoreProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry::default()
    }

    pub fn register(&mut self, id: &str, provider: Arc<dyn ScoreProvider>) {
        self.providers.insert(id.to_lowercase(), provider);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ScoreProvider>> {
        self.providers.get(&id.to_lowercase()).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
