use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

mod api;
mod config;
mod error;
mod scores;

use api::AppState;
use config::Config;
use scores::{
    start_refresh_loop, Clock, DailyCache, EspnProvider, FixtureProvider, GameSearch,
    ProviderRegistry, ScoreFeed,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let leagues = config.leagues()?;
    let clock = Clock::from_fake_date(config.fake_date()?);
    if let Clock::Fixed(date) = clock {
        info!("Using fake date {}", date);
    }

    let mut registry = ProviderRegistry::new();
    registry.register(
        "espn",
        Arc::new(EspnProvider::new(config.espn_base_url.as_deref())?),
    );
    registry.register(
        "fixture",
        Arc::new(FixtureProvider::new(config.fixtures_dir.clone())),
    );

    let search = GameSearch::new(
        DailyCache::new(),
        clock,
        Duration::from_secs(config.provider_timeout_secs),
    );
    let feed = Arc::new(ScoreFeed::new(leagues, registry, search));
    info!("Configured {} league(s)", feed.leagues().len());

    let Some(addr) = config.serve_addr.as_deref() else {
        let updates = feed.refresh_all().await;
        println!("{}", serde_json::to_string_pretty(&updates)?);
        return Ok(());
    };

    let latest = Arc::new(RwLock::new(Vec::new()));
    let mut rx = start_refresh_loop(
        Arc::clone(&feed),
        Duration::from_secs(config.refresh_interval_secs),
    );
    {
        let latest = Arc::clone(&latest);
        tokio::spawn(async move {
            while let Some(updates) = rx.recv().await {
                *latest.write().await = updates;
            }
            warn!("Score refresher stopped");
        });
    }

    let app = api::router(AppState { feed, latest });
    let addr: SocketAddr = addr
        .parse()
        .with_context(|| format!("Invalid SERVE_ADDR '{}'", addr))?;
    info!("Score API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run the API server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
