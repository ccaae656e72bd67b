mod api;
mod config;
mod daily;
mod db;
mod error;
mod fetcher;
mod hints;
mod service;
mod session;
mod state;
mod sweeper;
mod types;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::{router, ApiState};
use crate::config::{Config, CHANNEL_CAPACITY, FALLBACK_TICKER_SECRET};
use crate::daily::{load_universe, Clock, DailyTickerPicker, SystemClock};
use crate::db::DbWriter;
use crate::error::Result;
use crate::fetcher::{CachedSource, QuoteClient};
use crate::service::{GameService, GameSettings};
use crate::state::SessionStore;
use crate::sweeper::DaySweeper;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;

    // --- Daily secret ---
    if cfg.ticker_secret == FALLBACK_TICKER_SECRET {
        warn!("DAILY_TICKER_SECRET not set, the daily rotation is predictable");
    }
    let universe = load_universe(&cfg.tickers_path)?;
    let picker = DailyTickerPicker::new(universe, &cfg.ticker_secret, cfg.anchor_date)?;
    let clock = SystemClock::new(cfg.utc_offset_hours)?;
    let today = clock.today();
    info!(
        "Ticker rotation ready: {} symbols, anchor {}, today {} (UTC{:+})",
        picker.universe_len(),
        cfg.anchor_date,
        today,
        cfg.utc_offset_hours,
    );

    // --- Shared state ---
    let health = Arc::new(HealthState::new());
    let latency = Arc::new(LatencyStats::new());
    let (persist_tx, persist_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let store = SessionStore::with_persistence(persist_tx);

    // Restore today's sessions so a restart does not hand players a fresh day.
    let restored = db::load_sessions(&pool, today).await?;
    info!("Hydrated {} sessions for {today}", restored.len());
    store.hydrate(restored);

    // --- Spawn tasks ---

    // Session persistence (write-behind)
    let writer = DbWriter::new(pool.clone(), persist_rx, Arc::clone(&health));
    tokio::spawn(async move { writer.run().await });

    // Day rotation sweeper
    let sweeper = DaySweeper::new(
        Arc::clone(&store),
        Box::new(SystemClock::new(cfg.utc_offset_hours)?),
        Duration::from_secs(cfg.sweep_interval_secs),
    );
    tokio::spawn(async move { sweeper.run().await });

    // --- Game service ---
    let lookup_timeout = Duration::from_millis(cfg.lookup_timeout_ms);
    let quotes = QuoteClient::new(cfg.quote_api_url.clone(), lookup_timeout)?;
    let source = CachedSource::new(quotes, Duration::from_secs(cfg.cache_ttl_secs));
    let settings = GameSettings {
        max_attempts: cfg.max_attempts,
        hint_thresholds: cfg.hint_thresholds,
        lookup_timeout,
    };
    let service = GameService::new(
        Arc::clone(&store),
        source,
        picker,
        Box::new(clock),
        settings,
        Arc::clone(&latency),
        Arc::clone(&health),
    );

    // HTTP API server
    let api_state = ApiState {
        service: Arc::new(service),
        store,
        pool,
        latency,
        health,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(
        "HTTP API listening on {bind_addr} (max_attempts={}, quote_api={})",
        cfg.max_attempts, cfg.quote_api_url,
    );

    axum::serve(listener, app).await?;

    Ok(())
}
