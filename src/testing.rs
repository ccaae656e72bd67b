//! Shared fixtures for service and router tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::config::HintThresholds;
use crate::daily::{DailyTickerPicker, FixedClock};
use crate::error::{AppError, Result};
use crate::fetcher::AttributeSource;
use crate::service::{GameService, GameSettings};
use crate::state::SessionStore;
use crate::types::{AttributeSnapshot, Symbol};

/// Every attribute set to `value`.
pub fn snapshot(value: f64) -> AttributeSnapshot {
    AttributeSnapshot {
        price: Some(value),
        day_high: Some(value),
        day_low: Some(value),
        avg_volume: Some(value),
        market_cap: Some(value),
    }
}

pub fn test_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

#[derive(Default)]
struct StubInner {
    quotes: DashMap<String, AttributeSnapshot>,
    failing: AtomicBool,
    delay: Mutex<Duration>,
}

/// In-memory attribute source with switchable failure and latency.
#[derive(Clone, Default)]
pub struct StubSource {
    inner: Arc<StubInner>,
}

impl StubSource {
    /// AAPL at 100, HIGH10 at 110, NEAR at 101, MSFT at 80, GOOG at 150.
    pub fn standard() -> Self {
        let source = Self::default();
        source.insert("AAPL", snapshot(100.0));
        source.insert("HIGH10", snapshot(110.0));
        source.insert("NEAR", snapshot(101.0));
        source.insert("MSFT", snapshot(80.0));
        source.insert("GOOG", snapshot(150.0));
        source
    }

    pub fn insert(&self, symbol: &str, snapshot: AttributeSnapshot) {
        self.inner.quotes.insert(symbol.to_string(), snapshot);
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock().unwrap() = delay;
    }
}

impl AttributeSource for StubSource {
    async fn lookup(&self, symbol: &Symbol) -> Result<Option<AttributeSnapshot>> {
        let delay = *self.inner.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(AppError::QuoteApi("stub outage".to_string()));
        }
        Ok(self.inner.quotes.get(symbol.as_str()).map(|s| *s))
    }
}

/// A service whose secret is always AAPL, pinned to `test_day()`.
pub fn test_service(source: StubSource, max_attempts: u32) -> (GameService<StubSource>, Symbol) {
    test_service_with_store(source, max_attempts, SessionStore::new())
}

pub fn test_service_with_store(
    source: StubSource,
    max_attempts: u32,
    store: Arc<SessionStore>,
) -> (GameService<StubSource>, Symbol) {
    let secret = Symbol::parse("AAPL").unwrap();
    let picker = DailyTickerPicker::new(vec![secret.clone()], "test", test_day()).unwrap();
    let settings = GameSettings {
        max_attempts,
        hint_thresholds: HintThresholds::default(),
        lookup_timeout: Duration::from_secs(5),
    };
    let service = GameService::new(
        store,
        source,
        picker,
        Box::new(FixedClock(test_day())),
        settings,
        Arc::new(LatencyStats::new()),
        Arc::new(HealthState::new()),
    );
    (service, secret)
}
