//! Calendar day keys and the day's secret ticker.

use std::path::Path;

use chrono::{FixedOffset, NaiveDate, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::types::Symbol;

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock shifted to the game's calendar offset.
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(utc_offset_hours: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| AppError::Config(format!("invalid UTC offset {utc_offset_hours}h")))?;
        Ok(Self { offset })
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

// ---------------------------------------------------------------------------
// Ticker universe
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UniverseRow {
    ticker: String,
}

/// Parse the universe file body: `[{"ticker": "AAPL", ...}, ...]`.
/// Unparseable symbols are skipped with a warning; duplicates are dropped.
pub fn parse_universe(raw: &str) -> Result<Vec<Symbol>> {
    let rows: Vec<UniverseRow> = serde_json::from_str(raw)?;
    let mut symbols: Vec<Symbol> = rows
        .into_iter()
        .filter_map(|row| match Symbol::parse(&row.ticker) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(ticker = %row.ticker, "Skipping universe entry: {e}");
                None
            }
        })
        .collect();
    symbols.sort();
    symbols.dedup();
    Ok(symbols)
}

pub fn load_universe(path: impl AsRef<Path>) -> Result<Vec<Symbol>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let symbols = parse_universe(&raw)?;
    if symbols.is_empty() {
        return Err(AppError::Bootstrap(format!("{} has no usable tickers", path.display())));
    }
    info!("Loaded {} tickers from {}", symbols.len(), path.display());
    Ok(symbols)
}

// ---------------------------------------------------------------------------
// Daily selection
// ---------------------------------------------------------------------------

/// Walks a secret-keyed permutation of the universe, one ticker per day.
///
/// The permutation orders symbols by `sha256(secret | symbol)`, so it is stable
/// for a fixed secret and universe and unpredictable without the secret.
pub struct DailyTickerPicker {
    order: Vec<Symbol>,
    anchor: NaiveDate,
}

impl DailyTickerPicker {
    pub fn new(universe: Vec<Symbol>, secret: &str, anchor: NaiveDate) -> Result<Self> {
        if universe.is_empty() {
            return Err(AppError::Bootstrap("ticker universe is empty".to_string()));
        }
        let mut keyed: Vec<(Vec<u8>, Symbol)> = universe
            .into_iter()
            .map(|symbol| {
                let mut hasher = Sha256::new();
                hasher.update(secret.as_bytes());
                hasher.update(b"|");
                hasher.update(symbol.as_str().as_bytes());
                (hasher.finalize().to_vec(), symbol)
            })
            .collect();
        keyed.sort();
        Ok(Self { order: keyed.into_iter().map(|(_, s)| s).collect(), anchor })
    }

    /// The secret for `day`. Days before the anchor wrap around.
    pub fn pick(&self, day: NaiveDate) -> Symbol {
        let days = (day - self.anchor).num_days();
        let idx = days.rem_euclid(self.order.len() as i64) as usize;
        self.order[idx].clone()
    }

    pub fn universe_len(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
pub(crate) struct FixedClock(pub NaiveDate);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
