use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{AppError, Result};

pub const QUOTE_API_URL: &str = "https://query1.finance.yahoo.com";

/// Fallback seed for the daily permutation when DAILY_TICKER_SECRET is unset.
/// Anyone who knows it can predict the rotation, so production must override it.
pub const FALLBACK_TICKER_SECRET: &str = "tickdle-dev-secret";

/// A hint deviation within this distance of zero is an exact match.
pub const EXACT_EPSILON: f64 = 1e-9;

/// Channel capacity for the session persistence queue.
pub const CHANNEL_CAPACITY: usize = 1024;

/// Longest accepted ticker symbol after normalization.
pub const MAX_SYMBOL_LEN: usize = 10;

/// Longest accepted player id.
pub const MAX_PLAYER_ID_LEN: usize = 128;

/// Closeness tier bounds, as absolute relative deviation.
/// A deviation above `warm_max` is "far".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HintThresholds {
    pub near_max: f64,
    pub warm_max: f64,
}

impl HintThresholds {
    pub fn new(near_max: f64, warm_max: f64) -> Result<Self> {
        if !(near_max.is_finite() && warm_max.is_finite()) || near_max <= 0.0 || near_max >= warm_max {
            return Err(AppError::Config(format!(
                "hint thresholds must satisfy 0 < near ({near_max}) < warm ({warm_max})"
            )));
        }
        Ok(Self { near_max, warm_max })
    }
}

impl Default for HintThresholds {
    fn default() -> Self {
        Self { near_max: 0.02, warm_max: 0.05 }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Guesses per session (MAX_ATTEMPTS)
    pub max_attempts: u32,
    /// Ticker universe file (TICKERS_PATH)
    pub tickers_path: String,
    /// Seed for the daily ticker permutation (DAILY_TICKER_SECRET)
    pub ticker_secret: String,
    /// Day zero of the rotation (ANCHOR_DATE, YYYY-MM-DD)
    pub anchor_date: NaiveDate,
    /// Offset of the game's calendar day from UTC (UTC_OFFSET_HOURS)
    pub utc_offset_hours: i32,
    pub quote_api_url: String,
    /// Caller-level timeout on a single attribute lookup (LOOKUP_TIMEOUT_MS)
    pub lookup_timeout_ms: u64,
    /// Snapshot cache lifetime (ATTRIBUTE_CACHE_TTL_SECS)
    pub cache_ttl_secs: u64,
    pub hint_thresholds: HintThresholds,
    /// Day-rotation sweep interval (SWEEP_INTERVAL_SECS)
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let ticker_secret = std::env::var("DAILY_TICKER_SECRET").unwrap_or_default();
        let ticker_secret = if ticker_secret.trim().is_empty() {
            FALLBACK_TICKER_SECRET.to_string()
        } else {
            ticker_secret
        };

        let anchor_raw = std::env::var("ANCHOR_DATE").unwrap_or_else(|_| "2025-01-01".to_string());
        let anchor_date = NaiveDate::parse_from_str(anchor_raw.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::Config(format!("ANCHOR_DATE must be YYYY-MM-DD, got {anchor_raw:?}")))?;

        let max_attempts = std::env::var("MAX_ATTEMPTS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .map_err(|_| AppError::Config("MAX_ATTEMPTS must be a positive integer".to_string()))?;
        if max_attempts == 0 {
            return Err(AppError::Config("MAX_ATTEMPTS must be at least 1".to_string()));
        }

        let utc_offset_hours = std::env::var("UTC_OFFSET_HOURS")
            .unwrap_or_else(|_| "-5".to_string())
            .parse::<i32>()
            .ok()
            .filter(|h| (-23..=23).contains(h))
            .ok_or_else(|| AppError::Config("UTC_OFFSET_HOURS must be an integer in -23..=23".to_string()))?;

        let hint_thresholds = HintThresholds::new(
            env_or::<f64>("HINT_NEAR_MAX", "0.02")?,
            env_or::<f64>("HINT_WARM_MAX", "0.05")?,
        )?;

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "tickdle.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            max_attempts,
            tickers_path: std::env::var("TICKERS_PATH").unwrap_or_else(|_| "tickers.json".to_string()),
            ticker_secret,
            anchor_date,
            utc_offset_hours,
            quote_api_url: std::env::var("QUOTE_API_URL")
                .unwrap_or_else(|_| QUOTE_API_URL.to_string()),
            lookup_timeout_ms: env_or("LOOKUP_TIMEOUT_MS", "5000")?,
            cache_ttl_secs: env_or("ATTRIBUTE_CACHE_TTL_SECS", "600")?,
            hint_thresholds,
            sweep_interval_secs: env_or::<u64>("SWEEP_INTERVAL_SECS", "300")?.max(1),
        })
    }
}

/// Read `name`, falling back to `default` when unset. A value that is set but
/// does not parse is a config error.
fn env_or<T: FromStr>(name: &str, default: &str) -> Result<T> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    parse_setting(name, &raw)
}

fn parse_setting<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::Config(format!("{name} is malformed: {raw:?}")))
}
