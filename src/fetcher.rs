use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::state::AttributeCache;
use crate::types::{AttributeSnapshot, Symbol};

/// Where a ticker's market attributes come from. `Ok(None)` means the symbol
/// does not resolve to a known instrument.
pub trait AttributeSource: Send + Sync {
    fn lookup(&self, symbol: &Symbol) -> impl Future<Output = Result<Option<AttributeSnapshot>>> + Send;
}

// ---------------------------------------------------------------------------
// Quote API
// ---------------------------------------------------------------------------

/// Reads the day's quote fields from a Yahoo-style `/v7/finance/quote` endpoint.
pub struct QuoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl QuoteClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("tickdle/0.1")
            .build()?;
        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string() })
    }
}

impl AttributeSource for QuoteClient {
    async fn lookup(&self, symbol: &Symbol) -> Result<Option<AttributeSnapshot>> {
        let url = format!("{}/v7/finance/quote", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("symbols", symbol.as_str())])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!(%symbol, "Quote API returned 404");
            return Ok(None);
        }
        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_quote_response(&body, symbol)
    }
}

/// Extract the snapshot for `symbol` from a quote response body.
pub fn parse_quote_response(body: &serde_json::Value, symbol: &Symbol) -> Result<Option<AttributeSnapshot>> {
    let quote_response = body
        .get("quoteResponse")
        .ok_or_else(|| AppError::QuoteApi("response has no quoteResponse".to_string()))?;

    if let Some(err) = quote_response.get("error").filter(|e| !e.is_null()) {
        return Err(AppError::QuoteApi(err.to_string()));
    }

    let Some(items) = quote_response.get("result").and_then(|r| r.as_array()) else {
        return Err(AppError::QuoteApi("quoteResponse.result is not an array".to_string()));
    };

    let Some(item) = items.iter().find(|item| {
        item.get("symbol")
            .and_then(|s| s.as_str())
            .is_some_and(|s| s.eq_ignore_ascii_case(symbol.as_str()))
    }) else {
        return Ok(None);
    };

    Ok(Some(AttributeSnapshot {
        price: number(item, "regularMarketPrice"),
        day_high: number(item, "regularMarketDayHigh"),
        day_low: number(item, "regularMarketDayLow"),
        avg_volume: number(item, "averageDailyVolume3Month")
            .or_else(|| number(item, "averageDailyVolume10Day")),
        market_cap: number(item, "marketCap"),
    }))
}

/// Numeric field that may arrive as a number, a numeric string, or `{ "raw": n }`.
fn number(item: &serde_json::Value, field: &str) -> Option<f64> {
    let v = item.get(field)?;
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
        .or_else(|| v.get("raw").and_then(|r| r.as_f64()))
        .filter(|n| n.is_finite())
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

pub struct CachedSource<S> {
    inner: S,
    cache: AttributeCache,
}

impl<S: AttributeSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self { inner, cache: AttributeCache::new(ttl) }
    }
}

impl<S: AttributeSource> AttributeSource for CachedSource<S> {
    async fn lookup(&self, symbol: &Symbol) -> Result<Option<AttributeSnapshot>> {
        if let Some(snapshot) = self.cache.get(symbol) {
            debug!(%symbol, "Attribute cache hit");
            return Ok(Some(snapshot));
        }
        let fetched = self.inner.lookup(symbol).await?;
        if let Some(snapshot) = fetched {
            self.cache.insert(symbol.clone(), snapshot);
        }
        Ok(fetched)
    }
}
