// =============================================================================
// Binance REST API Client — public market-data endpoints
// =============================================================================
//
// Only unauthenticated endpoints are used; no API key is sent.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{debug, instrument, warn};

use crate::market_data::{parse_string_f64, Candle};
use crate::types::Symbol;

/// Supplies the historical candles a chart is seeded with.
pub trait CandleSource: Send + Sync {
    fn recent_candles<'a>(
        &'a self,
        symbol: &'a Symbol,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<Candle>>>;
}

#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    interval: String,
    client: reqwest::Client,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>, interval: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "BinanceClient initialised");

        Ok(Self {
            base_url,
            interval: interval.into(),
            client,
        })
    }

    /// GET /api/v3/klines — ascending by open time.
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol.to_uppercase(),
            interval,
            limit
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse klines response")?;

        if !status.is_success() {
            anyhow::bail!("Binance GET /api/v3/klines returned {}: {}", status, body);
        }

        let candles = parse_klines(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

impl CandleSource for BinanceClient {
    fn recent_candles<'a>(
        &'a self,
        symbol: &'a Symbol,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<Candle>>> {
        async move { self.get_klines(symbol.as_str(), &self.interval, limit).await }.boxed()
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Parse the array-of-arrays klines body. Only the first six columns
/// (open time, open, high, low, close, volume) are used.
fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        candles.push(Candle {
            bucket_start: arr[0].as_i64().context("kline open time is not an integer")?,
            open: parse_string_f64(&arr[1], "open")?,
            high: parse_string_f64(&arr[2], "high")?,
            low: parse_string_f64(&arr[3], "low")?,
            close: parse_string_f64(&arr[4], "close")?,
            volume: parse_string_f64(&arr[5], "volume")?,
            closed: true,
        });
    }
    Ok(candles)
}
