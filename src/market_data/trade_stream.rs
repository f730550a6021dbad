// =============================================================================
// Trade Feed — newest-first log of recent trade prints
// =============================================================================

use std::fmt;

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

use super::{parse_string_f64, stream_payload, RollingSeries};

/// Trades kept in the log.
pub const TRADE_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp_ms: i64,
    pub price: f64,
    pub quantity: f64,
    /// Binance `m` (buyer is maker), i.e. the taker sold.
    pub is_seller_initiated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

impl Trade {
    pub fn side(&self) -> TradeSide {
        if self.is_seller_initiated {
            TradeSide::Sell
        } else {
            TradeSide::Buy
        }
    }

    /// Local wall-clock time as `HH:MM:SS`.
    pub fn time_label(&self) -> String {
        Local
            .timestamp_millis_opt(self.timestamp_ms)
            .single()
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct TradeFeed {
    log: RollingSeries<Trade>,
}

impl Default for TradeFeed {
    fn default() -> Self {
        Self::new(TRADE_CAPACITY)
    }
}

impl TradeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: RollingSeries::new(capacity),
        }
    }

    /// Insert at the front; the oldest trade falls off the back when full.
    pub fn append(&mut self, trade: Trade) {
        self.log.push_front(trade);
    }

    #[cfg(test)]
    pub fn latest(&self) -> Option<&Trade> {
        self.log.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trade> {
        self.log.iter()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }

    pub fn to_vec(&self) -> Vec<Trade> {
        self.log.to_vec()
    }
}

// ---------------------------------------------------------------------------
// Trade parsing
// ---------------------------------------------------------------------------

/// Parse a Binance `@trade` message (`{T, p, q, m}`).
pub fn parse_trade_message(text: &str) -> Result<Trade> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse trade JSON")?;
    let data = stream_payload(&root);

    Ok(Trade {
        timestamp_ms: data["T"].as_i64().context("missing field T")?,
        price: parse_string_f64(&data["p"], "p")?,
        quantity: parse_string_f64(&data["q"], "q")?,
        is_seller_initiated: data["m"].as_bool().context("missing field m")?,
    })
}
