// =============================================================================
// Order Book Snapshot Store — top-of-book levels, replaced wholesale per tick
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{parse_string_f64, stream_payload};

/// Levels kept per side.
pub const BOOK_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: f64,
    pub quantity: f64,
}

impl OrderBookLevel {
    /// Notional value of the level. Derived for display, never stored.
    pub fn total(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Bids descending, asks ascending, exactly as the feed ordered them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderBookSnapshotStore {
    snapshot: OrderBookSnapshot,
}

impl OrderBookSnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both sides. No re-sorting and no padding; each side is cut to
    /// [`BOOK_DEPTH`] levels.
    pub fn replace(&mut self, mut bids: Vec<OrderBookLevel>, mut asks: Vec<OrderBookLevel>) {
        bids.truncate(BOOK_DEPTH);
        asks.truncate(BOOK_DEPTH);
        self.snapshot = OrderBookSnapshot { bids, asks };
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> &OrderBookSnapshot {
        &self.snapshot
    }

    pub fn bids(&self) -> &[OrderBookLevel] {
        &self.snapshot.bids
    }

    #[cfg(test)]
    pub fn asks(&self) -> &[OrderBookLevel] {
        &self.snapshot.asks
    }

    /// Asks in display order: highest price first, best ask nearest the spread.
    pub fn display_asks(&self) -> impl Iterator<Item = &OrderBookLevel> {
        self.snapshot.asks.iter().rev()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.bids.is_empty() && self.snapshot.asks.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshot = OrderBookSnapshot::default();
    }
}

// ---------------------------------------------------------------------------
// Depth parsing
// ---------------------------------------------------------------------------

/// Parse a Binance partial-depth message.
///
/// Expected shape:
/// ```json
/// {
///   "lastUpdateId": 12345,
///   "bids": [["37000.00", "1.5"], ...],
///   "asks": [["37001.00", "1.2"], ...]
/// }
/// ```
pub fn parse_depth_message(text: &str) -> Result<OrderBookSnapshot> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse depth JSON")?;
    let data = stream_payload(&root);

    let bids = parse_levels(&data["bids"], "bids")?;
    let asks = parse_levels(&data["asks"], "asks")?;

    Ok(OrderBookSnapshot { bids, asks })
}

fn parse_levels(val: &serde_json::Value, side: &str) -> Result<Vec<OrderBookLevel>> {
    let raw = val
        .as_array()
        .with_context(|| format!("missing field {side}"))?;

    raw.iter()
        .enumerate()
        .map(|(i, level)| {
            let pair = level
                .as_array()
                .filter(|a| a.len() >= 2)
                .with_context(|| format!("{side}[{i}] is not a [price, qty] pair"))?;
            Ok(OrderBookLevel {
                price: parse_string_f64(&pair[0], &format!("{side}[{i}].price"))?,
                quantity: parse_string_f64(&pair[1], &format!("{side}[{i}].qty"))?,
            })
        })
        .collect()
}
