use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{parse_string_f64, stream_payload, RollingSeries};

/// Candles kept per chart.
pub const CANDLE_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle. `open == close` is a legal state and is never
/// adjusted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub bucket_start: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub closed: bool,
}

/// What [`CandleAggregator::ingest`] did with an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Same bucket as the last candle; high/low/close/volume overwritten.
    Merged,
    /// New bucket appended; `evicted` candles dropped from the front.
    Appended { evicted: usize },
    /// Series not bootstrapped yet, or the update belongs to an older bucket.
    Ignored,
}

impl IngestOutcome {
    pub fn mutated(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

// ---------------------------------------------------------------------------
// CandleAggregator
// ---------------------------------------------------------------------------

/// Bounded OHLCV series fed by a one-shot bootstrap and then by streaming
/// kline ticks. Bucket starts are strictly increasing; only the last candle
/// can be open.
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    series: RollingSeries<Candle>,
}

impl Default for CandleAggregator {
    fn default() -> Self {
        Self::new(CANDLE_CAPACITY)
    }
}

impl CandleAggregator {
    pub fn new(capacity: usize) -> Self {
        Self {
            series: RollingSeries::new(capacity),
        }
    }

    /// Seed the series from historical candles, replacing whatever was there.
    ///
    /// Input is sorted and de-duplicated by bucket (later entries win), then
    /// trimmed to capacity. Every candle except the newest is marked closed.
    pub fn bootstrap(&mut self, mut candles: Vec<Candle>) {
        candles.sort_by_key(|c| c.bucket_start);
        let mut deduped: Vec<Candle> = Vec::with_capacity(candles.len());
        for candle in candles {
            match deduped.last_mut() {
                Some(last) if last.bucket_start == candle.bucket_start => *last = candle,
                _ => deduped.push(candle),
            }
        }
        let newest = deduped.len().saturating_sub(1);
        for (i, candle) in deduped.iter_mut().enumerate() {
            if i < newest {
                candle.closed = true;
            }
        }
        self.series.replace_from(deduped);
        debug!(count = self.series.len(), "candle series bootstrapped");
    }

    /// Merge a streaming kline tick into the series.
    pub fn ingest(&mut self, update: &Candle) -> IngestOutcome {
        let Some(last) = self.series.last_mut() else {
            return IngestOutcome::Ignored;
        };

        if update.bucket_start == last.bucket_start {
            last.high = update.high;
            last.low = update.low;
            last.close = update.close;
            last.volume = update.volume;
            IngestOutcome::Merged
        } else if update.bucket_start > last.bucket_start {
            last.closed = true;
            let evicted = self.series.push_back(update.clone());
            IngestOutcome::Appended { evicted }
        } else {
            debug!(
                bucket = update.bucket_start,
                last = last.bucket_start,
                "ignoring kline for an older bucket"
            );
            IngestOutcome::Ignored
        }
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.series.last()
    }

    #[cfg(test)]
    pub fn candles(&self) -> impl Iterator<Item = &Candle> {
        self.series.iter()
    }

    pub fn to_vec(&self) -> Vec<Candle> {
        self.series.to_vec()
    }
}

// ---------------------------------------------------------------------------
// Kline parsing
// ---------------------------------------------------------------------------

/// Parse a kline frame.
///
/// Accepts the raw Binance single-stream shape (`{"e":"kline","k":{..}}`),
/// a combined-stream envelope around it, or a flat `{t,o,h,l,c,v,x}` object.
pub fn parse_kline_message(text: &str) -> Result<Candle> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse kline JSON")?;

    let data = stream_payload(&root);
    let k = match data.get("k") {
        Some(k) if k.is_object() => k,
        _ => data,
    };

    let bucket_start = k["t"].as_i64().context("missing field k.t")?;
    let open = parse_string_f64(&k["o"], "k.o")?;
    let high = parse_string_f64(&k["h"], "k.h")?;
    let low = parse_string_f64(&k["l"], "k.l")?;
    let close = parse_string_f64(&k["c"], "k.c")?;
    let volume = parse_string_f64(&k["v"], "k.v")?;
    let closed = k["x"].as_bool().unwrap_or(false);

    Ok(Candle {
        bucket_start,
        open,
        high,
        low,
        close,
        volume,
        closed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub fn sample_candle(bucket_start: i64, close: f64) -> Candle {
    Candle {
        bucket_start,
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 10.0,
        closed: false,
    }
}
