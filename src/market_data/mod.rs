pub mod candle_buffer;
pub mod orderbook;
pub mod rolling;
pub mod ticker;
pub mod trade_stream;

pub use candle_buffer::{Candle, CandleAggregator, IngestOutcome};
pub use orderbook::{OrderBookLevel, OrderBookSnapshot, OrderBookSnapshotStore};
pub use rolling::RollingSeries;
pub use ticker::{TickerSnapshot, TickerState, Trend};
pub use trade_stream::{Trade, TradeFeed, TradeSide};

use anyhow::{Context, Result};

/// Binance sends most numeric values as JSON strings; plain numbers are
/// accepted too. NaN and infinities are rejected.
pub(crate) fn parse_string_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    let parsed = match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}"))?,
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64"))?,
        serde_json::Value::Null => anyhow::bail!("missing field {name}"),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    };
    if !parsed.is_finite() {
        anyhow::bail!("field {name} is not finite: {parsed}");
    }
    Ok(parsed)
}

/// Strip a combined-stream `{"stream": .., "data": {..}}` envelope if present.
pub(crate) fn stream_payload(root: &serde_json::Value) -> &serde_json::Value {
    match root.get("data") {
        Some(data) if data.is_object() => data,
        _ => root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_string_f64_accepts_strings_and_numbers() {
        assert_eq!(parse_string_f64(&json!("1.5"), "x").unwrap(), 1.5);
        assert_eq!(parse_string_f64(&json!(2), "x").unwrap(), 2.0);
        assert!(parse_string_f64(&json!("abc"), "x").is_err());
        assert!(parse_string_f64(&json!("NaN"), "x").is_err());
        assert!(parse_string_f64(&json!("inf"), "x").is_err());
        assert!(parse_string_f64(&json!(null), "x").is_err());
        assert!(parse_string_f64(&json!(true), "x").is_err());
    }

    #[test]
    fn stream_payload_unwraps_data() {
        let wrapped = json!({"stream": "btcusdt@trade", "data": {"p": "1"}});
        assert_eq!(stream_payload(&wrapped)["p"], "1");
        let flat = json!({"p": "2"});
        assert_eq!(stream_payload(&flat)["p"], "2");
    }
}
