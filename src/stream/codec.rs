//! URL derivation and frame parsing for the four Binance channels.

use serde::Serialize;

use super::error::StreamError;
use crate::market_data::candle_buffer::parse_kline_message;
use crate::market_data::orderbook::parse_depth_message;
use crate::market_data::ticker::parse_ticker_message;
use crate::market_data::trade_stream::parse_trade_message;
use crate::market_data::{Candle, OrderBookSnapshot, TickerSnapshot, Trade};
use crate::types::{Channel, StreamKey};

/// A parsed frame, ready for the consumer context.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketEvent {
    Kline(Candle),
    Depth(OrderBookSnapshot),
    Trade(Trade),
    Ticker(TickerSnapshot),
}

impl MarketEvent {
    #[cfg(test)]
    pub fn channel(&self) -> Channel {
        match self {
            Self::Kline(_) => Channel::Candle,
            Self::Depth(_) => Channel::OrderBook,
            Self::Trade(_) => Channel::Trade,
            Self::Ticker(_) => Channel::Ticker,
        }
    }
}

/// Base URL and kline interval the stream URLs are derived from.
#[derive(Debug, Clone)]
pub struct StreamEndpoints {
    pub base_url: String,
    pub kline_interval: String,
}

impl StreamEndpoints {
    pub fn new(base_url: impl Into<String>, kline_interval: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            kline_interval: kline_interval.into(),
        }
    }

    /// Deterministic URL for a `(symbol, channel)` pair.
    pub fn url_for(&self, key: &StreamKey) -> String {
        let base = self.base_url.trim_end_matches('/');
        let sym = key.symbol.as_str();
        match key.channel {
            Channel::Candle => format!("{base}/{sym}@kline_{}", self.kline_interval),
            Channel::OrderBook => format!("{base}/{sym}@depth10@100ms"),
            Channel::Trade => format!("{base}/{sym}@trade"),
            Channel::Ticker => format!("{base}/{sym}@ticker"),
        }
    }
}

/// Parse one text frame for `channel`.
pub fn parse_frame(channel: Channel, text: &str) -> Result<MarketEvent, StreamError> {
    let parsed = match channel {
        Channel::Candle => parse_kline_message(text).map(MarketEvent::Kline),
        Channel::OrderBook => parse_depth_message(text).map(MarketEvent::Depth),
        Channel::Trade => parse_trade_message(text).map(MarketEvent::Trade),
        Channel::Ticker => parse_ticker_message(text).map(MarketEvent::Ticker),
    };
    parsed.map_err(|e| StreamError::Parse {
        channel,
        reason: format!("{e:#}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sym;

    #[test]
    fn urls_follow_binance_patterns() {
        let ep = StreamEndpoints::new("wss://stream.binance.com:9443/ws/", "1m");
        let url = |channel| ep.url_for(&StreamKey::new(sym("btcusdt"), channel));
        assert_eq!(url(Channel::Candle), "wss://stream.binance.com:9443/ws/btcusdt@kline_1m");
        assert_eq!(url(Channel::OrderBook), "wss://stream.binance.com:9443/ws/btcusdt@depth10@100ms");
        assert_eq!(url(Channel::Trade), "wss://stream.binance.com:9443/ws/btcusdt@trade");
        assert_eq!(url(Channel::Ticker), "wss://stream.binance.com:9443/ws/btcusdt@ticker");
    }

    #[test]
    fn parse_frame_routes_by_channel() {
        let ev = parse_frame(Channel::Trade, r#"{"T":1,"p":"2","q":"3","m":false}"#).unwrap();
        assert_eq!(ev.channel(), Channel::Trade);

        let err = parse_frame(Channel::Ticker, r#"{"T":1,"p":"2","q":"3","m":false}"#).unwrap_err();
        assert!(matches!(err, StreamError::Parse { channel: Channel::Ticker, .. }));
        assert!(!err.is_transport());
    }
}
