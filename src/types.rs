// =============================================================================
// Shared types used across the Tickerdeck dashboard
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical lowercase trading-pair identifier, e.g. `btcusdt`.
///
/// Construction normalises case and rejects anything that is not a plain
/// alphanumeric pair; membership in the configured set is checked by
/// [`SymbolSet::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

/// Quote assets recognised when building a display name.
const QUOTE_ASSETS: &[&str] = &["usdt", "usdc", "fdusd", "busd", "btc", "eth", "bnb"];

impl Symbol {
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        if lower.is_empty() || !lower.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(lower))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human label such as `BTC/USDT`. Falls back to the upper-cased symbol
    /// when no known quote asset matches.
    pub fn display_name(&self) -> String {
        for quote in QUOTE_ASSETS {
            if let Some(base) = self.0.strip_suffix(quote) {
                if !base.is_empty() {
                    return format!("{}/{}", base.to_uppercase(), quote.to_uppercase());
                }
            }
        }
        self.0.to_uppercase()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid symbol: {value:?}"))
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

/// Ordered set of symbols the dashboard is allowed to subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSet {
    symbols: Vec<Symbol>,
}

impl SymbolSet {
    /// Build from raw strings, dropping invalid entries and duplicates while
    /// keeping first-seen order.
    pub fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut symbols: Vec<Symbol> = Vec::new();
        for s in raw {
            if let Some(sym) = Symbol::parse(s.as_ref()) {
                if !symbols.contains(&sym) {
                    symbols.push(sym);
                }
            }
        }
        Self { symbols }
    }

    /// Look up a raw symbol, returning it only when it is in the set.
    pub fn resolve(&self, raw: &str) -> Option<Symbol> {
        let sym = Symbol::parse(raw)?;
        self.contains(&sym).then_some(sym)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    /// Position of `symbol` in configuration order, used to keep the ticker
    /// board stable regardless of the order tickers were added.
    pub fn position(&self, symbol: &Symbol) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn first(&self) -> Option<&Symbol> {
        self.symbols.first()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// The four independently streamed data kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Candle,
    OrderBook,
    Trade,
    Ticker,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Candle => write!(f, "candle"),
            Self::OrderBook => write!(f, "orderbook"),
            Self::Trade => write!(f, "trade"),
            Self::Ticker => write!(f, "ticker"),
        }
    }
}

/// Identity of a stream: one connection per `(symbol, channel)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StreamKey {
    pub symbol: Symbol,
    pub channel: Channel,
}

impl StreamKey {
    pub fn new(symbol: Symbol, channel: Channel) -> Self {
        Self { symbol, channel }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.channel)
    }
}

#[cfg(test)]
pub fn sym(raw: &str) -> Symbol {
    Symbol::parse(raw).expect("valid test symbol")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_normalises_case() {
        let s = Symbol::parse(" BTCUSDT ").unwrap();
        assert_eq!(s.as_str(), "btcusdt");
        assert!(Symbol::parse("btc/usdt").is_none());
        assert!(Symbol::parse("").is_none());
    }

    #[test]
    fn display_name_splits_quote_asset() {
        assert_eq!(sym("btcusdt").display_name(), "BTC/USDT");
        assert_eq!(sym("ethbtc").display_name(), "ETH/BTC");
        assert_eq!(sym("usdt").display_name(), "USDT");
    }

    #[test]
    fn symbol_set_resolves_members_only() {
        let set = SymbolSet::from_raw(["BTCUSDT", "ethusdt", "btcusdt", "bad pair"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.resolve("ETHUSDT"), Some(sym("ethusdt")));
        assert_eq!(set.resolve("xrpusdt"), None);
        assert_eq!(set.position(&sym("ethusdt")), Some(1));
    }

    #[test]
    fn symbol_serde_is_plain_string() {
        let json = serde_json::to_string(&sym("solusdt")).unwrap();
        assert_eq!(json, "\"solusdt\"");
        let back: Symbol = serde_json::from_str("\"SOLUSDT\"").unwrap();
        assert_eq!(back, sym("solusdt"));
        assert!(serde_json::from_str::<Symbol>("\"so l\"").is_err());
    }

    #[test]
    fn stream_key_display() {
        let key = StreamKey::new(sym("bnbusdt"), Channel::OrderBook);
        assert_eq!(key.to_string(), "bnbusdt@orderbook");
    }
}
