use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::{parse_string_f64, stream_payload};

/// 24h rolling summary for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub last_price: f64,
    pub absolute_change: f64,
    pub percent_change: f64,
    pub volume: f64,
    pub high: f64,
    pub low: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
}

impl TickerSnapshot {
    pub fn trend(&self) -> Trend {
        if self.absolute_change >= 0.0 {
            Trend::Up
        } else {
            Trend::Down
        }
    }

    /// `+12.34 (+0.02%)`
    pub fn change_label(&self) -> String {
        format!("{:+.2} ({:+.2}%)", self.absolute_change, self.percent_change)
    }

    pub fn price_label(&self) -> String {
        format_price(self.last_price)
    }

    pub fn volume_label(&self) -> String {
        format_volume(self.volume)
    }
}

/// Latest snapshot only; no history.
#[derive(Debug, Clone, Default)]
pub struct TickerState {
    latest: Option<TickerSnapshot>,
}

impl TickerState {
    pub fn replace(&mut self, snapshot: TickerSnapshot) {
        self.latest = Some(snapshot);
    }

    pub fn latest(&self) -> Option<&TickerSnapshot> {
        self.latest.as_ref()
    }
}

/// `1.23M`, `4.56K` or `789.00`.
pub fn format_volume(volume: f64) -> String {
    if volume >= 1_000_000.0 {
        format!("{:.2}M", volume / 1_000_000.0)
    } else if volume >= 1_000.0 {
        format!("{:.2}K", volume / 1_000.0)
    } else {
        format!("{volume:.2}")
    }
}

/// Two decimals with comma thousands grouping, e.g. `61,234.50`.
pub fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if price < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Parse a Binance `@ticker` message (`{c, p, P, v, h, l}`).
pub fn parse_ticker_message(text: &str) -> Result<TickerSnapshot> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse ticker JSON")?;
    let data = stream_payload(&root);

    Ok(TickerSnapshot {
        last_price: parse_string_f64(&data["c"], "c")?,
        absolute_change: parse_string_f64(&data["p"], "p")?,
        percent_change: parse_string_f64(&data["P"], "P")?,
        volume: parse_string_f64(&data["v"], "v")?,
        high: parse_string_f64(&data["h"], "h")?,
        low: parse_string_f64(&data["l"], "l")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_overwrites_unconditionally() {
        let mut state = TickerState::default();
        assert!(state.latest().is_none());
        state.replace(TickerSnapshot { last_price: 1.0, ..Default::default() });
        state.replace(TickerSnapshot { last_price: 2.0, absolute_change: -1.0, ..Default::default() });
        let latest = state.latest().unwrap();
        assert_eq!(latest.last_price, 2.0);
        assert_eq!(latest.trend(), Trend::Down);
    }

    #[test]
    fn zero_change_is_up() {
        assert_eq!(TickerSnapshot::default().trend(), Trend::Up);
    }

    #[test]
    fn volume_suffixes() {
        assert_eq!(format_volume(1_234_567.0), "1.23M");
        assert_eq!(format_volume(1_000_000.0), "1.00M");
        assert_eq!(format_volume(4_560.0), "4.56K");
        assert_eq!(format_volume(789.0), "789.00");
    }

    #[test]
    fn price_grouping() {
        assert_eq!(format_price(61_234.5), "61,234.50");
        assert_eq!(format_price(1_234_567.891), "1,234,567.89");
        assert_eq!(format_price(0.5), "0.50");
        assert_eq!(format_price(-1_000.0), "-1,000.00");
    }

    #[test]
    fn change_label_is_signed() {
        let snap = TickerSnapshot { absolute_change: 12.346, percent_change: 0.02, ..Default::default() };
        assert_eq!(snap.change_label(), "+12.35 (+0.02%)");
    }

    #[test]
    fn parse_ticker_ok() {
        let json = r#"{"e":"24hrTicker","s":"BNBBTC","p":"0.0015","P":"250.00","c":"0.0025","v":"10000","h":"0.0025","l":"0.0010"}"#;
        let snap = parse_ticker_message(json).unwrap();
        assert_eq!(snap.percent_change, 250.0);
        assert_eq!(snap.volume, 10_000.0);
        assert!(parse_ticker_message(r#"{"c":"1"}"#).is_err());
    }
}
