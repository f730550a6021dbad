// =============================================================================
// Dashboard — panel visibility, symbol selection and the consumer loop
// =============================================================================

pub mod coordinator;
pub mod panels;
pub mod render;

pub use coordinator::{Dashboard, DashboardSettings};
pub use render::{BoardSink, BoardSnapshot, RenderFrame, RenderSink, SharedBoard};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::stream::StreamState;
use crate::types::Symbol;

/// The three single-symbol surfaces. The ticker board is managed as a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Chart,
    OrderBook,
    Trades,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Chart, Panel::OrderBook, Panel::Trades];

    pub fn label(self) -> &'static str {
        match self {
            Self::Chart => "Chart",
            Self::OrderBook => "OrderBook",
            Self::Trades => "Trades",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Panel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chart" => Ok(Self::Chart),
            "orderbook" | "order_book" | "order-book" => Ok(Self::OrderBook),
            "trades" => Ok(Self::Trades),
            other => Err(format!("unknown panel '{other}'")),
        }
    }
}

/// Requests from outside the consumer task.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    Show(Panel),
    Hide(Panel),
    Toggle(Panel),
    ChangeSymbol(Panel, Symbol),
    SetTickers(Vec<Symbol>),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelStatus {
    pub panel: Panel,
    pub symbol: Symbol,
    pub visible: bool,
    pub stream: StreamState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStatus {
    /// e.g. `Active: 5 Tickers | Chart, OrderBook`
    pub line: String,
    pub tickers: Vec<Symbol>,
    pub panels: Vec<PanelStatus>,
}

impl DashboardStatus {
    pub fn status_line(ticker_count: usize, visible: &[Panel]) -> String {
        let mut line = format!("Active: {ticker_count} Tickers");
        if !visible.is_empty() {
            let labels: Vec<&str> = visible.iter().map(|p| p.label()).collect();
            line.push_str(" | ");
            line.push_str(&labels.join(", "));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_parsing() {
        assert_eq!("Chart".parse::<Panel>(), Ok(Panel::Chart));
        assert_eq!("orderbook".parse::<Panel>(), Ok(Panel::OrderBook));
        assert_eq!("order-book".parse::<Panel>(), Ok(Panel::OrderBook));
        assert!("ticker".parse::<Panel>().is_err());
    }

    #[test]
    fn status_line_format() {
        assert_eq!(DashboardStatus::status_line(0, &[]), "Active: 0 Tickers");
        assert_eq!(
            DashboardStatus::status_line(5, &[Panel::Chart, Panel::OrderBook]),
            "Active: 5 Tickers | Chart, OrderBook"
        );
    }
}
