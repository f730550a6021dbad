// =============================================================================
// Render seam — what the dashboard hands to whatever draws it
// =============================================================================
//
// The dashboard calls `RenderSink::render` after every state mutation, always
// from its own task. `BoardSink` turns those frames into a serialisable
// snapshot that the HTTP layer reads.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use super::{DashboardStatus, Panel};
use crate::market_data::{
    Candle, CandleAggregator, OrderBookLevel, OrderBookSnapshotStore, TickerSnapshot, TradeFeed,
    TradeSide, Trend,
};
use crate::types::Symbol;

/// Borrowed view of the state that just changed.
#[derive(Debug, Clone, Copy)]
pub enum RenderFrame<'a> {
    Candles {
        symbol: &'a Symbol,
        candles: &'a CandleAggregator,
    },
    OrderBook {
        symbol: &'a Symbol,
        book: &'a OrderBookSnapshotStore,
    },
    Trades {
        symbol: &'a Symbol,
        trades: &'a TradeFeed,
    },
    Ticker {
        symbol: &'a Symbol,
        ticker: &'a TickerSnapshot,
    },
    Status(&'a DashboardStatus),
}

pub trait RenderSink: Send {
    fn render(&mut self, frame: RenderFrame<'_>);
}

// =============================================================================
// Snapshot views
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    pub symbol: Symbol,
    pub display_name: String,
    pub candles: Vec<Candle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelView {
    pub price: f64,
    pub quantity: f64,
    pub total: f64,
}

impl From<&OrderBookLevel> for LevelView {
    fn from(level: &OrderBookLevel) -> Self {
        Self {
            price: level.price,
            quantity: level.quantity,
            total: level.total(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderBookView {
    pub symbol: Symbol,
    pub display_name: String,
    /// Highest ask first.
    pub asks: Vec<LevelView>,
    pub bids: Vec<LevelView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeView {
    pub time: String,
    pub price: f64,
    pub quantity: f64,
    pub side: TradeSide,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradesView {
    pub symbol: Symbol,
    pub display_name: String,
    pub trades: Vec<TradeView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickerView {
    pub symbol: Symbol,
    pub display_name: String,
    pub price: String,
    pub change: String,
    pub volume: String,
    pub high: f64,
    pub low: f64,
    pub trend: Trend,
}

/// Everything the board currently shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BoardSnapshot {
    pub version: u64,
    pub status: Option<DashboardStatus>,
    pub chart: Option<ChartView>,
    pub orderbook: Option<OrderBookView>,
    pub trades: Option<TradesView>,
    pub tickers: Vec<TickerView>,
}

// =============================================================================
// BoardSink
// =============================================================================

/// Shared read side of the board.
#[derive(Clone, Default)]
pub struct SharedBoard {
    snapshot: Arc<RwLock<BoardSnapshot>>,
    version: Arc<AtomicU64>,
}

impl SharedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.snapshot.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    pub fn sink(&self) -> BoardSink {
        BoardSink {
            board: self.clone(),
        }
    }
}

/// Sink that projects frames into a [`SharedBoard`].
pub struct BoardSink {
    board: SharedBoard,
}

impl RenderSink for BoardSink {
    fn render(&mut self, frame: RenderFrame<'_>) {
        let version = self.board.version.fetch_add(1, Ordering::Relaxed) + 1;
        let mut guard = self.board.snapshot.write();
        let snap = &mut *guard;
        snap.version = version;

        match frame {
            RenderFrame::Candles { symbol, candles } => {
                snap.chart = Some(ChartView {
                    symbol: symbol.clone(),
                    display_name: symbol.display_name(),
                    candles: candles.to_vec(),
                });
            }
            RenderFrame::OrderBook { symbol, book } => {
                snap.orderbook = Some(OrderBookView {
                    symbol: symbol.clone(),
                    display_name: symbol.display_name(),
                    asks: book.display_asks().map(LevelView::from).collect(),
                    bids: book.bids().iter().map(LevelView::from).collect(),
                });
            }
            RenderFrame::Trades { symbol, trades } => {
                snap.trades = Some(TradesView {
                    symbol: symbol.clone(),
                    display_name: symbol.display_name(),
                    trades: trades
                        .iter()
                        .map(|t| TradeView {
                            time: t.time_label(),
                            price: t.price,
                            quantity: t.quantity,
                            side: t.side(),
                        })
                        .collect(),
                });
            }
            RenderFrame::Ticker { symbol, ticker } => {
                let view = TickerView {
                    symbol: symbol.clone(),
                    display_name: symbol.display_name(),
                    price: ticker.price_label(),
                    change: ticker.change_label(),
                    volume: ticker.volume_label(),
                    high: ticker.high,
                    low: ticker.low,
                    trend: ticker.trend(),
                };
                match snap.tickers.iter().position(|t| t.symbol == *symbol) {
                    Some(pos) => snap.tickers[pos] = view,
                    None => snap.tickers.push(view),
                }
            }
            RenderFrame::Status(status) => {
                snap.tickers.retain(|t| status.tickers.contains(&t.symbol));
                snap.tickers.sort_by_key(|t| {
                    status.tickers.iter().position(|s| *s == t.symbol).unwrap_or(usize::MAX)
                });
                for panel in &status.panels {
                    if !panel.visible {
                        match panel.panel {
                            Panel::Chart => snap.chart = None,
                            Panel::OrderBook => snap.orderbook = None,
                            Panel::Trades => snap.trades = None,
                        }
                    }
                }
                snap.status = Some(status.clone());
            }
        }
    }
}

#[cfg(test)]
pub mod recording {
    use super::*;

    /// What a frame looked like when it was rendered.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Rendered {
        Candles { symbol: Symbol, len: usize, last_close: Option<f64> },
        OrderBook { symbol: Symbol, bids: usize, asks: usize },
        Trades { symbol: Symbol, len: usize },
        Ticker { symbol: Symbol, last_price: f64 },
        Status(String),
    }

    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub frames: Arc<parking_lot::Mutex<Vec<Rendered>>>,
    }

    impl RecordingSink {
        pub fn take(&self) -> Vec<Rendered> {
            std::mem::take(&mut *self.frames.lock())
        }
    }

    impl RenderSink for RecordingSink {
        fn render(&mut self, frame: RenderFrame<'_>) {
            let rendered = match frame {
                RenderFrame::Candles { symbol, candles } => Rendered::Candles {
                    symbol: symbol.clone(),
                    len: candles.len(),
                    last_close: candles.last().map(|c| c.close),
                },
                RenderFrame::OrderBook { symbol, book } => Rendered::OrderBook {
                    symbol: symbol.clone(),
                    bids: book.bids().len(),
                    asks: book.asks().len(),
                },
                RenderFrame::Trades { symbol, trades } => Rendered::Trades {
                    symbol: symbol.clone(),
                    len: trades.len(),
                },
                RenderFrame::Ticker { symbol, ticker } => Rendered::Ticker {
                    symbol: symbol.clone(),
                    last_price: ticker.last_price,
                },
                RenderFrame::Status(status) => Rendered::Status(status.line.clone()),
            };
            self.frames.lock().push(rendered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::PanelStatus;
    use crate::market_data::Trade;
    use crate::stream::StreamState;
    use crate::types::sym;

    fn status(tickers: &[&str], chart_visible: bool) -> DashboardStatus {
        DashboardStatus {
            line: String::new(),
            tickers: tickers.iter().map(|s| sym(s)).collect(),
            panels: vec![PanelStatus {
                panel: Panel::Chart,
                symbol: sym("btcusdt"),
                visible: chart_visible,
                stream: StreamState::Idle,
            }],
        }
    }

    #[test]
    fn board_tracks_tickers_and_versions() {
        let board = SharedBoard::new();
        let mut sink = board.sink();
        let ticker = TickerSnapshot { last_price: 61_234.5, volume: 2_500_000.0, ..Default::default() };

        sink.render(RenderFrame::Ticker { symbol: &sym("ethusdt"), ticker: &ticker });
        sink.render(RenderFrame::Ticker { symbol: &sym("btcusdt"), ticker: &ticker });
        sink.render(RenderFrame::Ticker { symbol: &sym("btcusdt"), ticker: &ticker });
        assert_eq!(board.snapshot().tickers.len(), 2);

        sink.render(RenderFrame::Status(&status(&["btcusdt", "ethusdt"], false)));
        let snap = board.snapshot();
        assert_eq!(snap.version, 4);
        assert_eq!(board.version(), 4);
        assert_eq!(snap.tickers[0].symbol, sym("btcusdt"));
        assert_eq!(snap.tickers[0].price, "61,234.50");
        assert_eq!(snap.tickers[0].volume, "2.50M");
        assert_eq!(snap.tickers[0].display_name, "BTC/USDT");

        sink.render(RenderFrame::Status(&status(&["ethusdt"], false)));
        let snap = board.snapshot();
        assert_eq!(snap.tickers.len(), 1);
        assert_eq!(snap.tickers[0].symbol, sym("ethusdt"));
    }

    #[test]
    fn hidden_panel_is_removed_from_board() {
        let board = SharedBoard::new();
        let mut sink = board.sink();
        let mut agg = CandleAggregator::default();
        agg.bootstrap(vec![crate::market_data::candle_buffer::sample_candle(0, 1.0)]);

        sink.render(RenderFrame::Candles { symbol: &sym("btcusdt"), candles: &agg });
        assert!(board.snapshot().chart.is_some());
        sink.render(RenderFrame::Status(&status(&[], true)));
        assert!(board.snapshot().chart.is_some());
        sink.render(RenderFrame::Status(&status(&[], false)));
        assert!(board.snapshot().chart.is_none());
    }

    #[test]
    fn book_and_trades_are_projected_for_display() {
        let board = SharedBoard::new();
        let mut sink = board.sink();

        let mut book = OrderBookSnapshotStore::new();
        book.replace(
            vec![OrderBookLevel { price: 99.0, quantity: 2.0 }],
            vec![
                OrderBookLevel { price: 100.0, quantity: 1.0 },
                OrderBookLevel { price: 101.0, quantity: 3.0 },
            ],
        );
        sink.render(RenderFrame::OrderBook { symbol: &sym("btcusdt"), book: &book });

        let mut trades = TradeFeed::default();
        trades.append(Trade { timestamp_ms: 0, price: 1.0, quantity: 2.0, is_seller_initiated: true });
        sink.render(RenderFrame::Trades { symbol: &sym("btcusdt"), trades: &trades });

        let snap = board.snapshot();
        let ob = snap.orderbook.unwrap();
        assert_eq!(ob.asks[0].price, 101.0);
        assert_eq!(ob.asks[0].total, 303.0);
        assert_eq!(ob.bids[0].total, 198.0);
        let tv = snap.trades.unwrap();
        assert_eq!(tv.trades[0].side, TradeSide::Sell);

        let json = serde_json::to_value(board.snapshot()).unwrap();
        assert_eq!(json["trades"]["trades"][0]["side"], "SELL");
    }
}
