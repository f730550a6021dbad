// =============================================================================
// Dashboard Coordinator — the single consumer context
// =============================================================================
//
// Owns every aggregator and every stream handle. Workers only ever reach this
// state through envelopes applied by `apply`, which runs on the dashboard's
// own task; nothing here is shared, so nothing here is locked.
//
// Ordering rules:
//   * a panel's handle is stopped before its state is cleared or frozen
//   * the chart is bootstrapped before its stream is started
//   * envelopes whose session flag is lowered are dropped on arrival
// =============================================================================

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::panels::{ChartPanel, OrderBookPanel, TickerBoard, TradesPanel};
use super::render::{RenderFrame, RenderSink};
use super::{DashboardCommand, DashboardStatus, Panel, PanelStatus};
use crate::binance::CandleSource;
#[cfg(test)]
use crate::market_data::{CandleAggregator, OrderBookSnapshotStore, TickerSnapshot, TradeFeed};
use crate::preferences::{PreferencesRecord, PreferencesStore};
use crate::stream::{DispatchReceiver, Envelope, MarketEvent, StreamFactory, StreamHandle, StreamState};
use crate::types::{Symbol, SymbolSet};

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub symbols: SymbolSet,
    pub initial_symbol: Symbol,
    pub history_limit: u32,
}

pub struct Dashboard {
    symbols: SymbolSet,
    history_limit: u32,
    factory: StreamFactory,
    source: Arc<dyn CandleSource>,
    prefs: PreferencesStore,
    sink: Box<dyn RenderSink>,
    chart: ChartPanel,
    orderbook: OrderBookPanel,
    trades: TradesPanel,
    tickers: TickerBoard,
}

impl Dashboard {
    pub fn new(
        settings: DashboardSettings,
        factory: StreamFactory,
        source: Arc<dyn CandleSource>,
        prefs: PreferencesStore,
        sink: Box<dyn RenderSink>,
    ) -> Self {
        let symbol = settings.initial_symbol;
        Self {
            chart: ChartPanel::new(&factory, symbol.clone()),
            orderbook: OrderBookPanel::new(&factory, symbol.clone()),
            trades: TradesPanel::new(&factory, symbol),
            tickers: TickerBoard::default(),
            symbols: settings.symbols,
            history_limit: settings.history_limit,
            factory,
            source,
            prefs,
            sink,
        }
    }

    // -------------------------------------------------------------------------
    // Visibility
    // -------------------------------------------------------------------------

    /// Apply the stored preferences. Called once before the event loop starts.
    pub async fn restore(&mut self) {
        let record = self.prefs.load_or_default(&self.symbols);
        self.tickers
            .reconcile(&self.factory, &self.symbols, &record.visible_tickers);

        let wanted = [
            (Panel::Chart, record.chart_visible),
            (Panel::OrderBook, record.orderbook_visible),
            (Panel::Trades, record.trades_visible),
        ];
        for (panel, visible) in wanted {
            if visible {
                self.open(panel).await;
            }
        }

        self.render_status();
        info!(
            tickers = self.tickers.len(),
            chart = record.chart_visible,
            orderbook = record.orderbook_visible,
            trades = record.trades_visible,
            "dashboard restored"
        );
    }

    pub async fn show(&mut self, panel: Panel) {
        let was_visible = self.is_visible(panel);
        self.open(panel).await;
        if !was_visible {
            self.persist();
        }
        self.render_status();
    }

    pub fn hide(&mut self, panel: Panel) {
        if !self.is_visible(panel) {
            return;
        }
        self.panel_handle_mut(panel).stop();
        match panel {
            Panel::Chart => self.chart.visible = false,
            Panel::OrderBook => self.orderbook.visible = false,
            Panel::Trades => self.trades.visible = false,
        }
        info!(panel = %panel, "panel hidden");
        self.persist();
        self.render_status();
    }

    pub async fn toggle(&mut self, panel: Panel) {
        if self.is_visible(panel) {
            self.hide(panel);
        } else {
            self.show(panel).await;
        }
    }

    /// Mark visible and make sure the stream runs. A chart that was hidden,
    /// or never got its history, is bootstrapped before the stream starts.
    async fn open(&mut self, panel: Panel) {
        let was_visible = self.is_visible(panel);
        let mut refreshed = false;
        match panel {
            Panel::Chart => {
                self.chart.visible = true;
                // restarting a dead stream refetches history
                if !was_visible || !self.chart.handle.is_running() || self.chart.candles.is_empty() {
                    self.chart.handle.stop();
                    self.bootstrap_chart().await;
                    refreshed = true;
                }
                self.chart.handle.start();
            }
            Panel::OrderBook => {
                self.orderbook.visible = true;
                self.orderbook.handle.start();
            }
            Panel::Trades => {
                self.trades.visible = true;
                self.trades.handle.start();
            }
        }
        if !was_visible {
            info!(panel = %panel, symbol = %self.panel_symbol(panel), "panel shown");
        }
        if !was_visible || refreshed {
            self.render_panel(panel);
        }
    }

    async fn bootstrap_chart(&mut self) {
        let symbol = self.chart.handle.symbol().clone();
        match self.source.recent_candles(&symbol, self.history_limit).await {
            Ok(candles) => {
                self.chart.candles.bootstrap(candles);
                info!(symbol = %symbol, count = self.chart.candles.len(), "chart history loaded");
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %format!("{e:#}"), "chart history fetch failed");
                self.chart.candles.clear();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Symbols
    // -------------------------------------------------------------------------

    /// Rebind a panel to `symbol`. Dependent state is cleared; a hidden panel
    /// stays disconnected until shown.
    pub async fn change_symbol(&mut self, panel: Panel, symbol: Symbol) -> bool {
        if !self.symbols.contains(&symbol) {
            warn!(panel = %panel, symbol = %symbol, "symbol not in allowed set");
            return false;
        }
        if *self.panel_symbol(panel) == symbol {
            return false;
        }

        info!(panel = %panel, from = %self.panel_symbol(panel), to = %symbol, "changing symbol");
        match panel {
            Panel::Chart => {
                self.chart.handle.stop();
                self.chart.candles.clear();
                self.chart.handle.change_symbol(symbol, false);
                if self.chart.visible {
                    self.bootstrap_chart().await;
                    self.chart.handle.start();
                }
            }
            Panel::OrderBook => {
                self.orderbook.handle.stop();
                self.orderbook.book.clear();
                let visible = self.orderbook.visible;
                self.orderbook.handle.change_symbol(symbol, visible);
            }
            Panel::Trades => {
                self.trades.handle.stop();
                self.trades.trades.clear();
                let visible = self.trades.visible;
                self.trades.handle.change_symbol(symbol, visible);
            }
        }

        if self.is_visible(panel) {
            self.render_panel(panel);
        }
        self.render_status();
        true
    }

    /// Replace the tracked ticker set. Symbols outside the allowed set are
    /// ignored.
    pub fn set_tickers(&mut self, symbols: Vec<Symbol>) {
        let changed = self.tickers.reconcile(&self.factory, &self.symbols, &symbols);
        if changed {
            info!(tickers = ?self.tickers.symbols(), "ticker set updated");
        }
        self.persist();
        self.render_status();
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Apply one envelope. Returns `true` if state changed.
    pub fn apply(&mut self, envelope: Envelope) -> bool {
        if !envelope.is_live() {
            trace!(key = %envelope.key, "dropping stale event");
            return false;
        }

        let Envelope { key, event, .. } = envelope;
        match event {
            MarketEvent::Kline(candle) => {
                if !self.chart.candles.ingest(&candle).mutated() {
                    return false;
                }
                self.render_panel(Panel::Chart);
            }
            MarketEvent::Depth(snapshot) => {
                self.orderbook.book.replace(snapshot.bids, snapshot.asks);
                self.render_panel(Panel::OrderBook);
            }
            MarketEvent::Trade(trade) => {
                self.trades.trades.append(trade);
                self.render_panel(Panel::Trades);
            }
            MarketEvent::Ticker(snapshot) => {
                let Some(entry) = self.tickers.get_mut(&key.symbol) else {
                    debug!(key = %key, "ticker event for untracked symbol");
                    return false;
                };
                entry.state.replace(snapshot);
                if let Some(latest) = entry.state.latest() {
                    self.sink.render(RenderFrame::Ticker {
                        symbol: &key.symbol,
                        ticker: latest,
                    });
                }
            }
        }
        true
    }

    pub async fn handle_command(&mut self, command: DashboardCommand) {
        debug!(command = ?command, "dashboard command");
        match command {
            DashboardCommand::Show(panel) => self.show(panel).await,
            DashboardCommand::Hide(panel) => self.hide(panel),
            DashboardCommand::Toggle(panel) => self.toggle(panel).await,
            DashboardCommand::ChangeSymbol(panel, symbol) => {
                self.change_symbol(panel, symbol).await;
            }
            DashboardCommand::SetTickers(symbols) => self.set_tickers(symbols),
            DashboardCommand::Shutdown => self.shutdown(),
        }
    }

    /// Consumer loop. Ends on `Shutdown` or when every command sender is gone.
    pub async fn run(
        mut self,
        mut events: DispatchReceiver,
        mut commands: mpsc::Receiver<DashboardCommand>,
    ) {
        info!("dashboard consumer running");
        loop {
            tokio::select! {
                Some(envelope) = events.recv() => {
                    self.apply(envelope);
                }
                command = commands.recv() => match command {
                    Some(DashboardCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
            }
        }
        self.shutdown();
        info!("dashboard consumer stopped");
    }

    /// Stop every stream and write the preferences.
    pub fn shutdown(&mut self) {
        for panel in Panel::ALL {
            self.panel_handle_mut(panel).stop();
        }
        self.tickers.stop_all();
        self.persist();
    }

    // -------------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------------

    pub fn is_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::Chart => self.chart.visible,
            Panel::OrderBook => self.orderbook.visible,
            Panel::Trades => self.trades.visible,
        }
    }

    pub fn panel_symbol(&self, panel: Panel) -> &Symbol {
        self.panel_handle(panel).symbol()
    }

    pub fn stream_state(&self, panel: Panel) -> StreamState {
        self.panel_handle(panel).state()
    }

    pub fn status(&self) -> DashboardStatus {
        let visible: Vec<Panel> = Panel::ALL
            .into_iter()
            .filter(|p| self.is_visible(*p))
            .collect();
        let panels = Panel::ALL
            .into_iter()
            .map(|panel| PanelStatus {
                panel,
                symbol: self.panel_symbol(panel).clone(),
                visible: self.is_visible(panel),
                stream: self.stream_state(panel),
            })
            .collect();
        DashboardStatus {
            line: DashboardStatus::status_line(self.tickers.len(), &visible),
            tickers: self.tickers.symbols(),
            panels,
        }
    }

    fn panel_handle(&self, panel: Panel) -> &StreamHandle {
        match panel {
            Panel::Chart => &self.chart.handle,
            Panel::OrderBook => &self.orderbook.handle,
            Panel::Trades => &self.trades.handle,
        }
    }

    fn panel_handle_mut(&mut self, panel: Panel) -> &mut StreamHandle {
        match panel {
            Panel::Chart => &mut self.chart.handle,
            Panel::OrderBook => &mut self.orderbook.handle,
            Panel::Trades => &mut self.trades.handle,
        }
    }

    fn render_panel(&mut self, panel: Panel) {
        let frame = match panel {
            Panel::Chart => RenderFrame::Candles {
                symbol: self.chart.handle.symbol(),
                candles: &self.chart.candles,
            },
            Panel::OrderBook => RenderFrame::OrderBook {
                symbol: self.orderbook.handle.symbol(),
                book: &self.orderbook.book,
            },
            Panel::Trades => RenderFrame::Trades {
                symbol: self.trades.handle.symbol(),
                trades: &self.trades.trades,
            },
        };
        self.sink.render(frame);
    }

    fn render_status(&mut self) {
        let status = self.status();
        self.sink.render(RenderFrame::Status(&status));
    }

    fn persist(&self) {
        let record = PreferencesRecord {
            visible_tickers: self.tickers.symbols(),
            chart_visible: self.chart.visible,
            orderbook_visible: self.orderbook.visible,
            trades_visible: self.trades.visible,
        };
        self.prefs.save(&record);
    }
}

#[cfg(test)]
impl Dashboard {
    pub fn candles(&self) -> &CandleAggregator {
        &self.chart.candles
    }

    pub fn order_book(&self) -> &OrderBookSnapshotStore {
        &self.orderbook.book
    }

    pub fn trade_feed(&self) -> &TradeFeed {
        &self.trades.trades
    }

    pub fn ticker(&self, symbol: &Symbol) -> Option<&TickerSnapshot> {
        self.tickers.get(symbol).and_then(|e| e.state.latest())
    }

    pub fn ticker_symbols(&self) -> Vec<Symbol> {
        self.tickers.symbols()
    }
}
