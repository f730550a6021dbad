//! Per-surface state: a stream handle plus the aggregator it feeds.

use crate::market_data::{CandleAggregator, OrderBookSnapshotStore, TickerState, TradeFeed};
use crate::stream::{StreamFactory, StreamHandle};
use crate::types::{Channel, Symbol, SymbolSet};

pub struct ChartPanel {
    pub handle: StreamHandle,
    pub candles: CandleAggregator,
    pub visible: bool,
}

impl ChartPanel {
    pub fn new(factory: &StreamFactory, symbol: Symbol) -> Self {
        Self {
            handle: factory.handle(symbol, Channel::Candle),
            candles: CandleAggregator::default(),
            visible: false,
        }
    }
}

pub struct OrderBookPanel {
    pub handle: StreamHandle,
    pub book: OrderBookSnapshotStore,
    pub visible: bool,
}

impl OrderBookPanel {
    pub fn new(factory: &StreamFactory, symbol: Symbol) -> Self {
        Self {
            handle: factory.handle(symbol, Channel::OrderBook),
            book: OrderBookSnapshotStore::new(),
            visible: false,
        }
    }
}

pub struct TradesPanel {
    pub handle: StreamHandle,
    pub trades: TradeFeed,
    pub visible: bool,
}

impl TradesPanel {
    pub fn new(factory: &StreamFactory, symbol: Symbol) -> Self {
        Self {
            handle: factory.handle(symbol, Channel::Trade),
            trades: TradeFeed::default(),
            visible: false,
        }
    }
}

pub struct TickerEntry {
    pub handle: StreamHandle,
    pub state: TickerState,
}

/// One running ticker stream per tracked symbol, kept in configuration order.
#[derive(Default)]
pub struct TickerBoard {
    entries: Vec<TickerEntry>,
}

impl TickerBoard {
    pub fn symbols(&self) -> Vec<Symbol> {
        self.entries.iter().map(|e| e.handle.symbol().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&TickerEntry> {
        self.entries.iter().find(|e| e.handle.symbol() == symbol)
    }

    pub fn get_mut(&mut self, symbol: &Symbol) -> Option<&mut TickerEntry> {
        self.entries.iter_mut().find(|e| e.handle.symbol() == symbol)
    }

    /// Stop and discard every ticker not in `wanted`, start the new ones.
    /// Returns `true` when the set changed.
    pub fn reconcile(&mut self, factory: &StreamFactory, allowed: &SymbolSet, wanted: &[Symbol]) -> bool {
        let before = self.symbols();

        self.entries.retain_mut(|entry| {
            let keep = wanted.contains(entry.handle.symbol());
            if !keep {
                entry.handle.stop();
            }
            keep
        });

        for symbol in wanted {
            if !allowed.contains(symbol) || self.get(symbol).is_some() {
                continue;
            }
            let mut handle = factory.handle(symbol.clone(), Channel::Ticker);
            handle.start();
            self.entries.push(TickerEntry {
                handle,
                state: TickerState::default(),
            });
        }

        self.entries
            .sort_by_key(|e| allowed.position(e.handle.symbol()).unwrap_or(usize::MAX));

        self.symbols() != before
    }

    pub fn stop_all(&mut self) {
        for entry in &mut self.entries {
            entry.handle.stop();
        }
    }
}
