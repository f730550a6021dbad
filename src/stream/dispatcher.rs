// =============================================================================
// Dispatcher — hand-off from stream workers to the consumer context
// =============================================================================
//
// Any number of workers submit concurrently; a single receiver applies the
// events. One unbounded FIFO channel keeps each worker's events in the order
// it produced them. Staleness is not checked here: every envelope carries its
// session's active flag and the consumer checks it when applying.
// =============================================================================

use tokio::sync::mpsc;

use super::codec::MarketEvent;
use super::handle::ActiveFlag;
use crate::types::StreamKey;

/// One parsed event plus the identity and liveness of the session that
/// produced it.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub key: StreamKey,
    pub flag: ActiveFlag,
    pub event: MarketEvent,
}

impl Envelope {
    /// False once the producing session has been stopped.
    pub fn is_live(&self) -> bool {
        self.flag.is_raised()
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Envelope>,
}

pub struct DispatchReceiver {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl Dispatcher {
    pub fn channel() -> (Dispatcher, DispatchReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Dispatcher { tx }, DispatchReceiver { rx })
    }

    /// Enqueue without blocking. Returns `false` once the consumer is gone.
    pub fn submit(&self, envelope: Envelope) -> bool {
        self.tx.send(envelope).is_ok()
    }
}

impl DispatchReceiver {
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}
