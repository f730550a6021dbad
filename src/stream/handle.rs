// =============================================================================
// Stream Handle — one connection + worker per (symbol, channel)
// =============================================================================
//
// Idle -> Connecting -> Active -> Closing -> Idle
//
// Every `start()` opens a new session with a fresh active flag. `stop()`
// lowers the flag, signals the worker and returns without joining it. The
// worker exits on its own; anything it manages to submit afterwards carries
// the lowered flag and is dropped by the consumer.
//
// Transport failures end the session and leave the handle Idle. Nothing
// reconnects until the owner calls `start()` again.
// =============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, info};

use super::codec::{parse_frame, StreamEndpoints};
use super::connector::FeedConnector;
use super::dispatcher::{Dispatcher, Envelope};
use super::observer::StreamObserver;
use crate::types::{Channel, StreamKey, Symbol};

// ---------------------------------------------------------------------------
// ActiveFlag
// ---------------------------------------------------------------------------

/// Cooperative cancellation and staleness signal shared by one session's
/// worker and every envelope it produces. Once lowered it is never raised
/// again.
#[derive(Clone)]
pub struct ActiveFlag(Arc<AtomicBool>);

impl ActiveFlag {
    pub fn raised() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn lower(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether both flags belong to the same session.
    #[cfg(test)]
    pub fn same_session(&self, other: &ActiveFlag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ActiveFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActiveFlag").field(&self.is_raised()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Idle,
    Connecting,
    Active,
    Closing,
}

struct Session {
    flag: ActiveFlag,
    close: Notify,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

pub struct StreamHandle {
    key: StreamKey,
    url: String,
    state: Arc<Mutex<StreamState>>,
    session: Option<Arc<Session>>,
    endpoints: Arc<StreamEndpoints>,
    connector: Arc<dyn FeedConnector>,
    dispatcher: Dispatcher,
    observer: Arc<dyn StreamObserver>,
}

impl StreamHandle {
    #[cfg(test)]
    pub fn key(&self) -> &StreamKey {
        &self.key
    }

    pub fn symbol(&self) -> &Symbol {
        &self.key.symbol
    }

    #[cfg(test)]
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    /// Connecting or Active.
    pub fn is_running(&self) -> bool {
        matches!(self.state(), StreamState::Connecting | StreamState::Active)
    }

    /// Flag of the most recent session, if any was started.
    #[cfg(test)]
    pub fn active_flag(&self) -> Option<ActiveFlag> {
        self.session.as_ref().map(|s| s.flag.clone())
    }

    /// Open the connection and spawn its worker. No-op while Connecting or
    /// Active. Must be called inside a tokio runtime.
    pub fn start(&mut self) -> bool {
        {
            let mut state = self.state.lock();
            if matches!(*state, StreamState::Connecting | StreamState::Active) {
                debug!(key = %self.key, "start ignored, stream already running");
                return false;
            }
            *state = StreamState::Connecting;
        }

        let session = Arc::new(Session {
            flag: ActiveFlag::raised(),
            close: Notify::new(),
        });
        self.session = Some(session.clone());

        let worker = Worker {
            key: self.key.clone(),
            url: self.url.clone(),
            state: self.state.clone(),
            session,
            connector: self.connector.clone(),
            dispatcher: self.dispatcher.clone(),
            observer: self.observer.clone(),
        };
        info!(key = %self.key, url = %self.url, "starting stream");
        tokio::spawn(worker.run());
        true
    }

    /// Lower the active flag and ask the worker to close. Does not wait for
    /// the worker to exit.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let was_running = {
            let mut state = self.state.lock();
            session.flag.lower();
            let running = *state != StreamState::Idle;
            if running {
                *state = StreamState::Closing;
            }
            running
        };

        session.close.notify_one();

        if was_running {
            *self.state.lock() = StreamState::Idle;
            info!(key = %self.key, "stream stopped");
        }
    }

    /// Stop, rebind to `symbol` and start again only if `visible`.
    pub fn change_symbol(&mut self, symbol: Symbol, visible: bool) {
        self.stop();
        self.key.symbol = symbol;
        self.url = self.endpoints.url_for(&self.key);
        if visible {
            self.start();
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("key", &self.key)
            .field("url", &self.url)
            .field("state", &self.state())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct Worker {
    key: StreamKey,
    url: String,
    state: Arc<Mutex<StreamState>>,
    session: Arc<Session>,
    connector: Arc<dyn FeedConnector>,
    dispatcher: Dispatcher,
    observer: Arc<dyn StreamObserver>,
}

impl Worker {
    async fn run(self) {
        let connecting = self.connector.connect(&self.url);
        let connected = tokio::select! {
            _ = self.session.close.notified() => None,
            res = connecting => Some(res),
        };

        let mut frames = match connected {
            None => {
                debug!(key = %self.key, "stopped while connecting");
                return;
            }
            Some(Err(e)) => {
                self.observer.on_error(&self.key, &e);
                self.retire();
                return;
            }
            Some(Ok(frames)) => frames,
        };

        {
            let mut state = self.state.lock();
            if !self.session.flag.is_raised() {
                debug!(key = %self.key, "stopped before connection was established");
                return;
            }
            *state = StreamState::Active;
        }
        self.observer.on_connected(&self.key);

        loop {
            let next = tokio::select! {
                _ = self.session.close.notified() => break,
                next = frames.next() => next,
            };

            match next {
                Some(Ok(text)) => {
                    if !self.session.flag.is_raised() {
                        break;
                    }
                    match parse_frame(self.key.channel, &text) {
                        Ok(event) => {
                            let envelope = Envelope {
                                key: self.key.clone(),
                                flag: self.session.flag.clone(),
                                event,
                            };
                            if !self.dispatcher.submit(envelope) {
                                debug!(key = %self.key, "consumer gone, ending stream");
                                self.retire();
                                break;
                            }
                        }
                        Err(e) => self.observer.on_error(&self.key, &e),
                    }
                }
                Some(Err(e)) => {
                    self.observer.on_error(&self.key, &e);
                    self.retire();
                    break;
                }
                None => {
                    debug!(key = %self.key, "stream ended by peer");
                    self.retire();
                    break;
                }
            }
        }

        drop(frames);
        self.observer.on_closed(&self.key);
    }

    /// End the session from the worker side. Only touches the handle state
    /// while this session is still the live one.
    fn retire(&self) {
        let mut state = self.state.lock();
        if self.session.flag.is_raised() {
            self.session.flag.lower();
            *state = StreamState::Idle;
        }
    }
}

// ---------------------------------------------------------------------------
// StreamFactory
// ---------------------------------------------------------------------------

/// Builds handles that share one transport, dispatcher and observer.
#[derive(Clone)]
pub struct StreamFactory {
    endpoints: Arc<StreamEndpoints>,
    connector: Arc<dyn FeedConnector>,
    dispatcher: Dispatcher,
    observer: Arc<dyn StreamObserver>,
}

impl StreamFactory {
    pub fn new(
        endpoints: StreamEndpoints,
        connector: Arc<dyn FeedConnector>,
        dispatcher: Dispatcher,
        observer: Arc<dyn StreamObserver>,
    ) -> Self {
        Self {
            endpoints: Arc::new(endpoints),
            connector,
            dispatcher,
            observer,
        }
    }

    /// A new Idle handle for `(symbol, channel)`.
    pub fn handle(&self, symbol: Symbol, channel: Channel) -> StreamHandle {
        let key = StreamKey::new(symbol, channel);
        let url = self.endpoints.url_for(&key);
        StreamHandle {
            key,
            url,
            state: Arc::new(Mutex::new(StreamState::Idle)),
            session: None,
            endpoints: self.endpoints.clone(),
            connector: self.connector.clone(),
            dispatcher: self.dispatcher.clone(),
            observer: self.observer.clone(),
        }
    }
}
