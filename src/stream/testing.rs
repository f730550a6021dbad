//! In-memory transport and observers for exercising stream lifecycles.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{self, BoxFuture};
use futures_util::{stream, FutureExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::connector::{FeedConnector, FrameStream};
use super::dispatcher::{DispatchReceiver, Dispatcher};
use super::error::StreamError;
use super::observer::StreamObserver;
use super::{StreamEndpoints, StreamFactory};
use crate::types::StreamKey;

type FrameSender = mpsc::UnboundedSender<Result<String, StreamError>>;

#[derive(Default)]
struct Script {
    attempts: Vec<String>,
    open: Vec<(String, FrameSender)>,
    refuse: HashSet<String>,
    stall: bool,
}

/// Connector whose connections are driven by the test.
#[derive(Default)]
pub struct ScriptedConnector {
    script: Mutex<Script>,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every connect attempt to `url` fail.
    pub fn refuse(&self, url: &str) {
        self.script.lock().refuse.insert(url.to_string());
    }

    /// Make connect attempts hang until the worker gives up.
    pub fn stall_connects(&self, stall: bool) {
        self.script.lock().stall = stall;
    }

    pub fn connect_count(&self, url: &str) -> usize {
        self.script.lock().attempts.iter().filter(|u| *u == url).count()
    }

    pub fn total_connects(&self) -> usize {
        self.script.lock().attempts.len()
    }

    /// Connections to `url` whose reading side is still held by a worker.
    pub fn open_count(&self, url: &str) -> usize {
        self.script
            .lock()
            .open
            .iter()
            .filter(|(u, tx)| u == url && !tx.is_closed())
            .count()
    }

    /// Deliver a text frame on the newest connection to `url`.
    pub fn send(&self, url: &str, text: &str) -> bool {
        self.push(url, Ok(text.to_string()))
    }

    /// Fail the newest connection to `url` mid-stream.
    pub fn fail_read(&self, url: &str, reason: &str) -> bool {
        self.push(url, Err(StreamError::Read(reason.to_string())))
    }

    /// End the newest connection to `url` as if the peer closed it.
    pub fn close(&self, url: &str) {
        let mut script = self.script.lock();
        if let Some(pos) = script.open.iter().rposition(|(u, _)| u == url) {
            script.open.remove(pos);
        }
    }

    fn push(&self, url: &str, item: Result<String, StreamError>) -> bool {
        let script = self.script.lock();
        script
            .open
            .iter()
            .rev()
            .find(|(u, _)| u == url)
            .map(|(_, tx)| tx.send(item).is_ok())
            .unwrap_or(false)
    }
}

impl FeedConnector for ScriptedConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<FrameStream, StreamError>> {
        let mut script = self.script.lock();
        script.attempts.push(url.to_string());

        if script.stall {
            return future::pending().boxed();
        }
        if script.refuse.contains(url) {
            let err = StreamError::Connect {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            };
            return future::ready(Err(err)).boxed();
        }

        let (tx, rx) = mpsc::unbounded_channel();
        script.open.push((url.to_string(), tx));
        let frames = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();
        future::ready(Ok(frames)).boxed()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Connected(StreamKey),
    Error(StreamKey, String),
    Closed(StreamKey),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().clone()
    }

    pub fn errors(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Observed::Error(..)))
            .count()
    }

    pub fn closed(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, Observed::Closed(..)))
            .count()
    }
}

impl StreamObserver for RecordingObserver {
    fn on_connected(&self, key: &StreamKey) {
        self.events.lock().push(Observed::Connected(key.clone()));
    }

    fn on_error(&self, key: &StreamKey, error: &StreamError) {
        self.events.lock().push(Observed::Error(key.clone(), error.to_string()));
    }

    fn on_closed(&self, key: &StreamKey) {
        self.events.lock().push(Observed::Closed(key.clone()));
    }
}

pub const TEST_BASE: &str = "wss://test.invalid/ws";

pub struct Harness {
    pub connector: Arc<ScriptedConnector>,
    pub observer: Arc<RecordingObserver>,
    pub factory: StreamFactory,
    pub receiver: DispatchReceiver,
}

pub fn harness() -> Harness {
    let connector = ScriptedConnector::new();
    let observer = RecordingObserver::new();
    let (dispatcher, receiver) = Dispatcher::channel();
    let factory = StreamFactory::new(
        StreamEndpoints::new(TEST_BASE, "1m"),
        connector.clone(),
        dispatcher,
        observer.clone(),
    );
    Harness {
        connector,
        observer,
        factory,
        receiver,
    }
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

/// Give spawned workers a chance to run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}
