use tracing::{info, warn};

use super::error::StreamError;
use crate::types::StreamKey;

/// Receives lifecycle notifications from stream workers. Called from worker
/// tasks, never from the consumer context.
pub trait StreamObserver: Send + Sync {
    fn on_connected(&self, key: &StreamKey);
    fn on_error(&self, key: &StreamKey, error: &StreamError);
    fn on_closed(&self, key: &StreamKey);
}

/// Observer that writes to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl StreamObserver for LogObserver {
    fn on_connected(&self, key: &StreamKey) {
        info!(symbol = %key.symbol, channel = %key.channel, "stream connected");
    }

    fn on_error(&self, key: &StreamKey, error: &StreamError) {
        if error.is_transport() {
            warn!(symbol = %key.symbol, channel = %key.channel, error = %error, "stream failed, staying idle");
        } else {
            warn!(symbol = %key.symbol, channel = %key.channel, error = %error, "dropping malformed frame");
        }
    }

    fn on_closed(&self, key: &StreamKey) {
        info!(symbol = %key.symbol, channel = %key.channel, "stream closed");
    }
}
