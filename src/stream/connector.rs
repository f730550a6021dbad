use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use super::error::StreamError;

/// Text frames from an open connection. The stream ends when the peer
/// closes; dropping it closes the transport.
pub type FrameStream = BoxStream<'static, Result<String, StreamError>>;

/// Opens a streaming connection for a URL.
pub trait FeedConnector: Send + Sync {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<FrameStream, StreamError>>;
}

/// WebSocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

impl FeedConnector for WsConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<FrameStream, StreamError>> {
        let url = url.to_string();
        async move {
            info!(url = %url, "connecting to WebSocket");
            let (ws_stream, _response) =
                connect_async(url.as_str())
                    .await
                    .map_err(|e| StreamError::Connect {
                        url: url.clone(),
                        reason: e.to_string(),
                    })?;

            let frames = ws_stream.filter_map(|msg| async move {
                match msg {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(Message::Close(frame)) => {
                        debug!(frame = ?frame, "close frame received");
                        None
                    }
                    // Ping / Pong / Binary: tungstenite answers pings itself.
                    Ok(_) => None,
                    Err(e) => Some(Err(StreamError::from(e))),
                }
            });

            Ok(frames.boxed())
        }
        .boxed()
    }
}
