pub mod codec;
pub mod connector;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod observer;

#[cfg(test)]
pub mod testing;

pub use codec::{parse_frame, MarketEvent, StreamEndpoints};
pub use connector::{FeedConnector, FrameStream, WsConnector};
pub use dispatcher::{DispatchReceiver, Dispatcher, Envelope};
pub use error::StreamError;
pub use handle::{ActiveFlag, StreamFactory, StreamHandle, StreamState};
pub use observer::{LogObserver, StreamObserver};
