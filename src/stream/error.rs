use thiserror::Error;

use crate::types::Channel;

/// Failures a stream worker can report.
///
/// `Connect` and `Read` end the worker; `Parse` only drops the offending
/// frame.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("stream read failed: {0}")]
    Read(String),

    #[error("malformed {channel} payload: {reason}")]
    Parse { channel: Channel, reason: String },
}

impl StreamError {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Read(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Read(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        let connect = StreamError::Connect { url: "wss://x".into(), reason: "refused".into() };
        assert!(connect.is_transport());
        assert!(StreamError::Read("reset".into()).is_transport());
        let parse = StreamError::Parse { channel: Channel::Trade, reason: "missing field p".into() };
        assert!(!parse.is_transport());
        assert_eq!(parse.to_string(), "malformed trade payload: missing field p");
    }
}
