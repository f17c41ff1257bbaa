//! Failures below the JSON-RPC layer, plus node-reported call errors.

use thiserror::Error;

use crate::request::JsonRpcError;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failure or non-2xx status from an HTTP endpoint.
    #[error("HTTP transport: {0}")]
    Http(String),

    /// The socket dropped, or the client is between reconnects.
    #[error("WebSocket transport: {0}")]
    WebSocket(String),

    /// The node answered with an error object.
    #[error("node returned error {0}")]
    Rpc(JsonRpcError),

    #[error("no reply within {ms} ms")]
    Timeout { ms: u64 },

    /// The client has shut down and accepts no further requests.
    #[error("transport closed: {0}")]
    Closed(String),

    #[error("unexpected payload: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Whether sending the same request again may succeed.
    ///
    /// Node errors are final: a reverted `eth_call` reverts again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::WebSocket(_) | Self::Timeout { .. } => true,
            Self::Rpc(_) | Self::Closed(_) | Self::Deserialization(_) | Self::Other(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_problems_are_retryable() {
        assert!(TransportError::Http("503".into()).is_retryable());
        assert!(TransportError::WebSocket("reconnecting".into()).is_retryable());
        assert!(TransportError::Timeout { ms: 10 }.is_retryable());
    }

    #[test]
    fn reverts_and_shutdown_are_final() {
        assert!(!TransportError::Closed("gone".into()).is_retryable());
        let revert = TransportError::Rpc(JsonRpcError {
            code: 3,
            message: "execution reverted".into(),
            data: None,
        });
        assert!(!revert.is_retryable());
        assert_eq!(revert.to_string(), "node returned error code 3: execution reverted");
    }
}
