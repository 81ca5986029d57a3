//! Error types for the RPC layer.

use streamfs_protocol::ProtocolError;

/// Errors produced by channels, connectors and the server loop.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{what} of {len} bytes exceeds limit of {max}")]
    FrameTooLarge {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("connection timed out")]
    Timeout,

    #[error("channel closed by peer")]
    Closed,
}
