//! Error types for the client engine.

use streamfs_protocol::TransferMark;
use streamfs_rpc::RpcError;
use streamfs_transfer::TransferError;

/// Errors surfaced to callers of [`TransferClient`](crate::TransferClient).
///
/// A missing remote file or a cancelled transfer is not an error; those end
/// in an outcome value instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame for mark {actual} on transfer {expected}")]
    MarkMismatch {
        expected: TransferMark,
        actual: TransferMark,
    },

    #[error("unexpected {got} frame while {state}")]
    UnexpectedFrame {
        got: &'static str,
        state: &'static str,
    },

    #[error("server error {code}: {message}")]
    Remote { code: i32, message: String },

    #[error("unexpected reply to {0}")]
    UnexpectedReply(&'static str),
}
