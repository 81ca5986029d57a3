use streamfs_protocol::TransferMark;
use streamfs_rpc::RpcError;
use streamfs_storage::StorageError;
use streamfs_transfer::TransferError;

/// Errors that end a streaming call on the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("I/O error writing {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("frame for mark {actual} on transfer {expected}")]
    MarkMismatch {
        expected: TransferMark,
        actual: TransferMark,
    },

    #[error("data for {got} while {open} is open")]
    FileChanged { open: String, got: String },

    #[error("cancelled")]
    Cancelled,
}
