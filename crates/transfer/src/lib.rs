//! Chunking, reassembly and per-call bookkeeping for streamfs transfers.
//!
//! [`ChunkReader`] cuts a source into numbered windows on the sending side;
//! [`ChunkBuffer`] collects received windows and writes them back out in
//! block order on the receiving side.

mod buffer;
mod chunked;
mod config;
mod progress;
mod types;

pub use buffer::ChunkBuffer;
pub use chunked::ChunkReader;
pub use config::{ConfigError, TransferConfig};
pub use progress::{ProgressCallback, ProgressReporter};
pub use types::TransferSession;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("too many chunks for one transfer")]
    TooManyChunks,

    #[error("duplicate block {0}")]
    DuplicateBlock(u32),

    #[error("block {block} arrived after output advanced to block {expected}")]
    LateBlock { block: u32, expected: u32 },

    #[error("block {expected} missing at end of file ({pending} later blocks pending)")]
    MissingBlock { expected: u32, pending: usize },
}
