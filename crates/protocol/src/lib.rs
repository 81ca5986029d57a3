//! Wire vocabulary for streamfs transfers.
//!
//! A file travels as a sequence of [`Chunk`]s that share one
//! [`TransferMark`]. The `block` field of each chunk is either a 1-based data
//! index or one of the sentinels below; [`Frame`] is the typed view of it.

pub mod frame;
pub mod messages;
pub mod types;

pub use frame::{Chunk, DataChunk, Frame, ProtocolError};
pub use messages::{Call, MetadataRequest, Reply};
pub use types::{DirEntry, ProgressEvent, TransferMark};

/// Block value of the end-of-file frame.
pub const BLOCK_END_OF_FILE: i32 = 0;

/// Block value of the abort frame.
pub const BLOCK_ABORT: i32 = -1;

/// Block value of the end-of-session frame.
pub const BLOCK_END_OF_SESSION: i32 = -2;

/// Upper bound for the content of a single chunk (64 MiB).
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;
