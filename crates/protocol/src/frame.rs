//! Typed frames and their mapping onto the integer `block` field.

use crate::types::TransferMark;
use crate::{BLOCK_ABORT, BLOCK_END_OF_FILE, BLOCK_END_OF_SESSION};

/// Errors produced while decoding or encoding frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid block value: {0}")]
    InvalidBlock(i32),

    #[error("sentinel block {block} carries {len} content bytes")]
    SentinelWithContent { block: i32, len: usize },

    #[error("block number {0} does not fit the wire format")]
    BlockOverflow(u32),
}

/// A data-bearing slice of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChunk {
    /// 1-based sequence number assigned by the producer.
    pub block: u32,
    pub content: Vec<u8>,
}

impl DataChunk {
    pub fn new(block: u32, content: Vec<u8>) -> Self {
        Self { block, content }
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// The four kinds of frame a transfer stream can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// File content with its sequence number.
    Data(DataChunk),
    /// All data for the current file has been sent.
    EndOfFile,
    /// The sender gave up, or (downloads) the file does not exist.
    Abort,
    /// Last frame of the stream.
    EndOfSession,
}

impl Frame {
    /// Decodes a wire `block` value and its content.
    pub fn from_wire(block: i32, content: Vec<u8>) -> Result<Self, ProtocolError> {
        let frame = match block {
            b if b > 0 => return Ok(Frame::Data(DataChunk::new(b as u32, content))),
            BLOCK_END_OF_FILE => Frame::EndOfFile,
            BLOCK_ABORT => Frame::Abort,
            BLOCK_END_OF_SESSION => Frame::EndOfSession,
            other => return Err(ProtocolError::InvalidBlock(other)),
        };
        if !content.is_empty() {
            return Err(ProtocolError::SentinelWithContent {
                block,
                len: content.len(),
            });
        }
        Ok(frame)
    }

    /// Returns the wire `block` value for this frame.
    pub fn wire_block(&self) -> Result<i32, ProtocolError> {
        match self {
            Frame::Data(chunk) => match i32::try_from(chunk.block) {
                Ok(b) if b > 0 => Ok(b),
                Ok(b) => Err(ProtocolError::InvalidBlock(b)),
                Err(_) => Err(ProtocolError::BlockOverflow(chunk.block)),
            },
            Frame::EndOfFile => Ok(BLOCK_END_OF_FILE),
            Frame::Abort => Ok(BLOCK_ABORT),
            Frame::EndOfSession => Ok(BLOCK_END_OF_SESSION),
        }
    }

    /// Content bytes (empty for sentinels).
    pub fn content(&self) -> &[u8] {
        match self {
            Frame::Data(chunk) => &chunk.content,
            _ => &[],
        }
    }

    /// Short name used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Data(_) => "data",
            Frame::EndOfFile => "end_of_file",
            Frame::Abort => "abort",
            Frame::EndOfSession => "end_of_session",
        }
    }
}

/// One decoded wire frame: the typed [`Frame`] plus its correlation fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub mark: TransferMark,
    pub file_name: String,
    pub frame: Frame,
}

impl Chunk {
    pub fn new(mark: TransferMark, file_name: impl Into<String>, frame: Frame) -> Self {
        Self {
            mark,
            file_name: file_name.into(),
            frame,
        }
    }

    pub fn data(mark: TransferMark, file_name: impl Into<String>, chunk: DataChunk) -> Self {
        Self::new(mark, file_name, Frame::Data(chunk))
    }

    pub fn end_of_file(mark: TransferMark, file_name: impl Into<String>) -> Self {
        Self::new(mark, file_name, Frame::EndOfFile)
    }

    pub fn abort(mark: TransferMark, file_name: impl Into<String>) -> Self {
        Self::new(mark, file_name, Frame::Abort)
    }

    pub fn end_of_session(mark: TransferMark, file_name: impl Into<String>) -> Self {
        Self::new(mark, file_name, Frame::EndOfSession)
    }
}
