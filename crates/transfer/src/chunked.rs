use tokio::io::{AsyncRead, AsyncReadExt};

use streamfs_protocol::DataChunk;

use crate::TransferError;

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a source in fixed-size windows and numbers them from 1.
///
/// Every window except the last is exactly `chunk_size` bytes; short reads
/// from the underlying source are coalesced until the window is full or the
/// source is exhausted.
pub struct ChunkReader<R> {
    reader: R,
    chunk_size: usize,
    next_block: u32,
    offset: u64,
    eof: bool,
}

impl<R: AsyncRead + Unpin> ChunkReader<R> {
    /// Wraps `reader`. `chunk_size` is expected to come from a validated
    /// [`TransferConfig`](crate::TransferConfig); 0 is treated as 1.
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            next_block: 1,
            offset: 0,
            eof: false,
        }
    }

    /// Reads the next window. Returns `None` at EOF.
    pub async fn next_chunk(&mut self) -> Result<Option<DataChunk>, TransferError> {
        if self.eof {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..]).await?;
            if n == 0 {
                self.eof = true;
                break;
            }
            filled += n;
        }

        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);

        let block = self.next_block;
        self.next_block = self
            .next_block
            .checked_add(1)
            .ok_or(TransferError::TooManyChunks)?;
        self.offset += filled as u64;
        Ok(Some(DataChunk::new(block, buf)))
    }

    /// Bytes read so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of chunks produced so far.
    pub fn chunks_read(&self) -> u32 {
        self.next_block - 1
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}
