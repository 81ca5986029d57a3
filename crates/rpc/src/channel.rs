//! One bidirectional stream carrying a single call.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, ReadHalf, WriteHalf};

use streamfs_protocol::{Call, Chunk, Reply};

use crate::STREAM_BUFFER_SIZE;
use crate::error::RpcError;
use crate::wire;

/// Byte stream a [`Channel`] can run over.
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ByteStream for T {}

type BoxedStream = Box<dyn ByteStream>;

/// A call's stream, split into buffered halves.
///
/// Every send flushes, so a peer waiting on a reply never stalls behind the
/// write buffer. Dropping the channel closes the stream.
pub struct Channel {
    reader: BufReader<ReadHalf<BoxedStream>>,
    writer: BufWriter<WriteHalf<BoxedStream>>,
    peer: String,
}

impl Channel {
    pub fn new<S: ByteStream + 'static>(stream: S, peer: impl Into<String>) -> Self {
        let boxed: BoxedStream = Box::new(stream);
        let (reader, writer) = tokio::io::split(boxed);
        Self {
            reader: BufReader::with_capacity(STREAM_BUFFER_SIZE, reader),
            writer: BufWriter::with_capacity(STREAM_BUFFER_SIZE, writer),
            peer: peer.into(),
        }
    }

    /// Address or label of the remote end, for log output.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub async fn send_call(&mut self, call: &Call) -> Result<(), RpcError> {
        wire::write_json(&mut self.writer, call).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads the opening call. `None` if the peer closed without sending one.
    pub async fn recv_call(&mut self) -> Result<Option<Call>, RpcError> {
        wire::read_json(&mut self.reader).await
    }

    pub async fn send_chunk(&mut self, chunk: &Chunk) -> Result<(), RpcError> {
        wire::write_chunk(&mut self.writer, chunk).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads the next frame. `None` once the peer has closed its side.
    pub async fn recv_chunk(&mut self) -> Result<Option<Chunk>, RpcError> {
        wire::read_chunk(&mut self.reader).await
    }

    pub async fn send_reply(&mut self, reply: &Reply) -> Result<(), RpcError> {
        wire::write_json(&mut self.writer, reply).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads the single reply of a metadata call.
    pub async fn recv_reply(&mut self) -> Result<Reply, RpcError> {
        wire::read_json(&mut self.reader)
            .await?
            .ok_or(RpcError::Closed)
    }

    /// Flushes and closes the write half. The peer then reads a clean close.
    pub async fn shutdown(&mut self) -> Result<(), RpcError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").field("peer", &self.peer).finish()
    }
}
