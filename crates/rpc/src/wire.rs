//! Length-prefixed wire format for calls, replies and frames.
//!
//! # Wire format
//!
//! ```text
//! JSON MESSAGE (Call, Reply):
//!   [4 bytes BE: json_len]
//!   [json_len bytes: UTF-8 JSON]
//!
//! FRAME:
//!   [4 bytes BE: header_len]
//!   [header_len bytes: JSON {"mark", "block", "fileName"}]
//!   [4 bytes BE: content_len]
//!   [content_len bytes: raw content]
//! ```
//!
//! A stream that ends exactly at a message boundary is a clean close and
//! decodes as `None`; ending anywhere else is an I/O error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use streamfs_protocol::{Chunk, Frame, MAX_CHUNK_SIZE, TransferMark};

use crate::error::RpcError;
use crate::{MAX_HEADER_SIZE, MAX_MESSAGE_SIZE};

/// JSON header preceding the content of every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameHeader {
    mark: TransferMark,
    block: i32,
    #[serde(default)]
    file_name: String,
}

/// Reads a big-endian length prefix, or `None` on EOF before its first byte.
async fn read_len_or_eof<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<u32>, RpcError> {
    let mut buf = [0u8; 4];
    let n = reader.read(&mut buf[..1]).await?;
    if n == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut buf[1..]).await?;
    Ok(Some(u32::from_be_bytes(buf)))
}

fn check_len(what: &'static str, len: usize, max: usize) -> Result<(), RpcError> {
    if len > max {
        return Err(RpcError::FrameTooLarge { what, len, max });
    }
    Ok(())
}

/// Writes a JSON message.
pub async fn write_json<W, T>(writer: &mut W, value: &T) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(value)?;
    check_len("message", body.len(), MAX_MESSAGE_SIZE)?;
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    Ok(())
}

/// Reads a JSON message. Returns `None` on a clean close.
pub async fn read_json<R, T>(reader: &mut R) -> Result<Option<T>, RpcError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let Some(len) = read_len_or_eof(reader).await? else {
        return Ok(None);
    };
    let len = len as usize;
    check_len("message", len, MAX_MESSAGE_SIZE)?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

/// Writes a frame.
pub async fn write_chunk<W: AsyncWrite + Unpin>(
    writer: &mut W,
    chunk: &Chunk,
) -> Result<(), RpcError> {
    let header = FrameHeader {
        mark: chunk.mark.clone(),
        block: chunk.frame.wire_block()?,
        file_name: chunk.file_name.clone(),
    };
    let header = serde_json::to_vec(&header)?;
    check_len("frame header", header.len(), MAX_HEADER_SIZE)?;

    let content = chunk.frame.content();
    check_len("frame content", content.len(), MAX_CHUNK_SIZE)?;

    writer.write_u32(header.len() as u32).await?;
    writer.write_all(&header).await?;
    writer.write_u32(content.len() as u32).await?;
    writer.write_all(content).await?;
    Ok(())
}

/// Reads and validates a frame. Returns `None` on a clean close.
pub async fn read_chunk<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Chunk>, RpcError> {
    let Some(header_len) = read_len_or_eof(reader).await? else {
        return Ok(None);
    };
    let header_len = header_len as usize;
    check_len("frame header", header_len, MAX_HEADER_SIZE)?;

    let mut header_buf = vec![0u8; header_len];
    reader.read_exact(&mut header_buf).await?;
    let header: FrameHeader = serde_json::from_slice(&header_buf)?;

    let content_len = reader.read_u32().await? as usize;
    check_len("frame content", content_len, MAX_CHUNK_SIZE)?;
    let mut content = vec![0u8; content_len];
    reader.read_exact(&mut content).await?;

    let frame = Frame::from_wire(header.block, content)?;
    Ok(Some(Chunk {
        mark: header.mark,
        file_name: header.file_name,
        frame,
    }))
}
