//! Upload state machine.
//!
//! ```text
//! Streaming --EOF--> Completing --ack--> Closed      (sends 0 then -2)
//!     |                   |
//!     +----cancel-----> Canceling -----> Closed      (sends -1, no -2)
//! ```

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use streamfs_protocol::{Call, Chunk, Frame};
use streamfs_rpc::{Channel, RpcError};
use streamfs_transfer::{ChunkReader, ProgressReporter, TransferSession};

use crate::error::ClientError;
use crate::{UploadOutcome, or_cancel};

/// Streams `source` over `channel` and waits for the server's acknowledgment.
pub(crate) async fn send_file<R>(
    mut channel: Channel,
    session: &TransferSession,
    source: R,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<UploadOutcome, ClientError>
where
    R: AsyncRead + Unpin + Send,
{
    let mark = session.mark();
    let file_name = session.file_path();

    let Some(sent) = or_cancel(cancel, channel.send_call(&Call::Upload { mark: mark.clone() })).await
    else {
        progress.incomplete("transfer cancelled", 0);
        return Ok(UploadOutcome::Cancelled);
    };
    sent?;

    // Streaming
    let mut reader = ChunkReader::new(source, session.chunk_size());
    let mut bytes_sent = 0u64;
    loop {
        let Some(next) = or_cancel(cancel, reader.next_chunk()).await else {
            return cancel_upload(&mut channel, session, progress, bytes_sent).await;
        };
        let Some(data) = next? else {
            break;
        };

        let len = data.len() as u64;
        let chunk = Chunk::data(mark.clone(), file_name, data);
        match or_cancel(cancel, channel.send_chunk(&chunk)).await {
            Some(result) => result?,
            None => {
                // The frame may be half written; the server discards the
                // file when the stream breaks.
                progress.incomplete("transfer cancelled", bytes_sent);
                return Ok(UploadOutcome::Cancelled);
            }
        }
        bytes_sent += len;
        progress.transferred(bytes_sent);
    }

    // Completing
    let eof = Chunk::end_of_file(mark.clone(), file_name);
    match or_cancel(cancel, channel.send_chunk(&eof)).await {
        Some(result) => result?,
        None => {
            progress.incomplete("transfer cancelled", bytes_sent);
            return Ok(UploadOutcome::Cancelled);
        }
    }
    debug!(%mark, file = file_name, blocks = reader.chunks_read(), "end of file sent");

    let Some(ack) = or_cancel(cancel, channel.recv_chunk()).await else {
        return cancel_upload(&mut channel, session, progress, bytes_sent).await;
    };
    let ack = ack?.ok_or(RpcError::Closed)?;
    if ack.mark != *mark {
        return Err(ClientError::MarkMismatch {
            expected: mark.clone(),
            actual: ack.mark,
        });
    }
    if ack.frame != Frame::EndOfFile {
        return Err(ClientError::UnexpectedFrame {
            got: ack.frame.kind(),
            state: "awaiting acknowledgment",
        });
    }
    progress.completed(bytes_sent);

    channel
        .send_chunk(&Chunk::end_of_session(mark.clone(), file_name))
        .await?;
    if let Err(e) = channel.shutdown().await {
        debug!(%mark, "shutdown after upload failed: {e}");
    }
    Ok(UploadOutcome::Completed { bytes: bytes_sent })
}

/// Canceling: tells the server to discard the file. No end-of-session
/// follows; the stream is simply closed.
async fn cancel_upload(
    channel: &mut Channel,
    session: &TransferSession,
    progress: &ProgressReporter,
    bytes_sent: u64,
) -> Result<UploadOutcome, ClientError> {
    let abort = Chunk::abort(session.mark().clone(), session.file_path());
    if let Err(e) = channel.send_chunk(&abort).await {
        warn!(mark = %session.mark(), "failed to send abort: {e}");
    }
    progress.incomplete("transfer cancelled", bytes_sent);
    Ok(UploadOutcome::Cancelled)
}
