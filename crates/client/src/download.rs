//! Download state machine.
//!
//! Frames are consumed until end-of-session. The outcome is decided by the
//! first end-of-file or abort frame; anything after an abort is drained and
//! ignored.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use streamfs_protocol::{Call, Frame};
use streamfs_rpc::{Channel, RpcError};
use streamfs_transfer::{ChunkBuffer, ProgressReporter, TransferSession};

use crate::error::ClientError;
use crate::{DownloadOutcome, or_cancel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Completed,
    Aborted,
}

pub(crate) async fn receive_file(
    mut channel: Channel,
    session: &TransferSession,
    buffer_count: usize,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<DownloadOutcome, ClientError> {
    let mark = session.mark();
    let call = Call::Download {
        mark: mark.clone(),
        file_name: session.file_path().to_owned(),
    };
    let Some(sent) = or_cancel(cancel, channel.send_call(&call)).await else {
        progress.incomplete("transfer cancelled", 0);
        return Ok(DownloadOutcome::Cancelled);
    };
    sent?;

    let mut buffer = ChunkBuffer::new(buffer_count);
    let mut output: Vec<u8> = Vec::new();
    let mut received = 0u64;
    let mut settled: Option<Settled> = None;

    loop {
        let Some(next) = or_cancel(cancel, channel.recv_chunk()).await else {
            // Best effort: the server may keep producing until it notices
            // the closed stream.
            progress.incomplete("transfer cancelled", received);
            return Ok(DownloadOutcome::Cancelled);
        };
        let Some(chunk) = next? else {
            return match settled {
                Some(Settled::Completed) => {
                    warn!(%mark, "stream closed without end of session");
                    Ok(DownloadOutcome::Completed(output))
                }
                _ => Err(RpcError::Closed.into()),
            };
        };
        if chunk.mark != *mark {
            return Err(ClientError::MarkMismatch {
                expected: mark.clone(),
                actual: chunk.mark,
            });
        }

        match chunk.frame {
            Frame::EndOfSession => break,
            Frame::Abort => {
                buffer.discard();
                output.clear();
                if settled != Some(Settled::Aborted) {
                    progress.incomplete("transfer aborted by server", received);
                }
                settled = Some(Settled::Aborted);
            }
            Frame::EndOfFile => {
                if settled.is_some() {
                    return Err(ClientError::UnexpectedFrame {
                        got: "end-of-file",
                        state: "settled",
                    });
                }
                buffer.finish(&mut output).await?;
                progress.completed(output.len() as u64);
                settled = Some(Settled::Completed);
            }
            Frame::Data(data) => match settled {
                Some(Settled::Aborted) => {
                    debug!(%mark, block = data.block, "dropping data after abort");
                }
                Some(Settled::Completed) => {
                    return Err(ClientError::UnexpectedFrame {
                        got: "data",
                        state: "after end-of-file",
                    });
                }
                None => {
                    received += data.len() as u64;
                    buffer.add(data)?;
                    if buffer.should_flush() {
                        buffer.flush(&mut output).await?;
                        progress.transferred(received);
                    }
                }
            },
        }
    }

    match settled {
        Some(Settled::Completed) => Ok(DownloadOutcome::Completed(output)),
        Some(Settled::Aborted) => Ok(DownloadOutcome::Aborted),
        None => Err(ClientError::UnexpectedFrame {
            got: "end-of-session",
            state: "before end-of-file",
        }),
    }
}
