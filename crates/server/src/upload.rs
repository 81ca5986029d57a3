//! Upload receiver: reassembles uploaded frames into files.
//!
//! Per call the receiver moves through
//! `AwaitingFirstChunk -> Writing -> (Flushed | Aborted) -> SessionClosed`.
//! After a flushed or aborted file it is back in `AwaitingFirstChunk`, so a
//! session may carry several files before its end-of-session frame.

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use streamfs_protocol::{Chunk, DataChunk, Frame, TransferMark};
use streamfs_rpc::Channel;
use streamfs_storage::{StorageBackend, WriteHandle, parent_dir};
use streamfs_transfer::{ChunkBuffer, TransferError};

use crate::error::ServerError;

/// What the driver should do after a frame was handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// A file is complete; send this acknowledgment.
    Acknowledge(Chunk),
    /// End of session; stop reading.
    Finished,
}

/// Totals for one upload call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub files_completed: u32,
    pub files_aborted: u32,
    pub bytes_written: u64,
}

/// A file being written.
struct OpenFile {
    path: String,
    handle: WriteHandle,
    bytes: u64,
}

/// Per-call upload state. The buffer belongs to this call alone.
pub struct UploadReceiver<'a, S: StorageBackend + ?Sized> {
    storage: &'a S,
    mark: TransferMark,
    buffer: ChunkBuffer,
    current: Option<OpenFile>,
    summary: UploadSummary,
}

impl<'a, S: StorageBackend + ?Sized> UploadReceiver<'a, S> {
    pub fn new(storage: &'a S, mark: TransferMark, buffer_count: usize) -> Self {
        Self {
            storage,
            mark,
            buffer: ChunkBuffer::new(buffer_count),
            current: None,
            summary: UploadSummary::default(),
        }
    }

    pub fn mark(&self) -> &TransferMark {
        &self.mark
    }

    pub fn summary(&self) -> UploadSummary {
        self.summary
    }

    /// Path of the file currently being written, if any.
    pub fn open_path(&self) -> Option<&str> {
        self.current.as_ref().map(|f| f.path.as_str())
    }

    /// Reads frames from `channel` until end-of-session or stream end.
    ///
    /// A partially written file is deleted on every exit except a completed
    /// file.
    pub async fn run(
        mut self,
        mut channel: Channel,
        cancel: CancellationToken,
    ) -> Result<UploadSummary, ServerError> {
        let result = self.drive(&mut channel, &cancel).await;
        self.discard_current().await;
        result.map(|()| self.summary)
    }

    async fn drive(
        &mut self,
        channel: &mut Channel,
        cancel: &CancellationToken,
    ) -> Result<(), ServerError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ServerError::Cancelled),
                next = channel.recv_chunk() => next?,
            };
            let Some(chunk) = next else {
                if let Some(path) = self.open_path() {
                    warn!(mark = %self.mark, file = path, "stream ended mid-file");
                }
                return Ok(());
            };

            match self.handle(chunk).await? {
                Flow::Continue => {}
                Flow::Acknowledge(ack) => channel.send_chunk(&ack).await?,
                Flow::Finished => return Ok(()),
            }
        }
    }

    /// Applies one frame to the receiver state.
    pub async fn handle(&mut self, chunk: Chunk) -> Result<Flow, ServerError> {
        if chunk.mark != self.mark {
            return Err(ServerError::MarkMismatch {
                expected: self.mark.clone(),
                actual: chunk.mark,
            });
        }

        match chunk.frame {
            Frame::Data(data) => {
                self.on_data(&chunk.file_name, data).await?;
                Ok(Flow::Continue)
            }
            Frame::EndOfFile => {
                let ack = self.on_end_of_file(&chunk.file_name).await?;
                Ok(Flow::Acknowledge(ack))
            }
            Frame::Abort => {
                self.on_abort().await;
                Ok(Flow::Continue)
            }
            Frame::EndOfSession => {
                if let Some(path) = self.open_path() {
                    warn!(mark = %self.mark, file = path, "end of session mid-file");
                }
                self.discard_current().await;
                Ok(Flow::Finished)
            }
        }
    }

    async fn on_data(&mut self, file_name: &str, data: DataChunk) -> Result<(), ServerError> {
        if let Some(open) = self.current.as_ref().filter(|open| open.path != file_name) {
            return Err(ServerError::FileChanged {
                open: open.path.clone(),
                got: file_name.to_owned(),
            });
        }
        if self.current.is_none() {
            let open = open_destination(self.storage, &self.mark, file_name).await?;
            self.current = Some(open);
        }

        self.buffer.add(data)?;
        if self.buffer.should_flush() {
            if let Some(open) = self.current.as_mut() {
                flush_into(&mut self.buffer, open).await?;
            }
        }
        Ok(())
    }

    async fn on_end_of_file(&mut self, file_name: &str) -> Result<Chunk, ServerError> {
        let mut open = match self.current.take() {
            Some(open) => open,
            // Zero-byte file.
            None => open_destination(self.storage, &self.mark, file_name).await?,
        };
        if let Err(e) = complete(&mut self.buffer, &mut open).await {
            // Left for `discard_current` to delete.
            self.current = Some(open);
            return Err(e);
        }

        self.summary.files_completed += 1;
        self.summary.bytes_written += open.bytes;
        info!(mark = %self.mark, file = %open.path, bytes = open.bytes, "file received");
        Ok(Chunk::end_of_file(self.mark.clone(), open.path))
    }

    async fn on_abort(&mut self) {
        debug!(mark = %self.mark, file = ?self.open_path(), "abort received");
        self.discard_current().await;
    }

    /// Drops buffered data and deletes the file being written, if any.
    async fn discard_current(&mut self) {
        self.buffer.discard();
        let Some(open) = self.current.take() else {
            return;
        };
        drop(open.handle);
        self.summary.files_aborted += 1;
        match self.storage.delete(&open.path, false).await {
            Ok(()) => info!(mark = %self.mark, file = %open.path, "partial file removed"),
            Err(e) => warn!(mark = %self.mark, file = %open.path, "failed to remove partial file: {e}"),
        }
    }
}

/// Opens the destination lazily on the first frame of a file, creating
/// missing parent directories.
async fn open_destination<S: StorageBackend + ?Sized>(
    storage: &S,
    mark: &TransferMark,
    path: &str,
) -> Result<OpenFile, ServerError> {
    if let Some(parent) = parent_dir(path) {
        if !storage.exists(parent).await? {
            storage.create_directories(parent).await?;
        }
    }
    let handle = storage.open_write(path).await?;
    debug!(%mark, file = path, "destination opened");
    Ok(OpenFile {
        path: path.to_owned(),
        handle,
        bytes: 0,
    })
}

async fn flush_into(buffer: &mut ChunkBuffer, open: &mut OpenFile) -> Result<(), ServerError> {
    let written = buffer
        .flush(&mut open.handle)
        .await
        .map_err(|e| write_error(&open.path, e))?;
    open.bytes += written;
    Ok(())
}

/// Writes the remaining chunks of a file and closes its handle.
async fn complete(buffer: &mut ChunkBuffer, open: &mut OpenFile) -> Result<(), ServerError> {
    let written = buffer
        .finish(&mut open.handle)
        .await
        .map_err(|e| write_error(&open.path, e))?;
    open.bytes += written;
    open.handle
        .shutdown()
        .await
        .map_err(|source| ServerError::Write {
            path: open.path.clone(),
            source,
        })
}

fn write_error(path: &str, err: TransferError) -> ServerError {
    match err {
        TransferError::Io(source) => ServerError::Write {
            path: path.to_owned(),
            source,
        },
        other => ServerError::Transfer(other),
    }
}
