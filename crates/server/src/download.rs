//! Download sender: streams a stored file as numbered frames.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use streamfs_protocol::{Chunk, TransferMark};
use streamfs_rpc::Channel;
use streamfs_storage::StorageBackend;
use streamfs_transfer::ChunkReader;

use crate::error::ServerError;

/// How a download call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadResult {
    /// Every frame, end-of-file and end-of-session were sent.
    Sent { bytes: u64, blocks: u32 },
    /// The file does not exist; abort and end-of-session were sent.
    NotFound,
    /// Stopped by shutdown; no closing frames were sent.
    Cancelled,
}

pub struct DownloadSender<'a, S: StorageBackend + ?Sized> {
    storage: &'a S,
    mark: TransferMark,
    file_name: String,
    chunk_size: usize,
}

impl<'a, S: StorageBackend + ?Sized> DownloadSender<'a, S> {
    pub fn new(
        storage: &'a S,
        mark: TransferMark,
        file_name: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        Self {
            storage,
            mark,
            file_name: file_name.into(),
            chunk_size,
        }
    }

    pub async fn run(
        self,
        channel: &mut Channel,
        cancel: &CancellationToken,
    ) -> Result<DownloadResult, ServerError> {
        let path = self.file_name.as_str();

        // Start
        let found = self.storage.exists(path).await? && !self.storage.is_dir(path).await?;
        if !found {
            debug!(mark = %self.mark, file = path, "requested file not found");
            channel
                .send_chunk(&Chunk::abort(self.mark.clone(), path))
                .await?;
            channel
                .send_chunk(&Chunk::end_of_session(self.mark.clone(), path))
                .await?;
            return Ok(DownloadResult::NotFound);
        }

        // Streaming; the read handle is dropped on every exit from here.
        let handle = self.storage.open_read(path).await?;
        let mut reader = ChunkReader::new(handle, self.chunk_size);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled(reader.offset())),
                next = reader.next_chunk() => next?,
            };
            let Some(data) = next else {
                break;
            };
            let chunk = Chunk::data(self.mark.clone(), path, data);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(self.cancelled(reader.offset())),
                sent = channel.send_chunk(&chunk) => sent?,
            }
        }
        let bytes = reader.offset();
        let blocks = reader.chunks_read();
        drop(reader);

        channel
            .send_chunk(&Chunk::end_of_file(self.mark.clone(), path))
            .await?;

        // End
        channel
            .send_chunk(&Chunk::end_of_session(self.mark.clone(), path))
            .await?;
        info!(mark = %self.mark, file = path, bytes, blocks, "file sent");
        Ok(DownloadResult::Sent { bytes, blocks })
    }

    fn cancelled(&self, bytes: u64) -> DownloadResult {
        info!(mark = %self.mark, file = %self.file_name, bytes, "download cancelled");
        DownloadResult::Cancelled
    }
}
