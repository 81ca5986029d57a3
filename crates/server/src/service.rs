//! [`Service`] implementation backed by a [`StorageBackend`].

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use streamfs_protocol::{MetadataRequest, TransferMark};
use streamfs_rpc::{Channel, ReplyFuture, Service, ServiceFuture};
use streamfs_storage::StorageBackend;
use streamfs_transfer::TransferConfig;

use crate::download::{DownloadResult, DownloadSender};
use crate::metadata::handle_metadata;
use crate::upload::UploadReceiver;

/// The streamfs file service.
pub struct FileServer<S> {
    storage: S,
    config: TransferConfig,
}

impl<S: StorageBackend> FileServer<S> {
    pub fn new(storage: S, config: TransferConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }
}

impl<S: StorageBackend> Service for FileServer<S> {
    fn on_upload(
        &self,
        channel: Channel,
        mark: TransferMark,
        cancel: CancellationToken,
    ) -> ServiceFuture<'_> {
        Box::pin(async move {
            let peer = channel.peer().to_owned();
            let receiver =
                UploadReceiver::new(&self.storage, mark.clone(), self.config.chunk_buffer_count);
            match receiver.run(channel, cancel).await {
                Ok(summary) => info!(
                    %mark,
                    %peer,
                    files = summary.files_completed,
                    aborted = summary.files_aborted,
                    bytes = summary.bytes_written,
                    "upload session closed"
                ),
                Err(e) => error!(%mark, %peer, "upload failed: {e}"),
            }
        })
    }

    fn on_download(
        &self,
        mut channel: Channel,
        mark: TransferMark,
        file_name: String,
        cancel: CancellationToken,
    ) -> ServiceFuture<'_> {
        Box::pin(async move {
            let sender = DownloadSender::new(
                &self.storage,
                mark.clone(),
                file_name.as_str(),
                self.config.chunk_size,
            );
            match sender.run(&mut channel, &cancel).await {
                Ok(DownloadResult::Sent { .. } | DownloadResult::Cancelled) => {}
                Ok(DownloadResult::NotFound) => {
                    info!(%mark, file = %file_name, "download of missing file")
                }
                Err(e) => error!(%mark, file = %file_name, "download failed: {e}"),
            }
        })
    }

    fn on_metadata(&self, request: MetadataRequest) -> ReplyFuture<'_> {
        Box::pin(handle_metadata(&self.storage, request))
    }
}
