//! Client transfer engine.
//!
//! [`TransferClient`] opens one channel per call through a
//! [`Connector`], tags the call with a fresh [`TransferMark`] and drives the
//! upload or download state machine until it completes, is cancelled, or
//! fails. The channel is dropped when the call returns, whatever the exit
//! path.
//!
//! [`TransferMark`]: streamfs_protocol::TransferMark

mod download;
mod error;
mod metadata;
mod upload;

pub use error::ClientError;

use std::future::Future;
use std::path::Path;

use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use streamfs_rpc::Connector;
use streamfs_transfer::{ProgressCallback, ProgressReporter, TransferConfig, TransferSession};

/// How an upload ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The server acknowledged the file.
    Completed { bytes: u64 },
    /// The caller cancelled; the server was told to discard the file.
    Cancelled,
}

/// How a download ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The full file content.
    Completed(Vec<u8>),
    /// The server aborted, typically because the file does not exist.
    Aborted,
    /// The caller cancelled.
    Cancelled,
}

impl DownloadOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, DownloadOutcome::Completed(_))
    }
}

/// Client for one streamfs server.
///
/// Safe to share between tasks; every call uses its own channel, mark and
/// buffer.
#[derive(Debug, Clone)]
pub struct TransferClient<C> {
    connector: C,
    config: TransferConfig,
}

impl<C: Connector> TransferClient<C> {
    pub fn new(connector: C, config: TransferConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Uploads everything `source` yields as `file_name`.
    pub async fn upload<R>(
        &self,
        source: R,
        file_name: &str,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, ClientError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let session = TransferSession::start(file_name, self.config.chunk_size);
        let reporter = ProgressReporter::new(progress, file_name);
        info!(mark = %session.mark(), file = file_name, "upload started");

        let Some(channel) = or_cancel(cancel, self.connector.connect()).await else {
            reporter.incomplete("transfer cancelled", 0);
            return Ok(UploadOutcome::Cancelled);
        };

        let result = match channel {
            Ok(channel) => upload::send_file(channel, &session, source, &reporter, cancel).await,
            Err(e) => Err(e.into()),
        };
        match &result {
            Ok(UploadOutcome::Completed { bytes }) => info!(
                mark = %session.mark(),
                file = file_name,
                bytes,
                elapsed_ms = session.elapsed().as_millis() as u64,
                "upload completed"
            ),
            Ok(UploadOutcome::Cancelled) => {
                info!(mark = %session.mark(), file = file_name, "upload cancelled")
            }
            Err(e) => error!(mark = %session.mark(), file = file_name, "upload failed: {e}"),
        }
        result
    }

    /// Uploads the local file at `local_path` as `file_name`.
    pub async fn upload_file(
        &self,
        local_path: impl AsRef<Path>,
        file_name: &str,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, ClientError> {
        let file = tokio::fs::File::open(local_path.as_ref()).await?;
        self.upload(file, file_name, progress, cancel).await
    }

    /// Downloads `file_name` into memory.
    pub async fn download(
        &self,
        file_name: &str,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, ClientError> {
        let session = TransferSession::start(file_name, self.config.chunk_size);
        let reporter = ProgressReporter::new(progress, file_name);
        info!(mark = %session.mark(), file = file_name, "download started");

        let Some(channel) = or_cancel(cancel, self.connector.connect()).await else {
            reporter.incomplete("transfer cancelled", 0);
            return Ok(DownloadOutcome::Cancelled);
        };

        let result = match channel {
            Ok(channel) => {
                download::receive_file(
                    channel,
                    &session,
                    self.config.chunk_buffer_count,
                    &reporter,
                    cancel,
                )
                .await
            }
            Err(e) => Err(e.into()),
        };
        match &result {
            Ok(DownloadOutcome::Completed(bytes)) => info!(
                mark = %session.mark(),
                file = file_name,
                bytes = bytes.len(),
                elapsed_ms = session.elapsed().as_millis() as u64,
                "download completed"
            ),
            Ok(DownloadOutcome::Aborted) => {
                info!(mark = %session.mark(), file = file_name, "download aborted by server")
            }
            Ok(DownloadOutcome::Cancelled) => {
                info!(mark = %session.mark(), file = file_name, "download cancelled")
            }
            Err(e) => error!(mark = %session.mark(), file = file_name, "download failed: {e}"),
        }
        result
    }

    /// Downloads `file_name` and writes it to `local_path`.
    ///
    /// The local file is only written when the download completes.
    pub async fn download_to_file(
        &self,
        file_name: &str,
        local_path: impl AsRef<Path>,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, ClientError> {
        let outcome = self.download(file_name, progress, cancel).await?;
        if let DownloadOutcome::Completed(bytes) = &outcome {
            tokio::fs::write(local_path.as_ref(), bytes).await?;
        }
        Ok(outcome)
    }
}

/// Runs `fut` unless `cancel` fires first. Cancellation wins ties.
pub(crate) async fn or_cancel<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}
