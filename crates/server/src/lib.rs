//! Server transfer service.
//!
//! [`FileServer`] implements [`Service`](streamfs_rpc::Service) on top of a
//! [`StorageBackend`](streamfs_storage::StorageBackend): uploads are
//! reassembled by an [`UploadReceiver`], downloads are streamed by a
//! [`DownloadSender`], and metadata requests map onto backend calls.

mod download;
mod error;
mod metadata;
mod service;
mod upload;

pub use download::{DownloadResult, DownloadSender};
pub use error::ServerError;
pub use metadata::handle_metadata;
pub use service::FileServer;
pub use upload::{Flow, UploadReceiver, UploadSummary};
