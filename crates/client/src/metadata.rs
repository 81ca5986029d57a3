//! Plain request/response calls: one channel, one request, one reply.

use tracing::debug;

use streamfs_protocol::{Call, DirEntry, MetadataRequest, Reply};
use streamfs_rpc::Connector;

use crate::TransferClient;
use crate::error::ClientError;

impl<C: Connector> TransferClient<C> {
    /// Sends `request` and returns the reply, turning `Reply::Error` into
    /// [`ClientError::Remote`].
    pub async fn call(&self, request: MetadataRequest) -> Result<Reply, ClientError> {
        let name = request.name();
        let mut channel = self.connector.connect().await?;
        channel.send_call(&Call::Metadata { request }).await?;
        let reply = channel.recv_reply().await?;
        debug!(call = name, ?reply, "metadata reply");

        match reply {
            Reply::Error { code, message } => Err(ClientError::Remote { code, message }),
            other => Ok(other),
        }
    }

    pub async fn exists(&self, path: &str) -> Result<bool, ClientError> {
        match self
            .call(MetadataRequest::Exists { path: path.into() })
            .await?
        {
            Reply::Exists { exists } => Ok(exists),
            _ => Err(ClientError::UnexpectedReply("exists")),
        }
    }

    /// Creates `path` and any missing parents.
    pub async fn create_directory(&self, path: &str) -> Result<(), ClientError> {
        let reply = self
            .call(MetadataRequest::CreateDirectory { path: path.into() })
            .await?;
        expect_done(reply, "create_directory")
    }

    pub async fn delete(&self, path: &str, recursive: bool) -> Result<(), ClientError> {
        let reply = self
            .call(MetadataRequest::Delete {
                path: path.into(),
                recursive,
            })
            .await?;
        expect_done(reply, "delete")
    }

    pub async fn move_file(&self, from: &str, to: &str, overwrite: bool) -> Result<(), ClientError> {
        let reply = self
            .call(MetadataRequest::Move {
                from: from.into(),
                to: to.into(),
                overwrite,
            })
            .await?;
        expect_done(reply, "move")
    }

    pub async fn copy_file(&self, from: &str, to: &str, overwrite: bool) -> Result<(), ClientError> {
        let reply = self
            .call(MetadataRequest::Copy {
                from: from.into(),
                to: to.into(),
                overwrite,
            })
            .await?;
        expect_done(reply, "copy")
    }

    /// Lists a directory; `""` is the storage root.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, ClientError> {
        match self.call(MetadataRequest::List { path: path.into() }).await? {
            Reply::Entries { entries } => Ok(entries),
            _ => Err(ClientError::UnexpectedReply("list")),
        }
    }
}

fn expect_done(reply: Reply, call: &'static str) -> Result<(), ClientError> {
    match reply {
        Reply::Done => Ok(()),
        _ => Err(ClientError::UnexpectedReply(call)),
    }
}
