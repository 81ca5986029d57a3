//! In-process connector backed by `tokio::io::duplex`.

use std::sync::Arc;

use crate::STREAM_BUFFER_SIZE;
use crate::channel::Channel;
use crate::client::Connector;
use crate::error::RpcError;
use crate::server::{RpcServer, Service};

/// Connects straight into an [`RpcServer`] running in the same process.
///
/// Each `connect` creates a duplex pipe and spawns the server half, so calls
/// behave exactly as they would over a socket.
pub struct MemoryConnector<H: Service> {
    server: Arc<RpcServer<H>>,
}

impl<H: Service> MemoryConnector<H> {
    pub fn new(server: Arc<RpcServer<H>>) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &Arc<RpcServer<H>> {
        &self.server
    }
}

impl<H: Service> Clone for MemoryConnector<H> {
    fn clone(&self) -> Self {
        Self {
            server: Arc::clone(&self.server),
        }
    }
}

impl<H: Service> Connector for MemoryConnector<H> {
    async fn connect(&self) -> Result<Channel, RpcError> {
        let (client, server) = tokio::io::duplex(STREAM_BUFFER_SIZE);
        tokio::spawn(Arc::clone(&self.server).serve_stream(server, "memory".to_owned()));
        Ok(Channel::new(client, "memory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{ReplyFuture, ServiceFuture};
    use streamfs_protocol::{Call, Chunk, Frame, MetadataRequest, Reply, TransferMark};
    use tokio_util::sync::CancellationToken;

    /// Echoes upload frames back and answers `exists` for one path.
    struct Echo;

    impl Service for Echo {
        fn on_upload(
            &self,
            mut channel: Channel,
            _mark: TransferMark,
            _cancel: CancellationToken,
        ) -> ServiceFuture<'_> {
            Box::pin(async move {
                while let Ok(Some(chunk)) = channel.recv_chunk().await {
                    if channel.send_chunk(&chunk).await.is_err() {
                        break;
                    }
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
                // Hold the call open until the server shuts down.
                cancel.cancelled().await;
                let _ = channel
                    .send_chunk(&Chunk::abort(mark, file_name))
                    .await;
            })
        }

        fn on_metadata(&self, request: MetadataRequest) -> ReplyFuture<'_> {
            Box::pin(async move {
                match request {
                    MetadataRequest::Exists { path } => Reply::Exists {
                        exists: path == "here",
                    },
                    other => Reply::error(400, format!("unsupported: {}", other.name())),
                }
            })
        }
    }

    /// Leaves metadata at the default.
    struct Bare;

    impl Service for Bare {
        fn on_upload(
            &self,
            _channel: Channel,
            _mark: TransferMark,
            _cancel: CancellationToken,
        ) -> ServiceFuture<'_> {
            Box::pin(async {})
        }

        fn on_download(
            &self,
            _channel: Channel,
            _mark: TransferMark,
            _file_name: String,
            _cancel: CancellationToken,
        ) -> ServiceFuture<'_> {
            Box::pin(async {})
        }
    }

    #[tokio::test]
    async fn upload_frames_reach_service() {
        let connector = MemoryConnector::new(RpcServer::new(Echo));
        let mut channel = connector.connect().await.unwrap();
        let mark = TransferMark::generate();

        channel
            .send_call(&Call::Upload { mark: mark.clone() })
            .await
            .unwrap();
        channel
            .send_chunk(&Chunk::end_of_file(mark.clone(), "f"))
            .await
            .unwrap();

        let echoed = channel.recv_chunk().await.unwrap().unwrap();
        assert_eq!(echoed.mark, mark);
        assert_eq!(echoed.frame, Frame::EndOfFile);
    }

    #[tokio::test]
    async fn metadata_reply() {
        let connector = MemoryConnector::new(RpcServer::new(Echo));

        let mut channel = connector.connect().await.unwrap();
        channel
            .send_call(&Call::Metadata {
                request: MetadataRequest::Exists {
                    path: "here".into(),
                },
            })
            .await
            .unwrap();
        assert_eq!(
            channel.recv_reply().await.unwrap(),
            Reply::Exists { exists: true }
        );
    }

    #[tokio::test]
    async fn default_metadata_is_not_implemented() {
        let connector = MemoryConnector::new(RpcServer::new(Bare));
        let mut channel = connector.connect().await.unwrap();
        channel
            .send_call(&Call::Metadata {
                request: MetadataRequest::List {
                    path: String::new(),
                },
            })
            .await
            .unwrap();

        match channel.recv_reply().await.unwrap() {
            Reply::Error { code, message } => {
                assert_eq!(code, 501);
                assert!(message.contains("list"));
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_cancels_running_calls() {
        let server = RpcServer::new(Echo);
        let connector = MemoryConnector::new(Arc::clone(&server));
        let mark = TransferMark::generate();

        let mut channel = connector.connect().await.unwrap();
        channel
            .send_call(&Call::Download {
                mark: mark.clone(),
                file_name: "f".into(),
            })
            .await
            .unwrap();

        server.shutdown();
        // Either the call saw the shutdown and answered, or the server closed
        // the stream before dispatching it.
        if let Some(chunk) = channel.recv_chunk().await.unwrap() {
            assert_eq!(chunk.frame, Frame::Abort);
        }
    }

    #[tokio::test]
    async fn garbage_call_is_dropped() {
        use tokio::io::AsyncWriteExt;

        let server = RpcServer::new(Echo);
        let (mut client, server_side) = tokio::io::duplex(1024);
        let task = tokio::spawn(Arc::clone(&server).serve_stream(server_side, "test".into()));

        client.write_all(&[0, 0, 0, 3, b'x', b'y', b'z']).await.unwrap();
        task.await.unwrap();
    }
}
