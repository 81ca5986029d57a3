//! Server side: accept loop and call dispatch.
//!
//! Every accepted stream carries exactly one call. The server reads the
//! opening [`Call`], hands the channel to the matching [`Service`] method and
//! drops the stream when that method returns.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use streamfs_protocol::{Call, MetadataRequest, Reply, TransferMark};

use crate::channel::{ByteStream, Channel};
use crate::error::RpcError;

/// A boxed future returned by streaming service methods.
pub type ServiceFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A boxed future resolving to the reply of a metadata call.
pub type ReplyFuture<'a> = Pin<Box<dyn Future<Output = Reply> + Send + 'a>>;

/// Domain logic behind an [`RpcServer`].
///
/// Streaming methods own the channel for the duration of the call and
/// report their own failures; the server only logs that the call ended.
/// `cancel` fires when the server shuts down.
pub trait Service: Send + Sync + 'static {
    /// Receives the frames of an upload.
    fn on_upload(
        &self,
        channel: Channel,
        mark: TransferMark,
        cancel: CancellationToken,
    ) -> ServiceFuture<'_>;

    /// Streams `file_name` back to the caller.
    fn on_download(
        &self,
        channel: Channel,
        mark: TransferMark,
        file_name: String,
        cancel: CancellationToken,
    ) -> ServiceFuture<'_>;

    /// Answers a metadata request.
    fn on_metadata(&self, request: MetadataRequest) -> ReplyFuture<'_> {
        Box::pin(async move {
            Reply::error(501, format!("{} not implemented", request.name()))
        })
    }
}

/// Accepts streams and dispatches their calls to a [`Service`].
pub struct RpcServer<H: Service> {
    service: Arc<H>,
    cancel: CancellationToken,
}

impl<H: Service> RpcServer<H> {
    pub fn new(service: H) -> Arc<Self> {
        Self::with_cancel(service, CancellationToken::new())
    }

    /// Creates a server that stops when `cancel` fires.
    pub fn with_cancel(service: H, cancel: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            service: Arc::new(service),
            cancel,
        })
    }

    pub fn service(&self) -> &Arc<H> {
        &self.service
    }

    /// Stops the accept loop and signals every running call.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Binds `addr` and serves until shutdown.
    pub async fn listen(self: &Arc<Self>, addr: &str) -> Result<(), RpcError> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Accepts connections on `listener` until shutdown.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> Result<(), RpcError> {
        let local_addr = listener.local_addr()?;
        tracing::info!("streamfs server listening on {local_addr}");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("server shutting down");
                    break Ok(());
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            if let Err(e) = stream.set_nodelay(true) {
                                tracing::warn!(%peer_addr, "set_nodelay failed: {e}");
                            }
                            let server = Arc::clone(self);
                            tokio::spawn(server.serve_stream(stream, peer_addr.to_string()));
                        }
                        Err(e) => {
                            tracing::error!("accept error: {e}");
                        }
                    }
                }
            }
        }
    }

    /// Runs the single call carried by `stream`.
    pub async fn serve_stream<S: ByteStream + 'static>(self: Arc<Self>, stream: S, peer: String) {
        let mut channel = Channel::new(stream, peer);
        let cancel = self.cancel.child_token();

        let call = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = channel.recv_call() => result,
        };
        let call = match call {
            Ok(Some(call)) => call,
            Ok(None) => {
                tracing::debug!(peer = %channel.peer(), "stream closed before call");
                return;
            }
            Err(e) => {
                tracing::warn!(peer = %channel.peer(), "invalid call: {e}");
                return;
            }
        };

        let name = call.name();
        let peer = channel.peer().to_owned();
        tracing::debug!(%peer, call = name, "call started");

        match call {
            Call::Upload { mark } => {
                self.service.on_upload(channel, mark, cancel).await;
            }
            Call::Download { mark, file_name } => {
                self.service
                    .on_download(channel, mark, file_name, cancel)
                    .await;
            }
            Call::Metadata { request } => {
                let reply = self.service.on_metadata(request).await;
                if let Err(e) = channel.send_reply(&reply).await {
                    tracing::warn!(%peer, call = name, "failed to send reply: {e}");
                }
            }
        }

        tracing::debug!(%peer, call = name, "call finished");
    }
}
