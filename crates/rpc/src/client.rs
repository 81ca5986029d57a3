//! Client side: opening one channel per call.

use std::future::Future;
use std::time::Duration;

use tokio::net::TcpStream;
use tracing::debug;

use crate::CONNECT_TIMEOUT;
use crate::channel::Channel;
use crate::error::RpcError;

/// Opens a fresh [`Channel`] for each call.
///
/// Implementations must be safe to use from many concurrent calls.
pub trait Connector: Send + Sync {
    fn connect(&self) -> impl Future<Output = Result<Channel, RpcError>> + Send;
}

/// Connects to a streamfs server over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    timeout: Duration,
}

impl TcpConnector {
    /// `addr` is anything `TcpStream::connect` resolves, e.g. `"host:7420"`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Channel, RpcError> {
        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str()))
            .await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(RpcError::Timeout),
        };
        stream.set_nodelay(true)?;
        debug!(addr = %self.addr, "channel connected");
        Ok(Channel::new(stream, self.addr.clone()))
    }
}
