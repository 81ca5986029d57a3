//! Stream-per-call RPC layer.
//!
//! Each call opens its own byte stream: the client sends a [`Call`] header,
//! then both sides exchange frames or a single reply over a [`Channel`]
//! until the call ends and the stream is dropped.
//!
//! # Wire format
//!
//! See [`wire`] module for the message encoding.
//!
//! [`Call`]: streamfs_protocol::Call

pub mod channel;
pub mod client;
pub mod error;
pub mod memory;
pub mod server;
pub mod wire;

pub use channel::Channel;
pub use client::{Connector, TcpConnector};
pub use error::RpcError;
pub use memory::MemoryConnector;
pub use server::{ReplyFuture, RpcServer, Service, ServiceFuture};

use std::time::Duration;

/// Channel read/write buffer size (256 KB).
pub const STREAM_BUFFER_SIZE: usize = 256 * 1024;

/// Timeout for the TCP connection attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for a frame header.
pub const MAX_HEADER_SIZE: usize = 64 * 1024;

/// Upper bound for a JSON call or reply (16 MiB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;
