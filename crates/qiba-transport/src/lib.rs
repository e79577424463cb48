//! Transport layer for the Qiba game server.
//!
//! Provides the [`Transport`] and [`Connection`] traits the RPC handler is
//! written against, so the handler never touches sockets directly.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;

    /// The address the transport is listening on. Useful after binding to
    /// port 0.
    fn local_addr(&self) -> Result<SocketAddr, TransportError>;
}

/// One client connection carrying whole messages.
///
/// Sending and receiving are independent, so a task may wait in `recv`
/// while another sends.
pub trait Connection: Send + Sync + 'static {
    /// Sends one message to the peer.
    async fn send(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Receives the next message from the peer.
    ///
    /// Returns `Ok(None)` when the peer closed the connection.
    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), TransportError>;

    fn id(&self) -> ConnectionId;

    /// The peer's address.
    fn peer_addr(&self) -> SocketAddr;
}
