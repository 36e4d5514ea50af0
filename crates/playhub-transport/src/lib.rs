//! Socket layer for playhub.
//!
//! A player's browser holds exactly one socket to the server. This crate
//! hides what that socket is behind two traits: [`Transport`] hands out
//! new connections, [`Connection`] moves opaque frames both ways. The
//! session engine never sees either; the per-connection handler owns the
//! [`Connection`] and translates between frames and envelopes.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`] on `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Server-unique number of one accepted socket.
///
/// A user who logs in twice has two of these. The engine keys its
/// bookkeeping on the pair (user, connection) so the late close of the
/// older socket can't evict the newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
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

/// A listener that produces [`Connection`]s.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next socket and completes its upgrade.
    ///
    /// Every returned connection carries a fresh [`ConnectionId`].
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// The address actually bound, useful after binding port 0.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// One player's socket.
///
/// `send` and `recv` take `&self` and must not block each other: the
/// handler parks in `recv` while a writer task drains the player's
/// outbox through `send`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next data frame, skipping control frames.
    ///
    /// `Ok(None)` means the peer closed the socket.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Starts the closing handshake. Sending afterwards fails.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;

    /// Where the socket came from, for logs.
    fn peer_addr(&self) -> SocketAddr;
}
