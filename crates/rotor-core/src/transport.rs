//! Message transports for the DDP session.
//!
//! The session speaks a message-oriented protocol: each message is one JSON
//! text. The `Transport` trait abstracts over anything that can carry those
//! texts in order, in both directions:
//!
//! - **WebSocket** (production via tokio-tungstenite): one text frame per
//!   message
//! - **TCP** (simulation via Turmoil): one line per message
//!
//! The simulated transport skips WebSocket framing, TLS, the HTTP upgrade
//! and frame-level ping/pong. What it keeps is ordering, timing and
//! connection failure, which is all the session state machine observes.

use std::io;

use async_trait::async_trait;

/// Factory for message connections.
///
/// # Lifecycle
///
/// ```text
/// Transport::connect(endpoint)
///   ↓
/// [Connection returned]
///   ↓
/// send() / recv() ... until recv() returns None
///   ↓
/// close()
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Type representing an open connection.
    type Connection: TransportConnection;

    /// Open a connection to `endpoint` (a `ws://` or `wss://` URL).
    ///
    /// # Behavior
    ///
    /// - **Waits** until the connection is usable (upgrade complete)
    /// - **Returns** a connection handle
    ///
    /// # Errors
    ///
    /// Returns `std::io::Error` if:
    /// - The endpoint is unreachable or refuses the connection
    /// - The upgrade or TLS handshake fails
    async fn connect(&self, endpoint: &str) -> io::Result<Self::Connection>;
}

/// An open, duplex, message-oriented connection.
#[async_trait]
pub trait TransportConnection: Send + 'static {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns `std::io::Error` if the connection is closed or broken.
    async fn send(&mut self, text: String) -> io::Result<()>;

    /// Receive the next message.
    ///
    /// Returns `None` once the peer has closed the connection. Implementations
    /// must be cancel safe: dropping the future before it completes must not
    /// lose a message.
    async fn recv(&mut self) -> Option<io::Result<String>>;

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns `std::io::Error` if the close handshake fails. The connection
    /// is unusable afterwards either way.
    async fn close(&mut self) -> io::Result<()>;
}
