//! DDP sessions over Turmoil's simulated TCP.
//!
//! Messages are framed one per line. Encoded DDP messages never contain a
//! raw newline, so a line is exactly one message.

use std::io;

use async_trait::async_trait;
use rotor_core::transport::{Transport, TransportConnection};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf};
use turmoil::net::{TcpListener, TcpStream};
use url::Url;

/// Dials simulated hosts in place of a WebSocket endpoint.
///
/// Each line stands in for one WebSocket text frame. Turmoil decides
/// delivery timing, so latency, loss and partitions can be injected.
///
/// The endpoint URL's host and port select the Turmoil host; `ws` defaults to
/// port 80 and `wss` to 443. No TLS or HTTP upgrade is simulated.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTransport;

impl SimTransport {
    /// Create a client transport.
    pub fn client() -> Self {
        Self
    }

    /// Bind a listener for a scripted server.
    ///
    /// # Errors
    ///
    /// Returns error if the address is already in use or malformed.
    pub async fn bind(address: &str) -> io::Result<SimListener> {
        let listener = TcpListener::bind(address).await?;
        Ok(SimListener { listener })
    }

    /// Connect directly to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns error if the host is unreachable or refuses the connection.
    pub async fn connect_to_host(&self, address: &str) -> io::Result<SimConnection> {
        let stream = TcpStream::connect(address).await?;
        Ok(SimConnection::new(stream))
    }
}

#[async_trait]
impl Transport for SimTransport {
    type Connection = SimConnection;

    async fn connect(&self, endpoint: &str) -> io::Result<Self::Connection> {
        let address = host_and_port(endpoint)?;
        tracing::debug!(endpoint, %address, "connecting simulated transport");
        self.connect_to_host(&address).await
    }
}

/// Server side of the simulated transport.
pub struct SimListener {
    listener: TcpListener,
}

impl SimListener {
    /// Wait for the next client.
    ///
    /// # Errors
    ///
    /// Returns error if the listener is broken.
    pub async fn accept(&self) -> io::Result<SimConnection> {
        let (stream, _addr) = self.listener.accept().await?;
        Ok(SimConnection::new(stream))
    }
}

/// One simulated connection, usable from either side.
pub struct SimConnection {
    lines: Lines<BufReader<ReadHalf<TcpStream>>>,
    send: WriteHalf<TcpStream>,
}

impl SimConnection {
    fn new(stream: TcpStream) -> Self {
        let (recv, send) = tokio::io::split(stream);
        Self { lines: BufReader::new(recv).lines(), send }
    }
}

#[async_trait]
impl TransportConnection for SimConnection {
    async fn send(&mut self, text: String) -> io::Result<()> {
        if text.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "message contains a newline and cannot be line framed",
            ));
        }

        let mut line = text.into_bytes();
        line.push(b'\n');
        self.send.write_all(&line).await?;
        self.send.flush().await
    }

    async fn recv(&mut self) -> Option<io::Result<String>> {
        // `next_line` is cancel safe.
        self.lines.next_line().await.transpose()
    }

    async fn close(&mut self) -> io::Result<()> {
        self.send.shutdown().await
    }
}

/// `ws://server:8080/websocket` -> `server:8080`
fn host_and_port(endpoint: &str) -> io::Result<String> {
    let invalid = |reason: String| io::Error::new(io::ErrorKind::InvalidInput, reason);

    let url = Url::parse(endpoint).map_err(|e| invalid(format!("{endpoint}: {e}")))?;
    let host = url.host_str().ok_or_else(|| invalid(format!("{endpoint}: no host")))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| invalid(format!("{endpoint}: no port for scheme {}", url.scheme())))?;

    Ok(format!("{host}:{port}"))
}
