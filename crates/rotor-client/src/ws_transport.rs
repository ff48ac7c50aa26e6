//! WebSocket transport using tokio-tungstenite.
//!
//! One DDP message per text frame. WebSocket-level ping/pong frames are
//! answered by tungstenite itself; DDP keepalives are ordinary text messages
//! and go to the session.

use std::io;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use rotor_core::transport::{Transport, TransportConnection};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};

/// Opens WebSocket connections to `ws://` and `wss://` endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    type Connection = WsConnection;

    async fn connect(&self, endpoint: &str) -> io::Result<Self::Connection> {
        let (stream, response) = connect_async(endpoint).await.map_err(into_io)?;
        tracing::debug!(endpoint, status = %response.status(), "websocket upgraded");
        Ok(WsConnection { stream })
    }
}

/// An open WebSocket.
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TransportConnection for WsConnection {
    async fn send(&mut self, text: String) -> io::Result<()> {
        self.stream.send(Message::Text(text)).await.map_err(into_io)
    }

    async fn recv(&mut self) -> Option<io::Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => tracing::warn!(error = %e, "dropping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!(?frame, "peer closed websocket");
                    return None;
                },
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {},
                Err(tungstenite::Error::ConnectionClosed) => return None,
                Err(e) => return Some(Err(into_io(e))),
            }
        }
    }

    async fn close(&mut self) -> io::Result<()> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(into_io(e)),
        }
    }
}

fn into_io(error: tungstenite::Error) -> io::Error {
    match error {
        tungstenite::Error::Io(e) => e,
        other => io::Error::other(other),
    }
}
