//! # Transport seam of the reconnecting client.
//!
//! The client state machine only needs two things from a transport: open a
//! connection, and read text frames from it until it ends. [`Connector`] and
//! [`Connection`] capture exactly that, so the state machine can be driven by
//! [`WsConnector`] in production and by scripted connectors in tests.
//!
//! ## Frame handling in [`WsConnection`]
//! ```text
//! Text(t)           → Some(Ok(t))
//! Binary(b) (utf-8) → Some(Ok(t))
//! Binary(b) (other) → skipped (logged)
//! Ping/Pong/Frame   → skipped (pongs are queued by tungstenite)
//! Close / end       → None
//! read error        → Some(Err(Transport))
//! ```

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

use crate::error::ClientError;

/// An open, readable stream of text frames.
#[async_trait]
pub trait Connection: Send {
    /// Reads the next text frame.
    ///
    /// Returns `None` once the peer closed the stream.
    async fn next_frame(&mut self) -> Option<Result<String, ClientError>>;

    /// Closes the connection. Errors are swallowed; the connection is
    /// unusable afterwards either way.
    async fn close(&mut self);
}

/// Opens [`Connection`]s to a fixed endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Attempts to open a new connection.
    async fn connect(&self) -> Result<Box<dyn Connection>, ClientError>;

    /// Endpoint description for logs.
    fn endpoint(&self) -> &str;
}

/// Websocket connector built on `tokio-tungstenite`.
#[derive(Clone, Debug)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Creates a connector for `url` (`ws://` or `wss://`).
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, ClientError> {
        let (stream, response) =
            connect_async(self.url.as_str())
                .await
                .map_err(|e| ClientError::Connect {
                    error: e.to_string(),
                })?;
        debug!(url = %self.url, status = %response.status(), "websocket handshake done");
        Ok(Box::new(WsConnection { stream }))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// A live websocket connection.
pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Connection for WsConnection {
    async fn next_frame(&mut self) -> Option<Result<String, ClientError>> {
        loop {
            let frame = match self.stream.next().await? {
                Ok(frame) => frame,
                Err(e) => {
                    return Some(Err(ClientError::Transport {
                        error: e.to_string(),
                    }))
                }
            };
            match frame {
                WsMessage::Text(text) => return Some(Ok(text)),
                WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => debug!("skipping non utf-8 binary frame"),
                },
                WsMessage::Close(_) => return None,
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "websocket close");
        }
    }
}

