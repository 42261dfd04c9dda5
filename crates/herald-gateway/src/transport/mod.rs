//! Transport seam
//!
//! The state machine only ever sees a [`SocketHandle`]: a pair of channels
//! fed by pump tasks that own the actual socket.

mod websocket;

pub use websocket::WebSocketConnector;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Channel buffer size for frames in either direction
pub const SOCKET_BUFFER_SIZE: usize = 100;

/// Frame written to the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// JSON text frame
    Text(String),
    /// Close frame with this code; nothing is written after it
    Close(u16),
}

/// Something that happened on the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// JSON text frame
    Text(String),
    /// The peer closed, or the stream ended (`code` is `None` without a close frame)
    Closed { code: Option<u16>, reason: String },
    /// Read failed; the socket is unusable
    Error(String),
}

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not open the socket
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// The writer side has gone away
    #[error("Socket is closed")]
    Closed,
}

/// An open socket as the state machine sees it
#[derive(Debug)]
pub struct SocketHandle {
    outbound: mpsc::Sender<Outbound>,
    events: mpsc::Receiver<SocketEvent>,
    reader: Option<AbortHandle>,
}

impl SocketHandle {
    /// Wrap a pair of channels
    pub fn new(outbound: mpsc::Sender<Outbound>, events: mpsc::Receiver<SocketEvent>) -> Self {
        Self {
            outbound,
            events,
            reader: None,
        }
    }

    /// Abort this task when the handle is dropped
    pub fn with_reader(mut self, reader: AbortHandle) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Queue a text frame
    pub async fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.outbound
            .send(Outbound::Text(text))
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Queue a close frame
    ///
    /// Closing an already closed socket is not an error.
    pub async fn close(&self, code: u16) {
        if self.outbound.send(Outbound::Close(code)).await.is_err() {
            tracing::trace!(code, "Socket already closed");
        }
    }

    /// Next socket event, `None` once the reader is gone
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        self.events.recv().await
    }
}

impl Drop for SocketHandle {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Opens sockets
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a socket to `url`
    async fn connect(&self, url: &str) -> Result<SocketHandle, TransportError>;
}
