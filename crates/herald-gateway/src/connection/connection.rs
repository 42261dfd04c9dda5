//! The active gateway connection
//!
//! One value per opened socket. A reconnect builds a new `Connection`
//! instead of mutating the old one.

use crate::protocol::GatewayMessage;
use crate::transport::{SocketEvent, SocketHandle, TransportError};
use std::fmt;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket and nothing scheduled
    Disconnected,
    /// Opening a fresh socket
    Connecting,
    /// Socket open, waiting for HELLO
    AwaitingHello,
    /// IDENTIFY sent, waiting for READY
    Identifying,
    /// Session established
    Ready,
    /// Heartbeat ack missed, recovery starting
    Degraded,
    /// Socket torn down, waiting to reconnect
    Reconnecting,
    /// RESUME sent, waiting for the first dispatch
    Resuming,
}

impl ConnectionState {
    /// Get the string representation of the state
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::AwaitingHello => "AWAITING_HELLO",
            Self::Identifying => "IDENTIFYING",
            Self::Ready => "READY",
            Self::Degraded => "DEGRADED",
            Self::Reconnecting => "RECONNECTING",
            Self::Resuming => "RESUMING",
        }
    }

    /// Whether a connection exists or is being re-established
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the handshake on this socket proceeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    /// HELLO, then IDENTIFY
    Identify,
    /// RESUME on open; HELLO only restarts the heartbeat
    Resume,
}

/// A single gateway socket and what has been seen on it
pub struct Connection {
    socket: SocketHandle,
    url: String,
    handshake: Handshake,
    last_sequence: Option<u64>,
}

impl Connection {
    /// Connection that will identify
    pub fn fresh(socket: SocketHandle, url: impl Into<String>) -> Self {
        Self {
            socket,
            url: url.into(),
            handshake: Handshake::Identify,
            last_sequence: None,
        }
    }

    /// Connection that resumes from `sequence`
    pub fn resuming(socket: SocketHandle, url: impl Into<String>, sequence: Option<u64>) -> Self {
        Self {
            socket,
            url: url.into(),
            handshake: Handshake::Resume,
            last_sequence: sequence,
        }
    }

    pub fn is_resuming(&self) -> bool {
        self.handshake == Handshake::Resume
    }

    /// Highest sequence number seen
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Record a frame's sequence number; never moves backwards
    pub fn observe_sequence(&mut self, sequence: Option<u64>) {
        if let Some(seq) = sequence {
            self.last_sequence = Some(self.last_sequence.map_or(seq, |last| last.max(seq)));
        }
    }

    /// Serialize and queue a frame
    pub async fn send(&self, message: &GatewayMessage) -> Result<(), TransportError> {
        match message.to_json() {
            Ok(json) => self.socket.send_text(json).await,
            Err(e) => {
                tracing::error!(op = %message.op, error = %e, "Failed to encode frame");
                Ok(())
            }
        }
    }

    /// Queue a close frame
    pub async fn close(&self, code: u16) {
        self.socket.close(code).await;
    }

    /// Next socket event
    pub async fn next_event(&mut self) -> Option<SocketEvent> {
        self.socket.next_event().await
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("handshake", &self.handshake)
            .field("last_sequence", &self.last_sequence)
            .finish()
    }
}
