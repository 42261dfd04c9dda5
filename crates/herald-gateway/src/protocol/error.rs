//! Protocol error types

use super::OpCode;
use thiserror::Error;

/// A frame that could not be turned into an [`InboundFrame`](super::InboundFrame)
///
/// Never fatal: the frame is logged and dropped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Text was not a valid gateway envelope
    #[error("Failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// Payload did not match what the op code requires
    #[error("Invalid {op} payload: {reason}")]
    InvalidPayload { op: OpCode, reason: String },

    /// Op code the server is not supposed to send
    #[error("Unexpected op code from server: {0}")]
    UnexpectedOpcode(OpCode),
}
