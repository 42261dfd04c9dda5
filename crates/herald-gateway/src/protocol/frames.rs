//! Typed inbound frames
//!
//! Every frame the server sends is decoded once, up front, into one variant.

use super::{GatewayMessage, HelloPayload, OpCode, ProtocolError, ReadyPayload};
use crate::events::{DispatchEvent, GatewayEventType};
use serde_json::Value;

/// A decoded server-to-client frame
#[derive(Debug, Clone)]
pub enum InboundFrame {
    /// op 10: start heartbeating at this interval
    Hello(HelloPayload),
    /// op 1: the server wants a heartbeat right now
    HeartbeatRequest,
    /// op 11: the last heartbeat arrived
    HeartbeatAck,
    /// op 7: reconnect and resume
    Reconnect,
    /// op 9: the session is gone
    InvalidSession { resumable: bool },
    /// op 0 with `t = "READY"`: the session was created
    Ready(ReadyPayload),
    /// op 0, any other event
    Dispatch(DispatchEvent),
}

impl InboundFrame {
    /// Short name for logs
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Hello(_) => "HELLO",
            Self::HeartbeatRequest => "HEARTBEAT",
            Self::HeartbeatAck => "HEARTBEAT_ACK",
            Self::Reconnect => "RECONNECT",
            Self::InvalidSession { .. } => "INVALID_SESSION",
            Self::Ready(_) => "READY",
            Self::Dispatch(event) => &event.name,
        }
    }
}

impl TryFrom<GatewayMessage> for InboundFrame {
    type Error = ProtocolError;

    fn try_from(message: GatewayMessage) -> Result<Self, Self::Error> {
        let op = message.op;
        match op {
            OpCode::Hello => {
                let data = message.d.ok_or_else(|| missing(op))?;
                let hello: HelloPayload = serde_json::from_value(data).map_err(|e| invalid(op, &e))?;
                if hello.heartbeat_interval == 0 {
                    return Err(ProtocolError::InvalidPayload {
                        op,
                        reason: "heartbeat_interval must be positive".to_string(),
                    });
                }
                Ok(Self::Hello(hello))
            }
            OpCode::Heartbeat => Ok(Self::HeartbeatRequest),
            OpCode::HeartbeatAck => Ok(Self::HeartbeatAck),
            OpCode::Reconnect => Ok(Self::Reconnect),
            OpCode::InvalidSession => Ok(Self::InvalidSession {
                resumable: message.d.as_ref().and_then(Value::as_bool).unwrap_or(false),
            }),
            OpCode::Dispatch => {
                let name = message.t.ok_or_else(|| ProtocolError::InvalidPayload {
                    op,
                    reason: "dispatch without event type".to_string(),
                })?;
                let data = message.d.unwrap_or(Value::Null);
                let kind = GatewayEventType::from_name(&name);

                if kind == GatewayEventType::Ready {
                    let ready: ReadyPayload =
                        serde_json::from_value(data).map_err(|e| invalid(op, &e))?;
                    return Ok(Self::Ready(ready));
                }

                Ok(Self::Dispatch(DispatchEvent {
                    kind,
                    name,
                    sequence: message.s,
                    data,
                }))
            }
            OpCode::Identify | OpCode::Resume => Err(ProtocolError::UnexpectedOpcode(op)),
        }
    }
}

fn missing(op: OpCode) -> ProtocolError {
    ProtocolError::InvalidPayload {
        op,
        reason: "missing d".to_string(),
    }
}

fn invalid(op: OpCode, err: &serde_json::Error) -> ProtocolError {
    ProtocolError::InvalidPayload {
        op,
        reason: err.to_string(),
    }
}
