//! Dispatch events delivered to collaborators

mod event_types;
mod payloads;

pub use event_types::GatewayEventType;
pub use payloads::{GuildChannel, GuildCreateEvent, MessageAuthor, MessageCreateEvent, GUILD_TEXT_CHANNEL};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A dispatch frame forwarded verbatim to the registered event handler
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    /// Classified event type
    pub kind: GatewayEventType,
    /// Event name exactly as sent
    pub name: String,
    /// Sequence number of the frame
    pub sequence: Option<u64>,
    /// Event data
    pub data: Value,
}

impl DispatchEvent {
    /// Parse as `MESSAGE_CREATE` data
    pub fn as_message_create(&self) -> Option<MessageCreateEvent> {
        self.parse_if(GatewayEventType::MessageCreate)
    }

    /// Parse as `GUILD_CREATE` data
    pub fn as_guild_create(&self) -> Option<GuildCreateEvent> {
        self.parse_if(GatewayEventType::GuildCreate)
    }

    fn parse_if<T: DeserializeOwned>(&self, kind: GatewayEventType) -> Option<T> {
        if self.kind != kind {
            return None;
        }
        match serde_json::from_value(self.data.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::debug!(event = %self.name, error = %e, "Event data did not match expected shape");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str, data: Value) -> DispatchEvent {
        DispatchEvent {
            kind: GatewayEventType::from_name(name),
            name: name.to_string(),
            sequence: Some(1),
            data,
        }
    }

    #[test]
    fn test_as_message_create() {
        let message = event(
            "MESSAGE_CREATE",
            json!({"id": "1", "channel_id": "2", "author": {"id": "3"}, "content": "yp!get"}),
        );
        let parsed = message.as_message_create().unwrap();
        assert_eq!(parsed.content, "yp!get");
        assert!(message.as_guild_create().is_none());
    }

    #[test]
    fn test_mismatched_shape_yields_none() {
        let message = event("MESSAGE_CREATE", json!({"content": 5}));
        assert!(message.as_message_create().is_none());
    }
}
