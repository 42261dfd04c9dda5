//! Test fixtures and frame builders

use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;

/// Token every test client identifies with
pub const TEST_TOKEN: &str = "integration-token";

/// Session id handed out in READY
pub const TEST_SESSION: &str = "session-1";

/// A message creation request the fake REST API received
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub channel_id: String,
    pub authorization: Option<String>,
    pub user_agent: Option<String>,
    pub body: Value,
    pub received_at: Instant,
}

/// How the fake REST API answers the next message creation request
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    pub status: u16,
    pub limit: Option<u32>,
    pub reset_after: Option<f64>,
}

impl ScriptedReply {
    pub fn ok() -> Self {
        Self {
            status: 200,
            limit: None,
            reset_after: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            ..Self::ok()
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_reset_after(mut self, reset_after: Duration) -> Self {
        self.reset_after = Some(reset_after.as_secs_f64());
        self
    }
}

impl Default for ScriptedReply {
    fn default() -> Self {
        Self::ok()
    }
}

/// Op 10
pub fn hello(heartbeat_interval_ms: u64) -> Value {
    json!({"op": 10, "d": {"heartbeat_interval": heartbeat_interval_ms}})
}

/// READY dispatch pointing resumes at `resume_gateway_url`
pub fn ready(sequence: u64, resume_gateway_url: &str) -> Value {
    json!({
        "op": 0,
        "t": "READY",
        "s": sequence,
        "d": {
            "session_id": TEST_SESSION,
            "resume_gateway_url": resume_gateway_url,
            "user": {"id": "900", "username": "herald"}
        }
    })
}

/// MESSAGE_CREATE dispatch
pub fn message_create(sequence: u64, channel_id: u64, content: &str) -> Value {
    json!({
        "op": 0,
        "t": "MESSAGE_CREATE",
        "s": sequence,
        "d": {
            "id": "1000",
            "channel_id": channel_id.to_string(),
            "author": {"id": "2000", "username": "someone", "bot": false},
            "content": content
        }
    })
}
