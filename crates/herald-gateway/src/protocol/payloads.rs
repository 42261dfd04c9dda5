//! Handshake payload definitions

use herald_core::{Intents, Snowflake};
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Pushed by the server as soon as the transport opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Bot token
    pub token: String,

    /// Capability bitmask
    pub intents: Intents,

    /// Client metadata
    pub properties: IdentifyProperties,
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    pub os: String,

    /// Library name
    pub browser: String,

    /// Library name again, the server expects both
    pub device: String,
}

impl IdentifyProperties {
    /// Create properties describing this library on the current OS
    #[must_use]
    pub fn new() -> Self {
        let library = env!("CARGO_PKG_NAME").to_string();
        Self {
            os: std::env::consts::OS.to_string(),
            browser: library.clone(),
            device: library,
        }
    }

    /// Set operating system
    #[must_use]
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Set browser/device name
    #[must_use]
    pub fn with_library(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.browser.clone_from(&name);
        self.device = name;
        self
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Bot token
    pub token: String,

    /// Session ID to resume
    pub session_id: String,

    /// Last received sequence number
    pub seq: u64,
}

/// Data of the `READY` dispatch
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyPayload {
    /// Session to resume with
    pub session_id: String,

    /// Endpoint to reconnect to when resuming
    pub resume_gateway_url: String,

    /// The connected account
    pub user: ReadyUser,
}

/// Account of the connected bot
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyUser {
    pub id: Snowflake,
    #[serde(default)]
    pub username: String,
}
