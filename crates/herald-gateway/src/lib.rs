//! # herald-gateway
//!
//! Client side of the real-time gateway: handshake, heartbeating, disconnect
//! detection, session resumption and reconnection.

pub mod client;
pub mod connection;
pub mod discovery;
pub mod events;
pub mod heartbeat;
pub mod protocol;
pub mod transport;

pub use client::{EventHandler, GatewayClient, GatewayConfig, GatewayError, GatewayHandle};
pub use connection::{Connection, ConnectionState, SessionState};
pub use events::{DispatchEvent, GatewayEventType};
pub use heartbeat::{Beat, HeartbeatMonitor};
