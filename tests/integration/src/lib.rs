//! Integration test utilities
//!
//! Starts an in-process server that plays the gateway, the REST API and the
//! playlist API so the real WebSocket connector and HTTP clients can be
//! exercised end to end.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
