//! Connection and session state
//!
//! Both are owned exclusively by the gateway driver.

mod connection;
mod session;

pub use connection::{Connection, ConnectionState, Handshake};
pub use session::SessionState;
