//! Gateway client errors

use crate::discovery::DiscoveryError;
use thiserror::Error;

/// Errors surfaced to collaborators
///
/// Transport, protocol and session failures never show up here; the driver
/// recovers from them on its own and only the connection state changes.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The discovery endpoint could not be used
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// The driver task has stopped
    #[error("Gateway driver has stopped")]
    DriverStopped,
}
