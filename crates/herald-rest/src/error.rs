//! Dispatch errors

use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Why a send did not deliver
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No target channel was given
    #[error("No target channel for message")]
    MissingTarget,

    /// The server rejected the request as over the limit (429)
    #[error("Rate limited, window resets in {reset_after:?}")]
    RateLimited { reset_after: Duration },

    /// The server answered with a non-success status
    #[error("Request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The request never reached the server
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The dispatcher task has stopped
    #[error("Dispatcher has stopped")]
    DispatcherStopped,
}
