//! # herald-rest
//!
//! Outbound message delivery against a server-reported rate budget.

pub mod budget;
pub mod dispatcher;
pub mod error;
pub mod transport;

pub use budget::{RateBudget, DEFAULT_CAPACITY, DEFAULT_RESET_DELAY};
pub use dispatcher::{BudgetSnapshot, Delivery, Dispatcher, DispatcherHandle};
pub use error::DispatchError;
pub use transport::{
    HttpRestTransport, OutboundMessage, RateLimitHeaders, RestResponse, RestTransport, TransportError,
};
