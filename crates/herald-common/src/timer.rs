//! Cancellable single-shot timer
//!
//! Holds at most one deadline. Scheduling again replaces whatever was
//! pending, and the replaced value never fires.

use std::future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{self, Instant, Sleep};

/// A single-shot timer that yields `T` when it fires
#[derive(Debug)]
pub struct Timer<T> {
    pending: Option<(Pin<Box<Sleep>>, T)>,
}

impl<T> Timer<T> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Fire `value` after `delay`, replacing anything pending
    pub fn schedule(&mut self, delay: Duration, value: T) {
        self.schedule_at(Instant::now() + delay, value);
    }

    /// Fire `value` at `deadline`, replacing anything pending
    pub fn schedule_at(&mut self, deadline: Instant, value: T) {
        self.pending = Some((Box::pin(time::sleep_until(deadline)), value));
    }

    /// Drop the pending value, if any
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for the deadline and take the value
    ///
    /// Never completes while nothing is scheduled. Cancel safe: the value
    /// is only taken in the same poll that observes the deadline.
    pub async fn fired(&mut self) -> T {
        if let Some((sleep, _)) = self.pending.as_mut() {
            sleep.as_mut().await;
        }
        match self.pending.take() {
            Some((_, value)) => value,
            None => future::pending().await,
        }
    }
}

impl<T> Default for Timer<T> {
    fn default() -> Self {
        Self::new()
    }
}
