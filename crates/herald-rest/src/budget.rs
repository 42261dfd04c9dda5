//! Rate budget
//!
//! How many sends the current window still allows.

use std::time::Duration;

/// Capacity used before the server has reported one
pub const DEFAULT_CAPACITY: u32 = 1;

/// Window reset delay used before the server has reported one
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_millis(5_000);

/// Requests allowed per window and requests sent in the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    capacity: u32,
    consumed: u32,
    reset_delay: Duration,
}

impl RateBudget {
    /// Create a budget; capacity is clamped to at least 1
    pub fn new(capacity: u32, reset_delay: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            consumed: 0,
            reset_delay,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn consumed(&self) -> u32 {
        self.consumed
    }

    pub fn reset_delay(&self) -> Duration {
        self.reset_delay
    }

    pub fn has_capacity(&self) -> bool {
        self.consumed < self.capacity
    }

    /// Take one slot if the window allows it
    pub fn try_consume(&mut self) -> bool {
        if self.has_capacity() {
            self.consumed += 1;
            true
        } else {
            false
        }
    }

    /// Give back a slot that never reached the server
    pub fn release(&mut self) {
        self.consumed = self.consumed.saturating_sub(1);
    }

    /// A new window opens
    pub fn reset(&mut self) {
        self.consumed = 0;
    }

    /// Capacity reported by the server, clamped to at least 1
    pub fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity.max(1);
    }

    pub fn set_reset_delay(&mut self, reset_delay: Duration) {
        self.reset_delay = reset_delay;
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RESET_DELAY)
    }
}
