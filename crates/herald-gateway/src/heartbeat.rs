//! Heartbeat monitor
//!
//! Owns at most one repeating interval. Starting again replaces the old
//! interval, so two timers can never beat against the same connection.

use std::future;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// What to do on an interval tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Previous beat was acknowledged; send another
    Send,
    /// Previous beat was never acknowledged; the connection is dead
    Missed,
}

/// Tracks liveness of the active connection
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    interval: Option<Interval>,
    period: Option<Duration>,
    awaiting_ack: bool,
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start beating every `period`, cancelling any running interval
    ///
    /// The first tick fires one full period from now.
    pub fn start(&mut self, period: Duration) {
        if self.interval.is_some() {
            tracing::debug!("Replacing running heartbeat interval");
        }
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        self.period = Some(period);
        self.awaiting_ack = false;
    }

    /// Cancel the interval
    pub fn stop(&mut self) {
        self.interval = None;
        self.period = None;
        self.awaiting_ack = false;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Whether a beat is outstanding
    pub fn awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    /// The server acknowledged the last beat
    pub fn acknowledge(&mut self) {
        self.awaiting_ack = false;
    }

    /// Wait for the next tick; never completes while stopped
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }

    /// Decide what a tick means
    ///
    /// A miss stops the monitor; the caller then runs recovery exactly once.
    pub fn on_tick(&mut self) -> Beat {
        if self.awaiting_ack {
            self.stop();
            Beat::Missed
        } else {
            self.awaiting_ack = true;
            Beat::Send
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_full_period() {
        let mut monitor = HeartbeatMonitor::new();
        let started = Instant::now();
        monitor.start(Duration::from_millis(45_000));

        monitor.tick().await;
        assert_eq!(started.elapsed(), Duration::from_millis(45_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledged_beat_keeps_beating() {
        let mut monitor = HeartbeatMonitor::new();
        monitor.start(Duration::from_millis(45_000));

        monitor.tick().await;
        assert_eq!(monitor.on_tick(), Beat::Send);
        assert!(monitor.awaiting_ack());

        time::sleep(Duration::from_millis(40_000)).await;
        monitor.acknowledge();

        monitor.tick().await;
        assert_eq!(monitor.on_tick(), Beat::Send);
        assert!(monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_ack_stops_monitor() {
        let mut monitor = HeartbeatMonitor::new();
        monitor.start(Duration::from_millis(1_000));

        monitor.tick().await;
        assert_eq!(monitor.on_tick(), Beat::Send);
        monitor.tick().await;
        assert_eq!(monitor.on_tick(), Beat::Missed);
        assert!(!monitor.is_running());
        assert!(!monitor.awaiting_ack());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_interval() {
        let mut monitor = HeartbeatMonitor::new();
        monitor.start(Duration::from_millis(1_000));
        time::sleep(Duration::from_millis(900)).await;

        let restarted = Instant::now();
        monitor.start(Duration::from_millis(5_000));
        monitor.tick().await;
        assert_eq!(restarted.elapsed(), Duration::from_millis(5_000));
        assert_eq!(monitor.period(), Some(Duration::from_millis(5_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_monitor_never_ticks() {
        let mut monitor = HeartbeatMonitor::new();
        monitor.start(Duration::from_millis(10));
        monitor.stop();

        let result = time::timeout(Duration::from_secs(60), monitor.tick()).await;
        assert!(result.is_err());
    }
}
