//! Application-level keepalive
//!
//! While a connection is open the monitor sends a `ping` text frame every
//! interval and then waits for the response window. An inbound `pong`
//! refreshes the last-alive instant. If, after the window, the connection has
//! been silent for longer than the dead-connection threshold, the monitor
//! asks the client to force the transport closed; the client treats that like
//! any abnormal close and schedules a reconnection.
//!
//! ```text
//! open ──interval──▶ ping ──response wait──▶ silent > threshold? ──yes──▶ force close
//!                      ▲                              │
//!                      └──────────────no──────────────┘
//! ```
//!
//! One monitor task runs per open connection. It holds only a weak reference
//! to the client and stops as soon as its connection is no longer current.

use crate::client::Inner;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Default interval between probes
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Default wait after each probe before checking liveness
pub const DEFAULT_RESPONSE_WAIT: Duration = Duration::from_secs(5);

/// Default silence after which a connection is considered dead
pub const DEFAULT_DEAD_AFTER: Duration = Duration::from_secs(10);

/// Liveness bookkeeping for the current connection
#[derive(Debug, Clone)]
pub(crate) struct KeepaliveState {
    last_alive: Instant,
    probes_sent: u64,
}

impl KeepaliveState {
    pub(crate) fn new(now: Instant) -> Self {
        Self {
            last_alive: now,
            probes_sent: 0,
        }
    }

    /// Start over for a freshly opened connection
    pub(crate) fn reset(&mut self, now: Instant) {
        *self = Self::new(now);
    }

    /// The peer answered a probe
    pub(crate) fn record_alive(&mut self, now: Instant) {
        self.last_alive = now;
    }

    pub(crate) fn record_probe(&mut self) {
        self.probes_sent += 1;
    }

    pub(crate) fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_alive)
    }

    pub(crate) fn probes_sent(&self) -> u64 {
        self.probes_sent
    }
}

/// Probe schedule and liveness threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepaliveMonitor {
    interval: Duration,
    response_wait: Duration,
    dead_after: Duration,
}

impl Default for KeepaliveMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL, DEFAULT_RESPONSE_WAIT, DEFAULT_DEAD_AFTER)
    }
}

impl KeepaliveMonitor {
    pub fn new(interval: Duration, response_wait: Duration, dead_after: Duration) -> Self {
        Self {
            interval,
            response_wait,
            dead_after,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the connection has been silent for too long
    pub(crate) fn is_dead(&self, state: &KeepaliveState, now: Instant) -> bool {
        state.silence(now) > self.dead_after
    }

    /// Start the probe loop for the connection identified by `epoch`
    pub(crate) fn spawn(&self, client: Weak<Inner>, epoch: u64) -> JoinHandle<()> {
        let monitor = *self;
        tokio::spawn(async move { monitor.run(client, epoch).await })
    }

    async fn run(self, client: Weak<Inner>, epoch: u64) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(inner) = client.upgrade() else {
                return;
            };
            if !inner.send_probe(epoch).await {
                return;
            }
            drop(inner);

            tokio::time::sleep(self.response_wait).await;
            let Some(inner) = client.upgrade() else {
                return;
            };
            if !inner.check_liveness(epoch).await {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let monitor = KeepaliveMonitor::default();
        assert_eq!(monitor.interval(), Duration::from_secs(30));
        assert_eq!(monitor, KeepaliveMonitor::new(
            Duration::from_secs(30),
            Duration::from_secs(5),
            Duration::from_secs(10),
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_threshold() {
        let monitor = KeepaliveMonitor::default();
        let mut state = KeepaliveState::new(Instant::now());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!monitor.is_dead(&state, Instant::now()));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(monitor.is_dead(&state, Instant::now()));

        state.record_alive(Instant::now());
        assert!(!monitor.is_dead(&state, Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_probe_count() {
        let mut state = KeepaliveState::new(Instant::now());
        state.record_probe();
        state.record_probe();
        assert_eq!(state.probes_sent(), 2);

        tokio::time::advance(Duration::from_secs(60)).await;
        state.reset(Instant::now());
        assert_eq!(state.probes_sent(), 0);
        assert_eq!(state.silence(Instant::now()), Duration::ZERO);
    }
}
