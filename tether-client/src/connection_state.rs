//! Connection state and session bookkeeping
//!
//! # Connection States
//!
//! - **Closed**: no transport; either never connected, dropped, or closed
//! - **Connecting**: a transport attempt is in flight
//! - **Open**: the transport is usable
//! - **Closing**: `close()` is tearing the transport down
//!
//! # State Transitions
//!
//! ```text
//!          connect()              opened
//! Closed ───────────▶ Connecting ───────▶ Open
//!   ▲                   │                  │
//!   │  timeout/failure  │   peer close,    │
//!   ├───────────────────┘   error, dead    │
//!   ├──────────────────────────────────────┘
//!   │                                          (any) ──close()──▶ Closing ──▶ Closed
//!   └── reconnect timer fires ──▶ Connecting
//! ```
//!
//! [`ClientSession`] holds everything the lifecycle manager mutates under its
//! lock: state, counters, flags, the outbound queue, the transport sink and
//! the handles of every timer task. Each connect attempt (and `close()`)
//! bumps the session epoch; tasks remember the epoch they were started for
//! and are ignored once it has moved on.

use crate::keepalive::KeepaliveState;
use crate::queue::OutboundQueue;
use crate::reconnect::ReconnectionStrategy;
use crate::transport::FrameSink;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Closing,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Closed => "CLOSED",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Open => "OPEN",
            ConnectionState::Closing => "CLOSING",
        }
    }

    /// Numeric value recorded by the connection state gauge
    pub fn metric_value(&self) -> i64 {
        match self {
            ConnectionState::Closed => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Open => 2,
            ConnectionState::Closing => 3,
        }
    }

    /// Connecting or Open: a transport is associated with the client
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative counters kept across reconnects
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Counters {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub last_connected: Option<SystemTime>,
    pub last_disconnected: Option<SystemTime>,
}

/// Snapshot of client statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStats {
    pub messages_sent: u64,
    pub messages_received: u64,
    /// Reconnections scheduled over the client's lifetime
    pub reconnect_count: u64,
    pub last_connected: Option<SystemTime>,
    pub last_disconnected: Option<SystemTime>,
    pub current_state: ConnectionState,
    pub queue_length: usize,
    /// Attempts made since the last successful connection
    pub reconnect_attempts: u32,
    pub max_reconnect_attempts: u32,
    pub is_reconnecting: bool,
    pub address: String,
}

impl ClientStats {
    pub fn is_connected(&self) -> bool {
        self.current_state == ConnectionState::Open
    }
}

/// What the session decided after a connection was lost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReconnectPlan {
    /// Nothing to do: manual disconnect or a timer is already pending
    Skip,
    /// The strategy gave up
    GiveUp { attempts: u32, max_attempts: u32 },
    /// Wait `delay`, then attempt again
    Retry {
        attempt: u32,
        max_attempts: u32,
        delay: Duration,
    },
}

/// Handles of the tasks tied to the session
#[derive(Debug, Default)]
pub(crate) struct SessionTasks {
    pub attempt: Option<JoinHandle<()>>,
    pub connect_timeout: Option<JoinHandle<()>>,
    pub reader: Option<JoinHandle<()>>,
    pub keepalive: Option<JoinHandle<()>>,
    pub reconnect: Option<JoinHandle<()>>,
}

impl SessionTasks {
    /// Abort everything tied to the current transport
    pub fn abort_transport(&mut self) {
        for task in [
            self.attempt.take(),
            self.connect_timeout.take(),
            self.reader.take(),
            self.keepalive.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }

    pub fn abort_reconnect(&mut self) {
        if let Some(task) = self.reconnect.take() {
            task.abort();
        }
    }

    pub fn abort_all(&mut self) {
        self.abort_transport();
        self.abort_reconnect();
    }
}

/// Mutable state of one client, guarded by the client's session lock
pub(crate) struct ClientSession {
    pub address: String,
    pub state: ConnectionState,
    pub epoch: u64,
    pub reconnect_attempts: u32,
    /// The strategy gave up; a manual connect starts counting again
    pub exhausted: bool,
    pub manually_disconnected: bool,
    pub reconnecting: bool,
    pub counters: Counters,
    pub queue: OutboundQueue,
    pub sink: Option<FrameSink>,
    pub keepalive: KeepaliveState,
    pub tasks: SessionTasks,
}

impl ClientSession {
    pub fn new(address: String) -> Self {
        Self {
            address,
            state: ConnectionState::Closed,
            epoch: 0,
            reconnect_attempts: 0,
            exhausted: false,
            manually_disconnected: false,
            reconnecting: false,
            counters: Counters::default(),
            queue: OutboundQueue::new(),
            sink: None,
            keepalive: KeepaliveState::new(Instant::now()),
            tasks: SessionTasks::default(),
        }
    }

    /// Whether `epoch` still identifies the live transport
    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch && self.state.is_active()
    }

    /// Enter Connecting, discarding any previous transport
    ///
    /// Returns the epoch of the new attempt.
    pub fn begin_attempt(&mut self) -> u64 {
        self.tasks.abort_transport();
        self.sink = None;
        self.epoch += 1;
        self.state = ConnectionState::Connecting;
        self.reconnecting = false;
        self.epoch
    }

    /// Record a successful open
    pub fn mark_open(&mut self, sink: FrameSink) {
        if let Some(task) = self.tasks.connect_timeout.take() {
            task.abort();
        }
        self.sink = Some(sink);
        self.state = ConnectionState::Open;
        self.reconnect_attempts = 0;
        self.exhausted = false;
        self.reconnecting = false;
        self.counters.last_connected = Some(SystemTime::now());
        self.keepalive.reset(Instant::now());
    }

    /// Record a lost connection, returning the sink so it can be shut down
    ///
    /// The caller must first take the handle of the task it is running in,
    /// if any, so it is not aborted here.
    pub fn mark_closed(&mut self) -> Option<FrameSink> {
        self.tasks.abort_transport();
        self.state = ConnectionState::Closed;
        self.counters.last_disconnected = Some(SystemTime::now());
        self.sink.take()
    }

    /// Enter Closing for a manual close
    ///
    /// Returns the sink to shut down and whether a transport was active.
    pub fn begin_close(&mut self) -> (Option<FrameSink>, bool) {
        let was_active = self.state.is_active();
        self.manually_disconnected = true;
        self.reconnecting = false;
        self.epoch += 1;
        self.state = ConnectionState::Closing;
        self.tasks.abort_all();
        (self.sink.take(), was_active)
    }

    pub fn finish_close(&mut self, was_active: bool) {
        self.state = ConnectionState::Closed;
        if was_active {
            self.counters.last_disconnected = Some(SystemTime::now());
        }
    }

    /// Consult the strategy after a lost connection
    pub fn plan_reconnect(&mut self, strategy: &dyn ReconnectionStrategy) -> ReconnectPlan {
        if self.manually_disconnected || self.reconnecting {
            return ReconnectPlan::Skip;
        }

        let attempt = self.reconnect_attempts.saturating_add(1);
        let max_attempts = strategy.max_attempts();
        match strategy.next_delay(attempt) {
            Some(delay) => {
                self.reconnecting = true;
                self.reconnect_attempts = attempt;
                self.counters.reconnect_count += 1;
                ReconnectPlan::Retry {
                    attempt,
                    max_attempts,
                    delay,
                }
            }
            None => {
                self.exhausted = true;
                ReconnectPlan::GiveUp {
                    attempts: self.reconnect_attempts,
                    max_attempts,
                }
            }
        }
    }

    /// Cancel a pending reconnection timer
    pub fn cancel_reconnect(&mut self) {
        self.tasks.abort_reconnect();
        self.reconnecting = false;
    }

    pub fn reset_counters(&mut self) {
        self.counters = Counters::default();
    }

    pub fn stats(&self, max_reconnect_attempts: u32) -> ClientStats {
        ClientStats {
            messages_sent: self.counters.messages_sent,
            messages_received: self.counters.messages_received,
            reconnect_count: self.counters.reconnect_count,
            last_connected: self.counters.last_connected,
            last_disconnected: self.counters.last_disconnected,
            current_state: self.state,
            queue_length: self.queue.len(),
            reconnect_attempts: self.reconnect_attempts,
            max_reconnect_attempts,
            is_reconnecting: self.reconnecting,
            address: self.address.clone(),
        }
    }
}
