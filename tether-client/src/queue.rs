//! Outbound message queue
//!
//! Structured messages sent while no transport is open are held here in FIFO
//! order and flushed as a whole batch on the next successful connection.
//! The queue is unbounded. Control frames never enter it.

use std::collections::VecDeque;
use tether_core::{CorrelationId, OutboundMessage};

/// FIFO buffer of messages waiting for an open transport
#[derive(Debug, Default)]
pub struct OutboundQueue {
    messages: VecDeque<OutboundMessage>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the tail
    pub fn enqueue(&mut self, message: OutboundMessage) {
        self.messages.push_back(message);
    }

    /// Remove every queued message, oldest first
    ///
    /// The queue is empty afterwards; entries that fail to send are not put
    /// back.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        self.messages.drain(..).collect()
    }

    /// Withdraw the queued message carrying `id`
    ///
    /// Used when a request settles before it could be sent, so the backend
    /// never sees a request its caller already gave up on.
    pub fn remove(&mut self, id: &CorrelationId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id.as_ref() != Some(id));
        self.messages.len() != before
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Type tags of the queued messages, oldest first
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(|m| m.kind.as_str())
    }
}
