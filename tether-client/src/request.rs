//! Request/response correlation
//!
//! The channel itself is fire-and-forget. This module layers a
//! synchronous-style call on top of it:
//!
//! 1. **Generate ID**: `<session prefix>-<counter>`, unique for the client's lifetime
//! 2. **Register**: pending entry with a oneshot slot and a deadline timer
//! 3. **Send**: the client hands the request to the channel (or queues it)
//! 4. **Settle**: the first of matching response, deadline, send failure or
//!    client close wins
//!
//! Inbound `response` messages are offered to [`RequestManager::resolve`] by
//! the read path before they reach subscribers, so a request issued from
//! inside a subscriber callback is answered regardless of how far event
//! delivery has progressed.
//!
//! Settling means removing the entry from the pending table. Only the task
//! that removed it completes the slot, so every request is settled exactly
//! once; later responses carrying the same id are ignored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tether_core::{CorrelationId, Error, InboundMessage, Result, RESPONSE_TYPE};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Request waiting for its response
pub struct PendingRequest {
    /// Type tag of the request, reported on timeout
    pub request_type: String,
    pub timeout: Duration,
    pub deadline: Instant,
    tx: oneshot::Sender<Result<InboundMessage>>,
    timer: Option<JoinHandle<()>>,
}

/// Manager for tracking pending requests
#[derive(Clone)]
pub struct RequestManager {
    pending: Arc<Mutex<HashMap<CorrelationId, PendingRequest>>>,
    counter: Arc<AtomicU64>,
    prefix: Arc<str>,
}

impl Default for RequestManager {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestManager {
    pub fn new() -> Self {
        let prefix = format!("{:08x}", rand::random::<u32>());
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            counter: Arc::new(AtomicU64::new(1)),
            prefix: prefix.into(),
        }
    }

    /// Generate a new unique correlation id
    pub fn next_id(&self) -> CorrelationId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        CorrelationId::new(format!("{}-{}", self.prefix, n))
    }

    /// Register a pending request and arm its deadline
    pub async fn register(
        &self,
        id: CorrelationId,
        request_type: impl Into<String>,
        timeout: Duration,
    ) -> oneshot::Receiver<Result<InboundMessage>> {
        let (tx, rx) = oneshot::channel();
        let deadline = Instant::now() + timeout;

        // Hold the table while arming the timer so it cannot fire before the
        // entry exists.
        let mut pending = self.pending.lock().await;
        let manager = self.clone();
        let expiring = id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            manager.expire(&expiring).await;
        });

        pending.insert(
            id,
            PendingRequest {
                request_type: request_type.into(),
                timeout,
                deadline,
                tx,
                timer: Some(timer),
            },
        );
        rx
    }

    /// Settle the request an inbound `response` message answers
    ///
    /// Returns false for other message types, responses without an id and
    /// ids that are not pending (unknown, already settled or expired).
    pub async fn resolve(&self, message: &InboundMessage) -> bool {
        if message.kind() != RESPONSE_TYPE {
            return false;
        }
        let Some(id) = message.id() else {
            return false;
        };
        self.complete(&CorrelationId::new(id), message.clone()).await
    }

    /// Resolve a pending request with its response
    pub async fn complete(&self, id: &CorrelationId, response: InboundMessage) -> bool {
        match self.take(id).await {
            Some(request) => {
                tracing::debug!(id = %id, request_type = %request.request_type, "Request resolved");
                self.settle(request, Ok(response), true);
                true
            }
            None => false,
        }
    }

    /// Reject a pending request
    pub async fn fail(&self, id: &CorrelationId, error: Error) -> bool {
        match self.take(id).await {
            Some(request) => {
                tracing::debug!(id = %id, error = %error, "Request failed");
                self.settle(request, Err(error), true);
                true
            }
            None => false,
        }
    }

    /// Reject every pending request, returning the ids that were rejected
    pub async fn fail_all(&self, error: Error) -> Vec<CorrelationId> {
        let drained: Vec<(CorrelationId, PendingRequest)> =
            self.pending.lock().await.drain().collect();

        let mut ids = Vec::with_capacity(drained.len());
        for (id, request) in drained {
            self.settle(request, Err(error.clone()), true);
            ids.push(id);
        }
        ids
    }

    /// Get the number of pending requests
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn is_pending(&self, id: &CorrelationId) -> bool {
        self.pending.lock().await.contains_key(id)
    }

    /// True for an id this manager issued whose request has already settled
    pub async fn is_settled(&self, id: &CorrelationId) -> bool {
        let issued = id
            .as_str()
            .strip_prefix(&*self.prefix)
            .is_some_and(|rest| rest.starts_with('-'));
        issued && !self.is_pending(id).await
    }

    async fn expire(&self, id: &CorrelationId) {
        let Some(request) = self.take(id).await else {
            return;
        };

        tracing::warn!(
            id = %id,
            request_type = %request.request_type,
            timeout_ms = request.timeout.as_millis() as u64,
            "Request timed out"
        );
        let error = Error::RequestTimeout {
            request_type: request.request_type.clone(),
            timeout: request.timeout,
        };
        // Running inside the timer task: it must not abort itself.
        self.settle(request, Err(error), false);
    }

    async fn take(&self, id: &CorrelationId) -> Option<PendingRequest> {
        self.pending.lock().await.remove(id)
    }

    fn settle(&self, mut request: PendingRequest, outcome: Result<InboundMessage>, abort_timer: bool) {
        if let Some(timer) = request.timer.take() {
            if abort_timer {
                timer.abort();
            }
        }
        // The caller may have stopped waiting.
        let _ = request.tx.send(outcome);
    }
}
