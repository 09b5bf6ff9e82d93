//! Event dispatcher with failure isolation
//!
//! Subscribers register async callbacks under an [`EventName`]. Several
//! subscribers may share a name; they are started one after another in
//! registration order. Each subscriber runs inline until it first suspends;
//! from there it continues on its own task, so a callback that awaits (for
//! example on a request to the same client) never holds up later subscribers
//! or later events. A subscriber that panics, either while building its
//! future or while it is polled, is logged and skipped: later subscribers
//! still receive the event.
//!
//! Delivery works on a snapshot of the subscriber list taken when the event
//! is emitted, so a callback may subscribe or unsubscribe (itself included)
//! without deadlocking the dispatcher.
//!
//! # Examples
//!
//! ```rust
//! use tether_client::{Event, EventDispatcher, EventName};
//!
//! # async fn example() {
//! let dispatcher = EventDispatcher::new();
//!
//! let id = dispatcher
//!     .subscribe(EventName::message("spectrum"), |event: Event| async move {
//!         if let Some(message) = event.as_message() {
//!             println!("bins: {:?}", message.get("bins"));
//!         }
//!     })
//!     .await;
//!
//! dispatcher.unsubscribe(&EventName::message("spectrum"), id).await;
//! # }
//! ```

use crate::event::{Event, EventName};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::Poll;
use tokio::sync::Mutex;

/// Type for subscriber callbacks
pub type ListenerFn = Arc<dyn Fn(Event) -> BoxFuture<'static, ()> + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    listener: ListenerFn,
}

/// Fan-out registry of event subscribers
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Arc<Mutex<HashMap<EventName, Vec<Subscription>>>>,
    next_id: Arc<AtomicU64>,
}

impl EventDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for an event name
    pub async fn subscribe<F, Fut>(&self, name: EventName, listener: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: ListenerFn =
            Arc::new(move |event: Event| -> BoxFuture<'static, ()> { Box::pin(listener(event)) });

        tracing::trace!(event = %name, subscription = id.0, "Subscriber registered");
        self.listeners
            .lock()
            .await
            .entry(name)
            .or_default()
            .push(Subscription { id, listener });
        id
    }

    /// Remove one subscriber
    ///
    /// Returns false if no such subscription exists.
    pub async fn unsubscribe(&self, name: &EventName, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().await;
        let Some(entries) = listeners.get_mut(name) else {
            return false;
        };
        let Some(position) = entries.iter().position(|s| s.id == id) else {
            return false;
        };

        entries.remove(position);
        if entries.is_empty() {
            listeners.remove(name);
        }
        true
    }

    /// Remove every subscriber of one name, or of all names
    pub async fn clear(&self, name: Option<&EventName>) {
        let mut listeners = self.listeners.lock().await;
        match name {
            Some(name) => {
                listeners.remove(name);
            }
            None => listeners.clear(),
        }
    }

    /// Deliver an event to its subscribers
    ///
    /// Returns how many subscribers were started without panicking. A
    /// subscriber still pending after its first poll is counted and finishes
    /// on a spawned task, so this must run within a tokio runtime.
    pub async fn emit(&self, event: Event) -> usize {
        let name = event.name();
        let snapshot: Vec<(SubscriptionId, ListenerFn)> =
            match self.listeners.lock().await.get(&name) {
                Some(entries) => entries
                    .iter()
                    .map(|s| (s.id, Arc::clone(&s.listener)))
                    .collect(),
                None => {
                    tracing::trace!(event = %name, "No subscribers for event");
                    return 0;
                }
            };

        let mut delivered = 0;
        for (id, listener) in snapshot {
            let future = match panic::catch_unwind(AssertUnwindSafe(|| listener(event.clone()))) {
                Ok(future) => future,
                Err(payload) => {
                    log_panic(&name, id, payload.as_ref());
                    continue;
                }
            };

            let mut delivery = AssertUnwindSafe(future).catch_unwind();
            match futures::poll!(&mut delivery) {
                Poll::Ready(Ok(())) => delivered += 1,
                Poll::Ready(Err(payload)) => log_panic(&name, id, payload.as_ref()),
                Poll::Pending => {
                    delivered += 1;
                    let name = name.clone();
                    tokio::spawn(async move {
                        if let Err(payload) = delivery.await {
                            log_panic(&name, id, payload.as_ref());
                        }
                    });
                }
            }
        }
        delivered
    }

    /// Number of subscribers for one name
    pub async fn listener_count(&self, name: &EventName) -> usize {
        self.listeners
            .lock()
            .await
            .get(name)
            .map_or(0, |entries| entries.len())
    }

    /// Subscriber counts for every name that has any
    pub async fn listener_counts(&self) -> BTreeMap<String, usize> {
        self.listeners
            .lock()
            .await
            .iter()
            .map(|(name, entries)| (name.to_string(), entries.len()))
            .collect()
    }
}

fn log_panic(name: &EventName, id: SubscriptionId, payload: &(dyn Any + Send)) {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");

    tracing::error!(
        event = %name,
        subscription = id.0,
        panic = message,
        "Event subscriber panicked"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ReconnectingEvent;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn reconnecting(attempt: u32) -> Event {
        Event::Reconnecting(ReconnectingEvent {
            attempt,
            max_attempts: 10,
            delay: Duration::from_millis(1000),
        })
    }

    #[tokio::test]
    async fn test_subscribers_run_in_registration_order() {
        let dispatcher = EventDispatcher::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            dispatcher
                .subscribe(EventName::Reconnecting, move |_| {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().unwrap().push(tag);
                    }
                })
                .await;
        }

        assert_eq!(dispatcher.emit(reconnecting(1)).await, 3);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_panicking_subscriber_is_isolated() {
        let dispatcher = EventDispatcher::new();
        let reached = Arc::new(AtomicUsize::new(0));

        dispatcher
            .subscribe(EventName::Reconnecting, |_| async {
                panic!("subscriber failure");
            })
            .await;

        let counter = Arc::clone(&reached);
        dispatcher
            .subscribe(EventName::Reconnecting, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;

        assert_eq!(dispatcher.emit(reconnecting(1)).await, 1);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_while_building_future_is_isolated() {
        let dispatcher = EventDispatcher::new();
        let reached = Arc::new(AtomicUsize::new(0));

        dispatcher
            .subscribe(EventName::Reconnecting, |_| -> futures::future::Ready<()> {
                panic!("synchronous failure")
            })
            .await;

        let counter = Arc::clone(&reached);
        dispatcher
            .subscribe(EventName::Reconnecting, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;

        dispatcher.emit(reconnecting(1)).await;
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_suspended_subscriber_does_not_block_delivery() {
        let dispatcher = EventDispatcher::new();
        let gate = Arc::new(tokio::sync::Notify::new());
        let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();
        let reached = Arc::new(AtomicUsize::new(0));

        let waiting_gate = Arc::clone(&gate);
        dispatcher
            .subscribe(EventName::Reconnecting, move |event: Event| {
                let gate = Arc::clone(&waiting_gate);
                let done = done_tx.clone();
                async move {
                    gate.notified().await;
                    let _ = done.send(event);
                }
            })
            .await;

        let counter = Arc::clone(&reached);
        dispatcher
            .subscribe(EventName::Reconnecting, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;

        assert_eq!(dispatcher.emit(reconnecting(1)).await, 2);
        assert_eq!(dispatcher.emit(reconnecting(2)).await, 2);
        assert_eq!(reached.load(Ordering::SeqCst), 2);

        gate.notify_waiters();
        let first = done_rx.recv().await.unwrap();
        let second = done_rx.recv().await.unwrap();
        let mut attempts = [first, second].map(|event| match event {
            Event::Reconnecting(e) => e.attempt,
            other => panic!("unexpected {:?}", other),
        });
        attempts.sort();
        assert_eq!(attempts, [1, 2]);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let id = dispatcher
            .subscribe(EventName::Reconnecting, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;

        assert!(dispatcher.unsubscribe(&EventName::Reconnecting, id).await);
        assert!(!dispatcher.unsubscribe(&EventName::Reconnecting, id).await);

        assert_eq!(dispatcher.emit(reconnecting(1)).await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.listener_count(&EventName::Reconnecting).await, 0);
    }

    #[tokio::test]
    async fn test_subscriber_can_unsubscribe_itself() {
        let dispatcher = EventDispatcher::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = Arc::new(std::sync::Mutex::new(None::<SubscriptionId>));

        let inner = dispatcher.clone();
        let counter = Arc::clone(&calls);
        let own_id = Arc::clone(&slot);
        let id = dispatcher
            .subscribe(EventName::Reconnecting, move |_| {
                let inner = inner.clone();
                let counter = Arc::clone(&counter);
                let own_id = Arc::clone(&own_id);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let id = own_id.lock().unwrap().take();
                    if let Some(id) = id {
                        inner.unsubscribe(&EventName::Reconnecting, id).await;
                    }
                }
            })
            .await;
        *slot.lock().unwrap() = Some(id);

        dispatcher.emit(reconnecting(1)).await;
        dispatcher.emit(reconnecting(2)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let dispatcher = EventDispatcher::new();
        dispatcher.subscribe(EventName::Connected, |_| async {}).await;
        dispatcher.subscribe(EventName::Connected, |_| async {}).await;
        dispatcher.subscribe(EventName::message("spectrum"), |_| async {}).await;

        let counts = dispatcher.listener_counts().await;
        assert_eq!(counts.get("connected"), Some(&2));
        assert_eq!(counts.get("spectrum"), Some(&1));

        dispatcher.clear(Some(&EventName::Connected)).await;
        assert_eq!(dispatcher.listener_count(&EventName::Connected).await, 0);
        assert_eq!(dispatcher.listener_count(&EventName::message("spectrum")).await, 1);

        dispatcher.clear(None).await;
        assert!(dispatcher.listener_counts().await.is_empty());
    }
}
