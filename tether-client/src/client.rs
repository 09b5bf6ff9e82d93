//! Channel client: the connection lifecycle manager
//!
//! [`ChannelClient`] owns the single transport of a session and drives the
//! state machine described in [`crate::connection_state`]. It consults the
//! reconnection strategy after every lost connection, starts the keepalive
//! monitor while open, queues structured messages while disconnected and
//! routes inbound frames to the event dispatcher.
//!
//! # Client Lifecycle
//!
//! 1. **Connect**: `connect()` starts an attempt bounded by the connect timeout
//! 2. **Use**: `send`, `send_request`, `subscribe`
//! 3. **Recover**: lost connections are retried with backoff until the
//!    strategy gives up
//! 4. **Close**: `close()` stops everything and rejects pending requests
//!
//! # Cloning
//!
//! `ChannelClient` is cheaply cloneable using `Arc` internally. All clones
//! share the same session. Dropping the last clone stops every background
//! task.
//!
//! # Events
//!
//! Lifecycle transitions and inbound messages are pushed onto one ordered
//! bus and delivered by a single dispatch task, so subscribers are invoked
//! in transition order. A subscriber may call back into the client, requests
//! included: responses are matched on the read path before they reach the
//! bus.

use crate::client_builder::ClientBuilder;
use crate::config::ClientConfig;
use crate::connection_state::{ClientSession, ClientStats, ConnectionState, ReconnectPlan};
use crate::dispatcher::{EventDispatcher, SubscriptionId};
use crate::event::{
    ConnectedEvent, DisconnectedEvent, ErrorEvent, ErrorPhase, Event, EventName, ExhaustedEvent,
    ReconnectingEvent,
};
use crate::keepalive::KeepaliveMonitor;
use crate::metrics::ClientMetrics;
use crate::reconnect::ReconnectionStrategy;
use crate::request::RequestManager;
use crate::transport::{
    CloseInfo, Connector, FrameSink, FrameStream, TransportEvent, TransportHandle,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tether_core::{
    codec, timestamp_ms, Control, Error, Frame, InboundMessage, OutboundMessage, Result,
};
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

/// How long a close handshake may take before the transport is dropped
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Result of handing a structured message to the client
#[derive(Debug)]
pub(crate) enum SendOutcome {
    Sent,
    Queued,
    Failed(Error),
}

/// Diagnostic snapshot returned by [`ChannelClient::debug_info`]
#[derive(Debug, Clone, Serialize)]
pub struct ClientDebugInfo {
    pub stats: ClientStats,
    pub manually_disconnected: bool,
    /// Type tags of the queued messages, oldest first
    pub queued: Vec<String>,
    /// Subscriber count per event name
    pub listeners: BTreeMap<String, usize>,
    pub pending_requests: usize,
}

/// Resilient client for a message-oriented backend channel
#[derive(Clone)]
pub struct ChannelClient {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    config: ClientConfig,
    session: Mutex<ClientSession>,
    dispatcher: EventDispatcher,
    requests: RequestManager,
    connector: Arc<dyn Connector>,
    strategy: Box<dyn ReconnectionStrategy>,
    keepalive: KeepaliveMonitor,
    events: mpsc::UnboundedSender<Event>,
    metrics: Option<Arc<ClientMetrics>>,
}

impl ChannelClient {
    /// Start configuring a client for `address`
    pub fn builder(address: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(address)
    }

    /// Assemble a client; must be called within a tokio runtime
    pub(crate) fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        strategy: Box<dyn ReconnectionStrategy>,
        metrics: Option<Arc<ClientMetrics>>,
    ) -> Self {
        let dispatcher = EventDispatcher::new();
        let requests = RequestManager::new();
        let (events, mut bus) = mpsc::unbounded_channel::<Event>();

        let delivery = dispatcher.clone();
        tokio::spawn(async move {
            while let Some(event) = bus.recv().await {
                delivery.emit(event).await;
            }
        });

        if let Some(ref m) = metrics {
            m.update_connection_state(ConnectionState::Closed);
        }

        let inner = Inner {
            keepalive: config.keepalive(),
            session: Mutex::new(ClientSession::new(config.address.clone())),
            config,
            dispatcher,
            requests,
            connector,
            strategy,
            events,
            metrics,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Open the connection
    ///
    /// Returns immediately; the outcome is reported through the `connected`
    /// or `error`/`disconnected` events. Does nothing while connecting, open
    /// or closing, or after a manual `close()`.
    pub async fn connect(&self) {
        self.inner.connect().await
    }

    /// Close the connection and stop reconnecting
    ///
    /// Cancels every timer and rejects every pending request. Idempotent.
    pub async fn close(&self) {
        self.inner.close().await
    }

    /// Close, then connect again with a fresh attempt counter
    pub async fn reconnect(&self) {
        self.inner.reconnect().await
    }

    /// Send a structured message
    ///
    /// Returns true when the message was written to an open transport. While
    /// not open the message is queued and false is returned; it is flushed,
    /// in order, as soon as the connection opens.
    pub async fn send(&self, message: OutboundMessage) -> bool {
        matches!(self.inner.dispatch(message).await, SendOutcome::Sent)
    }

    /// Send a request and wait for the `response` carrying its id
    #[tracing::instrument(skip(self, payload), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn send_request(
        &self,
        kind: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<InboundMessage> {
        let started = Instant::now();
        let requests = &self.inner.requests;
        let id = requests.next_id();
        let message = OutboundMessage::new(kind)
            .with_id(id.clone())
            .with_payload(payload);

        // Registered before sending so an immediate answer cannot be missed
        let rx = requests.register(id.clone(), kind, timeout).await;

        let queued = match self.inner.dispatch(message).await {
            SendOutcome::Sent => {
                tracing::debug!(id = %id, "Request sent");
                false
            }
            SendOutcome::Queued => {
                tracing::debug!(id = %id, "Request queued");
                true
            }
            SendOutcome::Failed(error) => {
                requests.fail(&id, error).await;
                false
            }
        };

        let result = rx
            .await
            .unwrap_or_else(|_| Err(Error::Cancelled("request dropped".into())));

        if queued && result.is_err() && self.inner.session.lock().await.queue.remove(&id) {
            tracing::debug!(id = %id, "Unsent request withdrawn from queue");
        }

        if let Some(ref m) = self.inner.metrics {
            let status = match &result {
                Ok(_) => "ok",
                Err(e) if e.is_timeout() => "timeout",
                Err(Error::Cancelled(_)) => "cancelled",
                Err(_) => "error",
            };
            m.record_request(kind, status, started.elapsed().as_secs_f64());
        }

        result
    }

    /// Send a request with the configured default timeout
    pub async fn request(&self, kind: &str, payload: Value) -> Result<InboundMessage> {
        self.send_request(kind, payload, self.inner.config.request_timeout)
            .await
    }

    /// Register a subscriber for an event
    pub async fn subscribe<F, Fut>(&self, name: EventName, listener: F) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.dispatcher.subscribe(name, listener).await
    }

    /// Register a subscriber for inbound messages of one type
    pub async fn on_message<F, Fut>(&self, kind: impl Into<String>, listener: F) -> SubscriptionId
    where
        F: Fn(InboundMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener = Arc::new(listener);
        self.inner
            .dispatcher
            .subscribe(EventName::message(kind), move |event: Event| {
                let listener = Arc::clone(&listener);
                async move {
                    if let Event::Message(message) = event {
                        listener(message).await;
                    }
                }
            })
            .await
    }

    /// Remove one subscriber; false if it was not registered
    pub async fn unsubscribe(&self, name: &EventName, id: SubscriptionId) -> bool {
        self.inner.dispatcher.unsubscribe(name, id).await
    }

    /// Remove every subscriber of one event, or of all events
    pub async fn clear_subscriptions(&self, name: Option<&EventName>) {
        self.inner.dispatcher.clear(name).await
    }

    pub async fn stats(&self) -> ClientStats {
        self.inner
            .session
            .lock()
            .await
            .stats(self.inner.strategy.max_attempts())
    }

    /// Zero the cumulative counters
    pub async fn reset_stats(&self) {
        self.inner.session.lock().await.reset_counters();
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.session.lock().await.state
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Open
    }

    /// Open and not in the middle of a reconnection
    pub async fn is_healthy(&self) -> bool {
        let session = self.inner.session.lock().await;
        session.state == ConnectionState::Open && !session.reconnecting
    }

    pub async fn address(&self) -> String {
        self.inner.session.lock().await.address.clone()
    }

    /// Change the backend address
    ///
    /// Reconnects to the new address when a connection is open, being
    /// established or being retried; otherwise the address is used by the
    /// next `connect()`.
    pub async fn set_address(&self, address: impl Into<String>) {
        let address = address.into();
        let should_reconnect = {
            let mut session = self.inner.session.lock().await;
            if session.address == address {
                return;
            }
            tracing::info!(from = %session.address, to = %address, "Address changed");
            session.address = address;
            session.state.is_active() || session.reconnecting
        };

        if should_reconnect {
            self.inner.reconnect().await;
        }
    }

    /// Number of requests still waiting for a response
    pub async fn pending_requests(&self) -> usize {
        self.inner.requests.pending_count().await
    }

    pub async fn debug_info(&self) -> ClientDebugInfo {
        let (stats, manually_disconnected, queued) = {
            let session = self.inner.session.lock().await;
            (
                session.stats(self.inner.strategy.max_attempts()),
                session.manually_disconnected,
                session.queue.kinds().map(String::from).collect(),
            )
        };

        ClientDebugInfo {
            stats,
            manually_disconnected,
            queued,
            listeners: self.inner.dispatcher.listener_counts().await,
            pending_requests: self.inner.requests.pending_count().await,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The dispatcher events are delivered through
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.inner.dispatcher
    }
}

impl Inner {
    fn emit(&self, event: Event) {
        tracing::trace!(event = %event.name(), "Event queued");
        // The bus only closes when the client is being dropped.
        let _ = self.events.send(event);
    }

    fn report_error(&self, error: Error, phase: ErrorPhase, raw_data: Option<String>) {
        tracing::error!(phase = %phase, error = %error, "Channel error");
        if let Some(ref m) = self.metrics {
            m.record_error(phase.as_str());
        }
        self.emit(Event::Error(ErrorEvent {
            timestamp: timestamp_ms(),
            error,
            phase,
            raw_data,
        }));
    }

    fn record_state(&self, state: ConnectionState) {
        if let Some(ref m) = self.metrics {
            m.update_connection_state(state);
        }
    }

    async fn connect(self: &Arc<Self>) {
        let mut session = self.session.lock().await;
        if session.manually_disconnected {
            tracing::debug!("Connect ignored after manual close");
            return;
        }
        if session.state != ConnectionState::Closed {
            tracing::debug!(state = %session.state, "Connect ignored");
            return;
        }

        if session.reconnecting {
            tracing::debug!("Manual connect supersedes pending reconnection");
            session.cancel_reconnect();
        }
        if session.exhausted {
            session.reconnect_attempts = 0;
            session.exhausted = false;
        }
        self.start_attempt(&mut session);
    }

    /// Enter Connecting and spawn the attempt and its timeout
    fn start_attempt(self: &Arc<Self>, session: &mut ClientSession) {
        let epoch = session.begin_attempt();
        self.record_state(ConnectionState::Connecting);

        let address = session.address.clone();
        tracing::info!(
            address = %address,
            attempt = session.reconnect_attempts,
            "Connecting"
        );

        let client = Arc::downgrade(self);
        let connector = Arc::clone(&self.connector);
        session.tasks.attempt = Some(tokio::spawn(async move {
            let result = connector.connect(&address).await;
            if let Some(inner) = client.upgrade() {
                inner.on_attempt_finished(epoch, result).await;
            }
        }));

        let client = Arc::downgrade(self);
        let timeout = self.config.connect_timeout;
        session.tasks.connect_timeout = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = client.upgrade() {
                inner.on_connect_timeout(epoch).await;
            }
        }));
    }

    async fn on_attempt_finished(self: &Arc<Self>, epoch: u64, result: Result<TransportHandle>) {
        let mut session = self.session.lock().await;
        if !session.is_current(epoch) || session.state != ConnectionState::Connecting {
            return;
        }
        session.tasks.attempt.take();

        match result {
            Ok(handle) => self.on_open(&mut session, epoch, handle).await,
            Err(error) => {
                tracing::warn!(address = %session.address, error = %error, "Connection attempt failed");
                let reason = error.to_string();
                self.report_error(error, ErrorPhase::Connection, None);
                self.on_closed(&mut session, CloseInfo::abnormal(reason));
            }
        }
    }

    async fn on_connect_timeout(self: &Arc<Self>, epoch: u64) {
        let mut session = self.session.lock().await;
        if !session.is_current(epoch) || session.state != ConnectionState::Connecting {
            return;
        }
        session.tasks.connect_timeout.take();

        let error = Error::ConnectTimeout(self.config.connect_timeout);
        tracing::warn!(address = %session.address, error = %error, "Connection attempt abandoned");
        self.on_closed(&mut session, CloseInfo::abnormal(error.to_string()));
    }

    async fn on_open(
        self: &Arc<Self>,
        session: &mut ClientSession,
        epoch: u64,
        handle: TransportHandle,
    ) {
        let (sink, stream) = handle.into_parts();
        let reconnected = session.reconnect_attempts > 0;
        session.mark_open(sink);
        self.record_state(ConnectionState::Open);
        if reconnected {
            if let Some(ref m) = self.metrics {
                m.record_reconnection_success();
            }
        }
        tracing::info!(address = %session.address, "Connected");

        let queued = session.queue.drain();
        if !queued.is_empty() {
            tracing::info!(count = queued.len(), "Flushing queued messages");
        }
        for message in queued {
            if let Some(ref id) = message.id {
                if self.requests.is_settled(id).await {
                    tracing::debug!(id = %id, kind = %message.kind, "Skipping settled request");
                    continue;
                }
            }
            if let Err(error) = self.write_message(session, &message).await {
                tracing::warn!(kind = %message.kind, error = %error, "Dropped queued message");
                if let Some(ref m) = self.metrics {
                    m.record_dropped();
                }
                if let Some(ref id) = message.id {
                    self.requests.fail(id, error).await;
                }
            }
        }

        session.tasks.keepalive = Some(self.keepalive.spawn(Arc::downgrade(self), epoch));
        session.tasks.reader = Some(tokio::spawn(read_loop(Arc::downgrade(self), epoch, stream)));

        self.emit(Event::Connected(ConnectedEvent {
            timestamp: timestamp_ms(),
            reconnect_count: session.counters.reconnect_count,
            address: session.address.clone(),
        }));
    }

    /// Record a lost connection and decide whether to retry
    ///
    /// The calling task must have taken its own handle out of the session.
    fn on_closed(self: &Arc<Self>, session: &mut ClientSession, info: CloseInfo) {
        if let Some(sink) = session.mark_closed() {
            tokio::spawn(close_sink(sink));
        }
        self.record_state(ConnectionState::Closed);

        tracing::warn!(
            code = info.code,
            reason = %info.reason,
            was_clean = info.was_clean,
            "Disconnected"
        );
        self.emit(Event::Disconnected(DisconnectedEvent {
            timestamp: timestamp_ms(),
            code: info.code,
            reason: info.reason,
            was_clean: info.was_clean,
        }));

        if !session.manually_disconnected {
            self.schedule_reconnect(session);
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, session: &mut ClientSession) {
        match session.plan_reconnect(self.strategy.as_ref()) {
            ReconnectPlan::Skip => {}
            ReconnectPlan::GiveUp {
                attempts,
                max_attempts,
            } => {
                let error = Error::Exhausted {
                    attempts,
                    max_attempts,
                };
                tracing::error!(attempts, max_attempts, error = %error, "Giving up on reconnection");
                if let Some(ref m) = self.metrics {
                    m.record_exhausted();
                }
                self.emit(Event::MaxReconnectAttemptsReached(ExhaustedEvent {
                    attempts,
                    max_attempts,
                }));
            }
            ReconnectPlan::Retry {
                attempt,
                max_attempts,
                delay,
            } => {
                tracing::info!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnection"
                );
                if let Some(ref m) = self.metrics {
                    m.record_reconnection_attempt();
                }
                self.emit(Event::Reconnecting(ReconnectingEvent {
                    attempt,
                    max_attempts,
                    delay,
                }));

                let epoch = session.epoch;
                let client = Arc::downgrade(self);
                session.tasks.reconnect = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(inner) = client.upgrade() {
                        inner.on_reconnect_timer(epoch).await;
                    }
                }));
            }
        }
    }

    async fn on_reconnect_timer(self: &Arc<Self>, epoch: u64) {
        let mut session = self.session.lock().await;
        if session.epoch != epoch
            || !session.reconnecting
            || session.manually_disconnected
            || session.state != ConnectionState::Closed
        {
            return;
        }
        session.tasks.reconnect.take();
        self.start_attempt(&mut session);
    }

    async fn on_text(&self, epoch: u64, text: String) -> bool {
        let mut session = self.session.lock().await;
        if !session.is_current(epoch) {
            return false;
        }
        session.counters.messages_received += 1;

        match codec::decode(&text) {
            Ok(Frame::Control(Control::Ping)) => {
                tracing::trace!("Ping received");
                let pong = codec::encode_control(Control::Pong);
                if let Err(error) = self.write_frame(&mut session, pong).await {
                    tracing::warn!(error = %error, "Failed to answer ping");
                }
            }
            Ok(Frame::Control(Control::Pong)) => {
                tracing::trace!("Pong received");
                session.keepalive.record_alive(Instant::now());
            }
            Ok(Frame::Message(message)) => {
                tracing::debug!(kind = %message.kind(), id = ?message.id(), "Message received");
                if let Some(ref m) = self.metrics {
                    m.record_message_received(message.kind());
                }
                // Correlation must not wait behind subscriber delivery.
                self.requests.resolve(&message).await;
                self.emit(Event::Message(message));
            }
            Err(error) => {
                self.report_error(error, ErrorPhase::MessageParsing, Some(text));
            }
        }
        true
    }

    async fn on_transport_error(&self, epoch: u64, message: String) {
        let session = self.session.lock().await;
        if !session.is_current(epoch) {
            return;
        }
        drop(session);
        self.report_error(Error::Transport(message), ErrorPhase::Transport, None);
    }

    async fn on_transport_closed(self: &Arc<Self>, epoch: u64, info: CloseInfo) {
        let mut session = self.session.lock().await;
        if !session.is_current(epoch) {
            return;
        }
        session.tasks.reader.take();
        self.on_closed(&mut session, info);
    }

    /// Send a keepalive probe; false once the connection is gone
    pub(crate) async fn send_probe(&self, epoch: u64) -> bool {
        let mut session = self.session.lock().await;
        if !session.is_current(epoch) || session.state != ConnectionState::Open {
            return false;
        }
        session.keepalive.record_probe();
        tracing::trace!(probes = session.keepalive.probes_sent(), "Ping sent");
        if let Err(error) = self
            .write_frame(&mut session, codec::encode_control(Control::Ping))
            .await
        {
            tracing::warn!(error = %error, "Failed to send ping");
        }
        true
    }

    /// Force the connection closed if it has been silent too long
    ///
    /// Returns false when the monitor should stop.
    pub(crate) async fn check_liveness(self: &Arc<Self>, epoch: u64) -> bool {
        let mut session = self.session.lock().await;
        if !session.is_current(epoch) || session.state != ConnectionState::Open {
            return false;
        }
        let now = Instant::now();
        if !self.keepalive.is_dead(&session.keepalive, now) {
            return true;
        }

        session.tasks.keepalive.take();
        tracing::warn!(
            silence_ms = session.keepalive.silence(now).as_millis() as u64,
            "No pong received, connection is dead"
        );
        if let Some(ref m) = self.metrics {
            m.record_keepalive_timeout();
        }
        self.on_closed(&mut session, CloseInfo::abnormal("keepalive timeout"));
        false
    }

    async fn dispatch(&self, message: OutboundMessage) -> SendOutcome {
        let mut session = self.session.lock().await;
        if session.state == ConnectionState::Open {
            return match self.write_message(&mut session, &message).await {
                Ok(()) => SendOutcome::Sent,
                Err(error) => SendOutcome::Failed(error),
            };
        }

        tracing::warn!(kind = %message.kind, state = %session.state, "Not connected, message queued");
        session.queue.enqueue(message);
        if let Some(ref m) = self.metrics {
            m.record_queued();
        }
        SendOutcome::Queued
    }

    /// Encode and write one structured message, reporting failures
    async fn write_message(
        &self,
        session: &mut ClientSession,
        message: &OutboundMessage,
    ) -> Result<()> {
        let written = match codec::encode_message(message) {
            Ok(text) => self.write_frame(session, text).await,
            Err(error) => Err(error),
        };

        written.map_err(|error| {
            let reason = error.to_string();
            self.report_error(error, ErrorPhase::MessageSending, None);
            Error::SendFailed(reason)
        })
    }

    async fn write_frame(&self, session: &mut ClientSession, text: String) -> Result<()> {
        let Some(sink) = session.sink.as_mut() else {
            return Err(Error::ConnectionClosed);
        };
        sink.send(text).await?;

        session.counters.messages_sent += 1;
        if let Some(ref m) = self.metrics {
            m.record_message_sent();
        }
        Ok(())
    }

    async fn close(&self) {
        let mut session = self.session.lock().await;
        let (sink, was_active) = session.begin_close();
        self.record_state(ConnectionState::Closing);

        if let Some(sink) = sink {
            close_sink(sink).await;
        }
        session.finish_close(was_active);
        self.record_state(ConnectionState::Closed);
        if was_active {
            tracing::info!(address = %session.address, "Connection closed");
        }

        let cancelled = self
            .requests
            .fail_all(Error::Cancelled("client closed".into()))
            .await;
        if !cancelled.is_empty() {
            for id in &cancelled {
                session.queue.remove(id);
            }
            tracing::debug!(cancelled = cancelled.len(), "Pending requests rejected");
        }
    }

    async fn reconnect(self: &Arc<Self>) {
        self.close().await;

        let mut session = self.session.lock().await;
        session.manually_disconnected = false;
        session.reconnect_attempts = 0;
        session.exhausted = false;
        if session.state == ConnectionState::Closed {
            self.start_attempt(&mut session);
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.session.get_mut().tasks.abort_all();
    }
}

async fn read_loop(client: Weak<Inner>, epoch: u64, mut stream: FrameStream) {
    while let Some(event) = stream.next().await {
        let Some(inner) = client.upgrade() else {
            return;
        };
        match event {
            TransportEvent::Text(text) => {
                if !inner.on_text(epoch, text).await {
                    return;
                }
            }
            TransportEvent::Error(message) => inner.on_transport_error(epoch, message).await,
            TransportEvent::Closed(info) => {
                inner.on_transport_closed(epoch, info).await;
                return;
            }
        }
    }

    if let Some(inner) = client.upgrade() {
        inner
            .on_transport_closed(epoch, CloseInfo::abnormal("transport stream ended"))
            .await;
    }
}

async fn close_sink(mut sink: FrameSink) {
    match tokio::time::timeout(CLOSE_GRACE, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::debug!(error = %error, "Close handshake failed"),
        Err(_) => tracing::debug!("Close handshake timed out"),
    }
}
