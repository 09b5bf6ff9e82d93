//! Common test utilities for tether-client integration tests
//!
//! - [`MockConnector`]: in-memory transport whose outcome per attempt is
//!   scripted; every accepted attempt hands a [`MockPeer`] to the test
//! - [`MockWsServer`]: a real WebSocket server on `tokio-tungstenite` that
//!   answers `ping` and correlated requests
//! - event recording helpers
//!
//! Set `RUST_LOG=tether_client=debug` to see client logs in test output.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc as chan;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_client::{
    ChannelClient, CloseInfo, Connector, Error, Event, EventName, Result, TransportEvent,
    TransportHandle,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

/// Route client logs to the test harness writer
///
/// Only the first call in a test binary installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Longest a helper waits before failing the test
pub const WAIT: Duration = Duration::from_secs(120);

/// What the mock transport does with one connection attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Open and hand a peer to the test
    Accept,
    /// Fail immediately
    Refuse,
    /// Never complete
    Hang,
    /// Open, but every write fails
    Broken,
}

struct ConnectorState {
    script: VecDeque<Outcome>,
    fallback: Outcome,
    attempts: usize,
    addresses: Vec<String>,
    // Keeps the inbound side of broken transports open
    held: Vec<chan::UnboundedSender<TransportEvent>>,
}

/// Scripted in-memory connector
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    /// A connector applying `fallback` once the script is used up
    pub fn new(fallback: Outcome) -> (Self, mpsc::UnboundedReceiver<MockPeer>) {
        init_tracing();
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            state: Arc::new(Mutex::new(ConnectorState {
                script: VecDeque::new(),
                fallback,
                attempts: 0,
                addresses: Vec::new(),
                held: Vec::new(),
            })),
            peers,
        };
        (connector, rx)
    }

    /// Outcomes for the next attempts, in order
    pub fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.state.lock().unwrap().script.extend(outcomes);
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap().attempts
    }

    pub fn addresses(&self) -> Vec<String> {
        self.state.lock().unwrap().addresses.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, address: &str) -> Result<TransportHandle> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.attempts += 1;
            state.addresses.push(address.to_string());
            let fallback = state.fallback;
            state.script.pop_front().unwrap_or(fallback)
        };

        match outcome {
            Outcome::Accept => {
                let (to_peer, incoming) = chan::unbounded::<String>();
                let (outgoing, from_peer) = chan::unbounded::<TransportEvent>();
                let _ = self.peers.send(MockPeer { incoming, outgoing });

                let sink = to_peer.sink_map_err(|e| Error::Transport(e.to_string()));
                Ok(TransportHandle::new(sink, from_peer))
            }
            Outcome::Broken => {
                let (to_peer, incoming) = chan::unbounded::<String>();
                drop(incoming);
                let (outgoing, from_peer) = chan::unbounded::<TransportEvent>();
                self.state.lock().unwrap().held.push(outgoing);

                let sink = to_peer.sink_map_err(|e| Error::Transport(e.to_string()));
                Ok(TransportHandle::new(sink, from_peer))
            }
            Outcome::Refuse => Err(Error::WebSocket("Connection refused".into())),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

/// Backend side of one accepted mock connection
///
/// Dropping the peer ends the client's inbound stream.
pub struct MockPeer {
    incoming: chan::UnboundedReceiver<String>,
    outgoing: chan::UnboundedSender<TransportEvent>,
}

impl MockPeer {
    /// Next frame written by the client
    pub async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(WAIT, self.incoming.next())
            .await
            .ok()
            .flatten()
    }

    /// Next structured message, skipping control frames
    pub async fn recv_json(&mut self) -> Option<Value> {
        loop {
            let text = self.recv().await?;
            if text == "ping" || text == "pong" {
                continue;
            }
            return serde_json::from_str(&text).ok();
        }
    }

    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.outgoing.unbounded_send(TransportEvent::Text(text.into()));
    }

    pub fn send_json(&self, value: Value) {
        self.send_text(value.to_string());
    }

    /// Close the connection with a handshake
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self
            .outgoing
            .unbounded_send(TransportEvent::Closed(CloseInfo::clean(code, reason)));
    }
}

/// Answer every `ping` on a peer until the client closes it
pub fn spawn_pong_responder(mut peer: MockPeer) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(text) = peer.incoming.next().await {
            if text == "ping" {
                peer.send_text("pong");
            }
        }
    })
}

/// Forward every lifecycle event of `client` into a channel
pub async fn record_events(client: &ChannelClient) -> mpsc::UnboundedReceiver<Event> {
    init_tracing();
    let (tx, rx) = mpsc::unbounded_channel();
    for name in EventName::lifecycle() {
        let tx = tx.clone();
        client
            .subscribe(name, move |event| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(event);
                }
            })
            .await;
    }
    rx
}

pub async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Skip events until one named `name` arrives
pub async fn wait_for(events: &mut mpsc::UnboundedReceiver<Event>, name: EventName) -> Event {
    loop {
        let event = next_event(events).await;
        if event.name() == name {
            return event;
        }
    }
}

/// Poll `check` until it holds
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(WAIT, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached");
}

/// Mock WebSocket backend for client testing
///
/// Answers `ping` with `pong` and any message carrying an `id` with a
/// `response` echoing its type. Every text frame received is forwarded to
/// the test.
pub struct MockWsServer {
    addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    message_rx: mpsc::Receiver<String>,
}

impl MockWsServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (msg_tx, message_rx) = mpsc::channel::<String>(100);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accepted = listener.accept() => {
                        let Ok((stream, _)) = accepted else { continue };
                        let msg_tx = msg_tx.clone();
                        tokio::spawn(async move {
                            let Ok(ws_stream) = accept_async(stream).await else { return };
                            let (mut write, mut read) = ws_stream.split();

                            while let Some(Ok(message)) = read.next().await {
                                let Message::Text(text) = message else { continue };
                                let _ = msg_tx.send(text.clone()).await;

                                if let Some(reply) = reply_to(&text) {
                                    if write.send(Message::Text(reply)).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        });
                    }
                }
            }
        });

        Self {
            addr,
            shutdown_tx,
            message_rx,
        }
    }

    /// The WebSocket URL for connecting to this server
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Wait for a frame to be received by the server
    pub async fn wait_for_message(&mut self) -> Option<String> {
        tokio::time::timeout(Duration::from_secs(5), self.message_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop accepting connections
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

fn reply_to(text: &str) -> Option<String> {
    if text == "ping" {
        return Some("pong".to_string());
    }
    let request: Value = serde_json::from_str(text).ok()?;
    let id = request.get("id")?.clone();
    Some(
        json!({
            "type": "response",
            "id": id,
            "echo": request.get("type").cloned().unwrap_or(Value::Null),
        })
        .to_string(),
    )
}
