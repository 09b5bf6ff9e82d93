//! Transport seam between the client and the physical connection
//!
//! A [`Connector`] opens one connection attempt and hands back a
//! [`TransportHandle`]: a sink of outbound text frames and a stream of
//! [`TransportEvent`]s. The client owns exactly one handle at a time and
//! discards it wholesale on every reconnect.
//!
//! [`WebSocketConnector`] is the default and speaks WebSocket text frames via
//! `tokio-tungstenite`. Other transports (or in-memory test doubles) only need
//! to implement [`Connector`].

use async_trait::async_trait;
use futures::{future, Sink, SinkExt, Stream, StreamExt};
use std::pin::Pin;
use tether_core::{Error, Result};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Close code for a normal, clean shutdown
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code for a connection lost without a close handshake
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Outbound half of a transport
pub type FrameSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Inbound half of a transport
pub type FrameStream = Pin<Box<dyn Stream<Item = TransportEvent> + Send>>;

/// How a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
    pub was_clean: bool,
}

impl CloseInfo {
    /// A clean close with the given code
    pub fn clean(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// A close detected locally, without a handshake
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: CLOSE_ABNORMAL,
            reason: reason.into(),
            was_clean: false,
        }
    }
}

/// Something that happened on an open transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A text frame arrived
    Text(String),
    /// The peer closed the connection
    Closed(CloseInfo),
    /// The transport reported an error; the stream ends shortly after
    Error(String),
}

/// One open connection
pub struct TransportHandle {
    sink: FrameSink,
    stream: FrameStream,
}

impl TransportHandle {
    pub fn new<S, T>(sink: S, stream: T) -> Self
    where
        S: Sink<String, Error = Error> + Send + 'static,
        T: Stream<Item = TransportEvent> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }

    pub fn into_parts(self) -> (FrameSink, FrameStream) {
        (self.sink, self.stream)
    }
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle").finish_non_exhaustive()
    }
}

/// Opens connections to a backend address
#[async_trait]
pub trait Connector: Send + Sync {
    /// Attempt one connection
    ///
    /// The client bounds this call with its establishment timeout, so an
    /// implementation may simply wait for the underlying handshake.
    async fn connect(&self, address: &str) -> Result<TransportHandle>;
}

/// WebSocket connector built on `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, address: &str) -> Result<TransportHandle> {
        let (ws_stream, _) = connect_async(address)
            .await
            .map_err(|e| Error::WebSocket(e.to_string()))?;

        let (write, read) = ws_stream.split();

        let sink = write
            .sink_map_err(|e| Error::WebSocket(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, Error>(Message::Text(text))));

        let stream = read
            .filter_map(|item| {
                future::ready(match item {
                    Ok(Message::Text(text)) => Some(TransportEvent::Text(text)),
                    Ok(Message::Close(frame)) => Some(TransportEvent::Closed(close_info(frame))),
                    // Protocol-level ping/pong is answered by tungstenite itself
                    Ok(_) => None,
                    Err(e) => Some(TransportEvent::Error(e.to_string())),
                })
            })
            .scan(false, |failed, event| {
                if *failed {
                    return future::ready(None);
                }
                *failed = matches!(event, TransportEvent::Error(_));
                future::ready(Some(event))
            });

        Ok(TransportHandle::new(sink, stream))
    }
}

fn close_info(frame: Option<CloseFrame<'static>>) -> CloseInfo {
    match frame {
        Some(frame) => CloseInfo::clean(u16::from(frame.code), frame.reason.into_owned()),
        None => CloseInfo::clean(CLOSE_NORMAL, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn test_close_info_from_frame() {
        let info = close_info(Some(CloseFrame {
            code: CloseCode::Away,
            reason: "server restart".into(),
        }));
        assert_eq!(info, CloseInfo::clean(1001, "server restart"));
    }

    #[test]
    fn test_close_without_frame_is_normal() {
        assert_eq!(close_info(None).code, CLOSE_NORMAL);
        assert!(close_info(None).was_clean);
    }

    #[test]
    fn test_abnormal_close() {
        let info = CloseInfo::abnormal("keepalive timeout");
        assert_eq!(info.code, CLOSE_ABNORMAL);
        assert!(!info.was_clean);
    }

    #[tokio::test]
    async fn test_handle_from_channels() {
        let (tx, mut server_rx) = futures::channel::mpsc::unbounded::<String>();
        let (server_tx, rx) = futures::channel::mpsc::unbounded::<TransportEvent>();
        let handle = TransportHandle::new(tx.sink_map_err(|e| Error::Transport(e.to_string())), rx);
        let (mut sink, mut stream) = handle.into_parts();

        sink.send("ping".to_string()).await.unwrap();
        assert_eq!(server_rx.next().await.as_deref(), Some("ping"));

        server_tx.unbounded_send(TransportEvent::Text("pong".into())).unwrap();
        assert_eq!(stream.next().await, Some(TransportEvent::Text("pong".into())));

        drop(server_tx);
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_websocket_connect_refused() {
        let result = WebSocketConnector.connect("ws://127.0.0.1:1").await;
        assert!(matches!(result, Err(Error::WebSocket(_))));
    }
}
