//! WebSocket client sessions.
//!
//! [`connect`] opens a socket and [`run_session`] drives it until the peer
//! goes away or shutdown is requested. Reconnecting is left to the caller,
//! since some services need a fresh handshake before every connection.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{info, trace, warn};

use sluice_core::{TransportError, TransportResult};

/// A connected client socket.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Receives the frames of a session.
#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// Called for every text or binary frame, in arrival order.
    async fn on_frame(&self, data: &[u8]);
}

/// Why a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// Shutdown was requested; the socket was closed by us.
    Shutdown,
    /// The connection was lost.
    Disconnected(TransportError),
}

/// Opens a WebSocket connection to `url`.
pub async fn connect(url: &str) -> TransportResult<WsStream> {
    info!(url = %url, "Connecting to WebSocket server");

    let (stream, _response) =
        connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed {
                url: url.to_string(),
                reason: format!("WebSocket connection failed: {e}"),
            })?;
    Ok(stream)
}

/// Text waiting to be written, carried from one session to the next.
///
/// A frame whose write failed is kept and written first by the next session.
#[derive(Debug)]
pub struct Outbox {
    queued: mpsc::Receiver<String>,
    unsent: Option<String>,
}

impl Outbox {
    pub fn new(queued: mpsc::Receiver<String>) -> Self {
        Self {
            queued,
            unsent: None,
        }
    }

    /// Next frame to write, or `None` once the queue is closed and empty.
    async fn next(&mut self) -> Option<String> {
        match self.unsent.take() {
            Some(text) => Some(text),
            None => self.queued.recv().await,
        }
    }

    fn put_back(&mut self, text: String) {
        self.unsent = Some(text);
    }

    /// Frame kept from a failed write, if any.
    pub fn unsent(&self) -> Option<&str> {
        self.unsent.as_deref()
    }
}

type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Drives one connected socket.
///
/// The socket is split: a reader hands incoming frames to `handler` while a
/// writer drains `outbox`, and neither waits on the other. A slow handler
/// therefore never stops outgoing frames from being written.
pub async fn run_session(
    stream: WsStream,
    handler: &dyn FrameHandler,
    outbox: &mut Outbox,
    shutdown: &CancellationToken,
) -> SessionEnd {
    let (mut ws_tx, mut ws_rx) = stream.split();
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel();

    let end = tokio::select! {
        _ = shutdown.cancelled() => None,
        end = read_frames(&mut ws_rx, handler, &pong_tx) => Some(end),
        end = write_frames(&mut ws_tx, outbox, &mut pong_rx) => Some(end),
    };

    match end {
        Some(end) => end,
        None => {
            info!("WebSocket client shutting down");
            let _ = ws_tx.close().await;
            SessionEnd::Shutdown
        }
    }
}

async fn read_frames(
    ws_rx: &mut WsSource,
    handler: &dyn FrameHandler,
    pongs: &mpsc::UnboundedSender<Bytes>,
) -> SessionEnd {
    loop {
        match ws_rx.next().await {
            Some(Ok(Message::Text(text))) => {
                trace!(len = text.len(), "Received text");
                handler.on_frame(text.as_bytes()).await;
            }
            Some(Ok(Message::Binary(data))) => {
                trace!(len = data.len(), "Received binary");
                handler.on_frame(&data).await;
            }
            Some(Ok(Message::Ping(data))) => {
                trace!("Received ping");
                let _ = pongs.send(data);
            }
            Some(Ok(Message::Pong(_))) => {
                trace!("Received pong");
            }
            Some(Ok(Message::Close(_))) | Some(Ok(Message::Frame(_))) => {
                info!("Server closed connection");
                return SessionEnd::Disconnected(TransportError::ConnectionClosed {
                    reason: "closed by server".to_string(),
                });
            }
            Some(Err(e)) => {
                warn!(error = %e, "WebSocket error");
                return SessionEnd::Disconnected(TransportError::ConnectionClosed {
                    reason: e.to_string(),
                });
            }
            None => {
                info!("WebSocket stream ended");
                return SessionEnd::Disconnected(TransportError::ConnectionClosed {
                    reason: "stream ended".to_string(),
                });
            }
        }
    }
}

async fn write_frames(
    ws_tx: &mut WsSink,
    outbox: &mut Outbox,
    pongs: &mut mpsc::UnboundedReceiver<Bytes>,
) -> SessionEnd {
    let mut outbox_open = true;

    loop {
        tokio::select! {
            Some(data) = pongs.recv() => {
                trace!("Sending pong");
                let _ = ws_tx.send(Message::Pong(data)).await;
            }
            text = outbox.next(), if outbox_open => match text {
                Some(text) => {
                    trace!(len = text.len(), "Sending text");
                    if let Err(e) = ws_tx.send(Message::Text(text.as_str().into())).await {
                        warn!(error = %e, "Failed to send message");
                        outbox.put_back(text);
                        return SessionEnd::Disconnected(TransportError::SendFailed(e.to_string()));
                    }
                }
                None => outbox_open = false,
            },
            else => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outbox_writes_put_back_frame_first() {
        let (tx, rx) = mpsc::channel(4);
        let mut outbox = Outbox::new(rx);
        tx.send("second".to_string()).await.unwrap();

        outbox.put_back("first".to_string());
        assert_eq!(outbox.unsent(), Some("first"));
        assert_eq!(outbox.next().await.as_deref(), Some("first"));
        assert_eq!(outbox.unsent(), None);
        assert_eq!(outbox.next().await.as_deref(), Some("second"));

        drop(tx);
        assert_eq!(outbox.next().await, None);
    }
}
