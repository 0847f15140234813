//! The chat service adapter.
//!
//! Construction performs the handshake and opens the socket, so a rejected
//! token or an unreachable service fails startup. Once attached, two tasks
//! run until shutdown:
//!
//! - the **session** task owns the socket. Its reader decodes and classifies
//!   frames while its writer sends encoded replies, independently of each
//!   other. It reconnects (with a fresh handshake) when the socket is lost;
//! - the **encoder** task drains the outbound conduit into message frames.
//!
//! Frames the encoder produces while the socket is down, including one whose
//! write failed, stay queued and are written by the next session.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, trace, warn};

use sluice_core::{
    Adapter, AdapterError, AdapterResult, Conduits, DEFAULT_CONDUIT_CAPACITY, Message,
    PluginDescriptor, PumpEnds, TransportError, conduits, policy,
};
use sluice_transport::Backoff;
use sluice_transport::http_client::{endpoint_url, get_json};
use sluice_transport::ws_client::{self, FrameHandler, Outbox, SessionEnd, WsStream};

use crate::config::ChatConfig;
use crate::frame::{Frame, HandshakeResponse, OutboundFrame, classify};

/// Result of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Socket URL to connect to.
    pub url: String,
    /// The bot's own identity.
    pub self_id: String,
}

/// Exchanges the token for a socket URL and the bot identity.
pub async fn handshake(config: &ChatConfig) -> AdapterResult<Session> {
    let url = endpoint_url(&config.api_url, "rtm.start", &[("token", config.key.as_str())])?;

    let response: HandshakeResponse = get_json(url).await.map_err(|e| match e {
        TransportError::UnexpectedStatus { status, .. } => AdapterError::Handshake(format!(
            "received {status} while connecting to the chat service (expected 200)"
        )),
        other => AdapterError::Transport(other),
    })?;

    if !response.ok {
        return Err(AdapterError::Handshake(
            response
                .error
                .unwrap_or_else(|| "service rejected the handshake".to_string()),
        ));
    }

    let url = response
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AdapterError::Handshake("response carries no socket URL".to_string()))?;
    // Mention-only plugins match on this id, so an empty one would match
    // every message.
    let self_id = response
        .identity
        .map(|i| i.id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AdapterError::Handshake("response carries no bot identity".to_string()))?;

    Ok(Session { url, self_id })
}

/// Adapter for a real-time chat service.
pub struct ChatAdapter {
    name: String,
    config: ChatConfig,
    self_id: String,
    /// Socket opened at construction, taken by `run_and_attach`.
    stream: Mutex<Option<WsStream>>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    span: Span,
}

impl ChatAdapter {
    /// Performs the handshake and connects the socket.
    pub async fn connect(name: impl Into<String>, config: ChatConfig) -> AdapterResult<Self> {
        let name = name.into();
        let span = info_span!("adapter", name = %name);

        let (session, stream) = async {
            let session = handshake(&config).await?;
            let stream = ws_client::connect(&session.url).await?;
            info!(self_id = %session.self_id, "Connected to chat service");
            Ok::<_, AdapterError>((session, stream))
        }
        .instrument(span.clone())
        .await?;

        Ok(Self {
            name,
            config,
            self_id: session.self_id,
            stream: Mutex::new(Some(stream)),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            span,
        })
    }

    /// The bot's own identity as reported by the handshake.
    pub fn self_id(&self) -> &str {
        &self.self_id
    }
}

#[async_trait]
impl Adapter for ChatAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_and_attach(&self) -> AdapterResult<Conduits> {
        let stream = self
            .stream
            .lock()
            .take()
            .ok_or_else(|| AdapterError::AlreadyAttached(self.name.clone()))?;

        let (dispatcher, pumps) = conduits(DEFAULT_CONDUIT_CAPACITY);
        let PumpEnds {
            inbound,
            outbound,
            errors,
        } = pumps;
        let (frames_tx, frames_rx) = mpsc::channel(DEFAULT_CONDUIT_CAPACITY);

        let encoder = tokio::spawn(
            encode_outbound(outbound, frames_tx, errors.clone(), self.shutdown.clone())
                .instrument(self.span.clone()),
        );

        let handler = InboundFrames {
            self_id: self.self_id.clone(),
            inbound,
            errors: errors.clone(),
        };
        let session = tokio::spawn(
            supervise(
                stream,
                handler,
                frames_rx,
                errors,
                self.config.clone(),
                self.shutdown.clone(),
            )
            .instrument(self.span.clone()),
        );

        self.tasks.lock().extend([encoder, session]);
        Ok(dispatcher)
    }

    fn should_apply(&self, plugin: &PluginDescriptor, message: &Message) -> bool {
        policy::applies(plugin, message, &self.self_id)
    }

    async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
        debug!(parent: &self.span, "Chat adapter shut down");
    }
}

/// Turns inbound frames into messages.
struct InboundFrames {
    self_id: String,
    inbound: mpsc::Sender<Message>,
    errors: mpsc::UnboundedSender<AdapterError>,
}

#[async_trait]
impl FrameHandler for InboundFrames {
    async fn on_frame(&self, data: &[u8]) {
        let frame = match Frame::decode(data) {
            Ok(frame) => frame,
            Err(e) => {
                let _ = self.errors.send(AdapterError::decode(e.to_string()));
                return;
            }
        };

        if !frame.is_message() {
            trace!(kind = %frame.kind, "Ignoring frame");
            return;
        }
        if frame.user == self.self_id {
            trace!("Ignoring own message");
            return;
        }

        let scope = classify(&frame.channel);
        let message = Message::new(frame.user, frame.channel, frame.text, scope);
        if self.inbound.send(message).await.is_err() {
            debug!("Inbound conduit closed, dropping message");
        }
    }
}

/// Drains the outbound conduit into encoded frames.
async fn encode_outbound(
    mut outbound: mpsc::Receiver<Message>,
    frames: mpsc::Sender<String>,
    errors: mpsc::UnboundedSender<AdapterError>,
    shutdown: CancellationToken,
) {
    let mut next_id: u64 = 1;

    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = outbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let frame = OutboundFrame::message(next_id, message.receiver(), message.body());
        next_id += 1;
        match frame.encode() {
            Ok(text) => {
                if frames.send(text).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = errors.send(AdapterError::Transport(TransportError::SendFailed(
                    e.to_string(),
                )));
            }
        }
    }
    debug!("Encoder stopped");
}

/// Runs sessions until shutdown, reconnecting whenever the socket is lost.
async fn supervise(
    mut stream: WsStream,
    handler: InboundFrames,
    frames: mpsc::Receiver<String>,
    errors: mpsc::UnboundedSender<AdapterError>,
    config: ChatConfig,
    shutdown: CancellationToken,
) {
    let mut backoff = Backoff::new(config.reconnect);
    let mut outbox = Outbox::new(frames);

    loop {
        match ws_client::run_session(stream, &handler, &mut outbox, &shutdown).await {
            SessionEnd::Shutdown => break,
            SessionEnd::Disconnected(e) => {
                warn!(error = %e, "Lost connection to chat service");
                let _ = errors.send(AdapterError::Transport(e));
            }
        }

        stream = match reconnect(&config, &mut backoff, &errors, &shutdown).await {
            Some(stream) => stream,
            None => break,
        };
        backoff.reset();
    }
    debug!("Session task stopped");
}

/// Re-runs the handshake and reconnects with backoff.
///
/// Returns `None` on shutdown or once the retry budget is spent.
async fn reconnect(
    config: &ChatConfig,
    backoff: &mut Backoff,
    errors: &mpsc::UnboundedSender<AdapterError>,
    shutdown: &CancellationToken,
) -> Option<WsStream> {
    loop {
        let Some(delay) = backoff.next_delay() else {
            error!(attempts = backoff.attempts(), "Giving up reconnecting to chat service");
            return None;
        };

        info!(delay_ms = delay.as_millis() as u64, "Reconnecting to chat service");
        tokio::select! {
            _ = shutdown.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        let attempt = async {
            let session = handshake(config).await?;
            Ok::<_, AdapterError>(ws_client::connect(&session.url).await?)
        };
        match attempt.await {
            Ok(stream) => {
                info!("Reconnected to chat service");
                return Some(stream);
            }
            Err(e) => {
                warn!(error = %e, "Reconnect attempt failed");
                let _ = errors.send(e);
            }
        }
    }
}

impl std::fmt::Debug for ChatAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatAdapter")
            .field("name", &self.name)
            .field("self_id", &self.self_id)
            .field("config", &self.config)
            .finish()
    }
}
