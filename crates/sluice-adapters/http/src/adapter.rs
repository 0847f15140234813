//! The HTTP request/response adapter.
//!
//! One POST is one inbound message addressed to a fresh correlation token.
//! The request waits until a reply for that token shows up on the outbound
//! conduit, then answers with the reply body followed by a newline. Only the
//! first reply counts; later replies for the same token are dropped.
//!
//! A request that gets no reply within the configured timeout, or that is
//! still waiting at shutdown, is answered with an empty body.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info_span, trace, warn};

use sluice_core::{
    Adapter, AdapterError, AdapterResult, Conduits, DEFAULT_CONDUIT_CAPACITY, Message,
    PluginDescriptor, PumpEnds, conduits,
};
use sluice_transport::{Bytes, HttpListener, RequestHandler};

use crate::config::HttpConfig;
use crate::correlation::PendingReplies;

/// Adapter serving an HTTP endpoint.
pub struct HttpAdapter {
    name: String,
    config: HttpConfig,
    local_addr: SocketAddr,
    listener: Mutex<Option<HttpListener>>,
    pending: Arc<PendingReplies>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    span: Span,
}

impl HttpAdapter {
    /// Binds the listener. Serving starts with `run_and_attach`.
    pub async fn bind(name: impl Into<String>, config: HttpConfig) -> AdapterResult<Self> {
        let name = name.into();
        let span = info_span!("adapter", name = %name);

        let listener = HttpListener::bind(&config.bind_addr())
            .instrument(span.clone())
            .await?;
        let local_addr = listener.local_addr();

        Ok(Self {
            name,
            config,
            local_addr,
            listener: Mutex::new(Some(listener)),
            pending: Arc::new(PendingReplies::new()),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            span,
        })
    }

    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests currently waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }
}

#[async_trait]
impl Adapter for HttpAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_and_attach(&self) -> AdapterResult<Conduits> {
        let listener = self
            .listener
            .lock()
            .take()
            .ok_or_else(|| AdapterError::AlreadyAttached(self.name.clone()))?;

        let (dispatcher, pumps) = conduits(DEFAULT_CONDUIT_CAPACITY);
        let PumpEnds {
            inbound,
            outbound,
            errors,
        } = pumps;

        let router = tokio::spawn(
            route_replies(outbound, self.pending.clone(), self.shutdown.clone())
                .instrument(self.span.clone()),
        );

        let handler = Arc::new(Requests {
            pending: self.pending.clone(),
            inbound,
            reply_timeout: self.config.reply_timeout,
            shutdown: self.shutdown.clone(),
        });
        let path = self.config.path.clone();
        let shutdown = self.shutdown.clone();
        let server = tokio::spawn(
            async move {
                if let Err(e) = listener.serve(&path, handler, shutdown).await {
                    let _ = errors.send(AdapterError::Transport(e));
                }
            }
            .instrument(self.span.clone()),
        );

        self.tasks.lock().extend([router, server]);
        Ok(dispatcher)
    }

    /// Requests carry no restriction-relevant context; every plugin applies.
    fn should_apply(&self, _plugin: &PluginDescriptor, _message: &Message) -> bool {
        true
    }

    async fn shutdown(&self) {
        self.shutdown.cancel();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
        debug!(parent: &self.span, "HTTP adapter shut down");
    }
}

impl std::fmt::Debug for HttpAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAdapter")
            .field("name", &self.name)
            .field("local_addr", &self.local_addr)
            .field("config", &self.config)
            .finish()
    }
}

/// Answers HTTP requests through the message bus.
struct Requests {
    pending: Arc<PendingReplies>,
    inbound: mpsc::Sender<Message>,
    reply_timeout: Duration,
    shutdown: CancellationToken,
}

#[async_trait]
impl RequestHandler for Requests {
    async fn on_request(&self, body: Bytes) -> String {
        let body = String::from_utf8_lossy(&body).into_owned();

        // Register before publishing so a fast reply cannot be missed. The
        // token is forgotten when `registration` drops, including when the
        // caller disconnects and this future is dropped mid-wait.
        let (registration, reply) = self.pending.register();
        let token = registration.token();
        trace!(token = %token, "Request registered");

        if self.inbound.send(Message::to(token, body)).await.is_err() {
            warn!("Inbound conduit closed, answering with an empty body");
            return String::new();
        }

        let outcome = tokio::select! {
            _ = self.shutdown.cancelled() => None,
            result = tokio::time::timeout(self.reply_timeout, reply) => result.ok().and_then(Result::ok),
        };

        match outcome {
            Some(body) => format!("{body}\n"),
            None => {
                debug!(token = %token, "No reply for request");
                String::new()
            }
        }
    }
}

/// Completes waiting requests from the outbound conduit.
async fn route_replies(
    mut outbound: mpsc::Receiver<Message>,
    pending: Arc<PendingReplies>,
    shutdown: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = outbound.recv() => match message {
                Some(message) => message,
                None => break,
            },
        };

        let token = message.receiver().to_string();
        if !pending.complete(&token, message.body().to_string()) {
            debug!(token = %token, "Discarding reply nobody waits for");
        }
    }
    debug!("Reply router stopped");
}
