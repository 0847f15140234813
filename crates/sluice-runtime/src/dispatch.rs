//! The dispatch loop.
//!
//! Every attached adapter gets one worker task:
//!
//! ```text
//!              ┌──────────── inbound ────────────┐
//!              ▼                                 │
//! LISTENING ──msg──▶ DISPATCHING ──done──▶ LISTENING
//!     │                  (plugins in order)
//!     ├──err──▶ log ──▶ LISTENING
//!     └──shutdown──▶ DRAINING ──▶ STOPPED
//! ```
//!
//! A message is offered to the plugins in declaration order. Each plugin the
//! adapter's policy accepts is invoked to completion before the next one; a
//! failing plugin is reported on the adapter's error conduit and skipped.
//! Every reply goes back through the adapter it came from.
//!
//! A plugin is shared by all workers, so invocations of one plugin are
//! serialized by a per-plugin lock while different plugins run concurrently.
//!
//! Shutdown is a single broadcast. Workers finish the message they are on,
//! then stop. Once all have stopped, adapters are shut down and every plugin
//! is stopped exactly once, in declaration order.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use sluice_core::{Adapter, AdapterError, BoxedAdapter, Conduits, Message, PluginInput};
use sluice_plugin::Plugin;

use crate::error::{RuntimeError, RuntimeResult};

/// A plugin and the lock serializing its invocations.
#[derive(Debug)]
pub struct PluginSlot {
    plugin: Plugin,
    guard: Mutex<()>,
}

impl PluginSlot {
    pub fn new(plugin: Plugin) -> Self {
        Self {
            plugin,
            guard: Mutex::new(()),
        }
    }

    pub fn plugin(&self) -> &Plugin {
        &self.plugin
    }
}

/// Offers `message` to every plugin in order and emits the replies.
///
/// Never fails: plugin errors go to `error_sink`, and a closed outbound
/// conduit only drops the reply.
pub async fn dispatch_message(
    adapter: &dyn Adapter,
    plugins: &[PluginSlot],
    message: &Message,
    outbound: &mpsc::Sender<Message>,
    error_sink: &mpsc::UnboundedSender<AdapterError>,
) {
    debug!(
        sender = %message.sender(),
        receiver = %message.receiver(),
        scope = %message.scope(),
        "Message received"
    );
    let input = PluginInput::from(message);

    for slot in plugins {
        let plugin = &slot.plugin;
        if !adapter.should_apply(plugin.descriptor(), message) {
            debug!(plugin = %plugin.image(), "Plugin does not apply");
            continue;
        }

        debug!(plugin = %plugin.image(), "Running plugin");
        let result = {
            let _running = slot.guard.lock().await;
            plugin.invoke(&input).await
        };

        let output = match result {
            Ok(output) => output,
            Err(source) => {
                let _ = error_sink.send(AdapterError::Plugin {
                    image: plugin.image().to_string(),
                    source,
                });
                continue;
            }
        };

        if !output.stderr.is_empty() {
            error!(plugin = %plugin.image(), stderr = %output.stderr, "Plugin threw an error");
        }
        debug!(
            plugin = %plugin.image(),
            exit_code = output.exit_code,
            response = %output.stdout,
            "Plugin responded"
        );

        if outbound.send(message.reply(output.stdout)).await.is_err() {
            warn!(plugin = %plugin.image(), "Outbound conduit closed, dropping reply");
        }
    }
}

/// Runs one adapter's worker until shutdown.
async fn worker(
    adapter: BoxedAdapter,
    conduits: Conduits,
    plugins: Arc<[PluginSlot]>,
    shutdown: CancellationToken,
) {
    let Conduits {
        mut inbound,
        outbound,
        mut errors,
        error_sink,
    } = conduits;
    let mut inbound_open = true;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            Some(err) = errors.recv() => {
                error!(error = %err, "Adapter error");
            }
            message = inbound.recv(), if inbound_open => match message {
                Some(message) => {
                    dispatch_message(adapter.as_ref(), &plugins, &message, &outbound, &error_sink)
                        .await;
                }
                None => {
                    warn!("Inbound conduit closed, waiting for shutdown");
                    inbound_open = false;
                }
            },
        }
    }

    // Draining: report what is already queued, accept no new work.
    while let Ok(err) = errors.try_recv() {
        error!(error = %err, "Adapter error");
    }
    debug!("Worker stopped");
}

/// Owns the adapters and plugins for one run of the loop.
pub struct Dispatcher {
    adapters: Vec<BoxedAdapter>,
    plugins: Arc<[PluginSlot]>,
}

impl Dispatcher {
    pub fn new(adapters: Vec<BoxedAdapter>, plugins: Vec<Plugin>) -> Self {
        Self {
            adapters,
            plugins: plugins.into_iter().map(PluginSlot::new).collect(),
        }
    }

    /// Attaches every adapter and dispatches until `shutdown` is cancelled,
    /// then tears everything down.
    ///
    /// Fails only if an adapter cannot be attached, in which case nothing is
    /// dispatched and the teardown still runs.
    pub async fn run(self, shutdown: CancellationToken) -> RuntimeResult<()> {
        let mut workers = JoinSet::new();
        let mut attach_error = None;

        for adapter in &self.adapters {
            let conduits = match adapter.run_and_attach().await {
                Ok(conduits) => conduits,
                Err(source) => {
                    attach_error = Some(RuntimeError::Adapter {
                        name: adapter.name().to_string(),
                        source,
                    });
                    shutdown.cancel();
                    break;
                }
            };

            let span = info_span!("dispatch", adapter = %adapter.name());
            workers.spawn(
                worker(
                    adapter.clone(),
                    conduits,
                    self.plugins.clone(),
                    shutdown.clone(),
                )
                .instrument(span),
            );
        }

        if attach_error.is_none() {
            info!(
                adapters = self.adapters.len(),
                plugins = self.plugins.len(),
                "Listening"
            );
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Dispatch worker failed");
            }
        }

        self.teardown().await;
        attach_error.map_or(Ok(()), Err)
    }

    async fn teardown(&self) {
        info!("Teardown...");
        for adapter in &self.adapters {
            adapter.shutdown().await;
        }
        stop_plugins(self.plugins.iter().map(PluginSlot::plugin)).await;
    }
}

/// Stops each plugin once, in order. Failures are logged and skipped.
pub async fn stop_plugins<'a>(plugins: impl IntoIterator<Item = &'a Plugin>) {
    for plugin in plugins {
        if let Err(e) = plugin.stop().await {
            warn!(plugin = %plugin.image(), error = %e, "Failed to stop plugin");
        }
    }
}
