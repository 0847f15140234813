//! Adapter capability trait and the conduits connecting it to the dispatcher.
//!
//! An adapter bridges one external transport to the message bus. Attaching
//! it yields three one-directional conduits and starts its background pumps:
//!
//! ```text
//!            inbound: Message           outbound: Message
//! Transport ─────────────────▶ Dispatch ─────────────────▶ Transport
//!     │                           ▲
//!     └──── errors: AdapterError ─┘
//! ```
//!
//! The adapter keeps the [`PumpEnds`] and hands the matching [`Conduits`] to
//! the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{AdapterError, AdapterResult};
use crate::message::Message;
use crate::plugin::PluginDescriptor;

/// Default capacity of the inbound and outbound conduits.
pub const DEFAULT_CONDUIT_CAPACITY: usize = 64;

/// Dispatcher-side ends of an attached adapter.
#[derive(Debug)]
pub struct Conduits {
    /// Messages received by the adapter.
    pub inbound: mpsc::Receiver<Message>,
    /// Messages the adapter should deliver.
    pub outbound: mpsc::Sender<Message>,
    /// Errors reported by the adapter's pumps.
    pub errors: mpsc::UnboundedReceiver<AdapterError>,
    /// Lets the dispatcher report its own failures on the same conduit.
    pub error_sink: mpsc::UnboundedSender<AdapterError>,
}

/// Adapter-side ends, owned by its background pumps.
#[derive(Debug)]
pub struct PumpEnds {
    pub inbound: mpsc::Sender<Message>,
    pub outbound: mpsc::Receiver<Message>,
    pub errors: mpsc::UnboundedSender<AdapterError>,
}

/// Creates a connected pair of conduit ends.
///
/// The error conduit is unbounded so a dispatcher reporting into its own
/// conduit can never block on itself.
pub fn conduits(capacity: usize) -> (Conduits, PumpEnds) {
    let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
    let (errors_tx, errors_rx) = mpsc::unbounded_channel();

    let dispatcher = Conduits {
        inbound: inbound_rx,
        outbound: outbound_tx,
        errors: errors_rx,
        error_sink: errors_tx.clone(),
    };
    let pumps = PumpEnds {
        inbound: inbound_tx,
        outbound: outbound_rx,
        errors: errors_tx,
    };
    (dispatcher, pumps)
}

/// The adapter capability set.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Name used in logs and configuration.
    fn name(&self) -> &str;

    /// Starts the background pumps and returns the dispatcher-side conduits.
    ///
    /// May be called once; later calls fail with
    /// [`AdapterError::AlreadyAttached`].
    async fn run_and_attach(&self) -> AdapterResult<Conduits>;

    /// Pure predicate: whether `plugin` should see `message` on this adapter.
    fn should_apply(&self, plugin: &PluginDescriptor, message: &Message) -> bool;

    /// Releases the transport. Called once after dispatch for this adapter
    /// has stopped.
    async fn shutdown(&self) {}
}

/// Shared adapter handle.
pub type BoxedAdapter = Arc<dyn Adapter>;
