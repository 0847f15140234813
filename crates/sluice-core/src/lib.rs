//! # Sluice Core
//!
//! Building blocks shared by every Sluice crate:
//!
//! - **Messages**: the immutable [`Message`] moved through the bus
//! - **Adapters**: the [`Adapter`] capability set and its [`Conduits`]
//! - **Plugins**: [`PluginDescriptor`], the [`PluginInput`] payload and
//!   the [`Sandbox`] collaborator that executes plugins
//! - **Policy**: [`policy::applies`], the applicability decision
//! - **Errors**: one error enum per layer
//!
//! ```text
//! ┌─────────────┐ inbound  ┌────────────┐ invoke ┌──────────┐
//! │   Adapter   │─────────▶│  Dispatch  │───────▶│  Plugin  │
//! │ (chat/http) │◀─────────│    loop    │◀───────│ (sandbox)│
//! └─────────────┘ outbound └────────────┘ output └──────────┘
//! ```

pub mod adapter;
pub mod env;
pub mod error;
pub mod message;
pub mod plugin;
pub mod policy;
pub mod sandbox;

pub use adapter::{Adapter, BoxedAdapter, Conduits, DEFAULT_CONDUIT_CAPACITY, PumpEnds, conduits};
pub use error::{
    AdapterError, AdapterResult, PluginError, PluginResult, SandboxError, SandboxResult,
    TransportError, TransportResult,
};
pub use message::{Message, Scope};
pub use plugin::{PluginDescriptor, PluginInput, PluginOutput};
pub use sandbox::{Captured, Sandbox, SandboxSpec};
