//! Sluice Runtime - configuration, logging and the dispatch loop.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`) and its validation
//! - Logging setup (`LoggingBuilder`)
//! - The adapter factory (`registry`)
//! - The dispatch loop (`Dispatcher`) and its orchestration (`Runtime`)
//!
//! ```ignore
//! use sluice_runtime::{Runtime, config::ConfigLoader, config::validate_config, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     validate_config(&config)?;
//!     logging::init_from_config(&config.logging);
//!
//!     // Run until Ctrl+C
//!     Runtime::from_config(&config).await?.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, SluiceConfig};
pub use dispatch::{Dispatcher, PluginSlot, dispatch_message};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use registry::{AdapterKind, AdapterSettings, build_adapters};
pub use runtime::{Runtime, create_plugins, wait_for_signal};

// Re-export tracing for use by the binary
pub use tracing;
