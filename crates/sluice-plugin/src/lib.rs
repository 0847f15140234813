//! # Sluice Plugin
//!
//! Runs plugins as isolated, disposable sandboxes.
//!
//! - [`Plugin`]: the runner owning one sandbox from creation to [`Plugin::stop`]
//! - [`env`]: environment substitution and volume normalization
//! - [`DockerSandbox`]: the Docker backend (feature `docker`, on by default)
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sluice_core::{PluginDescriptor, PluginInput};
//! use sluice_plugin::{DockerSandbox, Plugin};
//!
//! let sandbox = Arc::new(DockerSandbox::connect()?);
//! let plugin = Plugin::create(PluginDescriptor::new("org/echo"), sandbox).await?;
//! let output = plugin.invoke(&PluginInput::new("U1", "C1", "hello")).await?;
//! plugin.stop().await?;
//! ```

pub mod env;
pub mod runner;

#[cfg(feature = "docker")]
pub mod docker;

pub use runner::{Plugin, sandbox_spec};

#[cfg(feature = "docker")]
pub use docker::DockerSandbox;
