//! Runtime error types.

use thiserror::Error;

use sluice_core::{AdapterError, PluginError, SandboxError};

pub use crate::config::{ConfigError, ConfigResult};

/// Errors that abort startup. Nothing past startup is fatal.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An adapter could not be constructed.
    #[error("Error loading adapter ({name}): {source}")]
    Adapter { name: String, source: AdapterError },

    /// A plugin could not be constructed.
    #[error("Error loading plugin (image: {image}): {source}")]
    Plugin { image: String, source: PluginError },

    /// The sandbox backend is unavailable.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
