//! Unified error types for the Sluice core.
//!
//! Every layer has its own error enum and `*Result` alias. Errors carry
//! owned `String` reasons so they can be cloned onto an adapter's error
//! conduit and logged without borrowing from the failing transport.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {url} - {reason}")]
    ConnectionFailed {
        /// The URL that failed to connect.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connection closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// Message send failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// The remote answered with an unexpected HTTP status.
    #[error("received HTTP {status} from {url} (expected 200)")]
    UnexpectedStatus {
        /// The requested URL.
        url: String,
        /// The status code received.
        status: u16,
    },

    /// Invalid configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Sandbox Errors
// =============================================================================

/// Errors reported by a [`Sandbox`](crate::sandbox::Sandbox) implementation.
#[derive(Debug, Clone, Error)]
pub enum SandboxError {
    /// The sandbox backend could not be reached.
    #[error("sandbox backend unavailable: {0}")]
    Unavailable(String),

    /// Pulling the image failed.
    #[error("failed to pull image '{image}': {reason}")]
    Pull { image: String, reason: String },

    /// Creating the sandbox failed.
    #[error("failed to create sandbox for '{image}': {reason}")]
    Create { image: String, reason: String },

    /// Starting the sandbox failed.
    #[error("failed to start sandbox {id}: {reason}")]
    Start { id: String, reason: String },

    /// Attaching to the sandbox streams failed.
    #[error("failed to attach to sandbox {id}: {reason}")]
    Attach { id: String, reason: String },

    /// Waiting for the sandbox process failed.
    #[error("failed to wait for sandbox {id}: {reason}")]
    Wait { id: String, reason: String },

    /// Removing the sandbox failed.
    #[error("failed to remove sandbox {id}: {reason}")]
    Remove { id: String, reason: String },
}

// =============================================================================
// Plugin Errors
// =============================================================================

/// Errors that can occur while running a plugin.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// The sandbox collaborator failed.
    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    /// The plugin was already destroyed.
    #[error("plugin '{image}' has been stopped")]
    Stopped { image: String },

    /// The plugin input could not be serialized.
    #[error("failed to serialize plugin input: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors that can occur in adapter operations.
///
/// These are the values carried on an adapter's error conduit.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// The service handshake was rejected or malformed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// An inbound frame could not be decoded.
    #[error("failed to decode frame: {reason}")]
    Decode {
        /// Reason for failure.
        reason: String,
    },

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A plugin invocation failed while handling a message of this adapter.
    #[error("plugin '{image}' failed: {source}")]
    Plugin {
        /// Image of the failing plugin.
        image: String,
        /// Underlying plugin error.
        source: PluginError,
    },

    /// `run_and_attach` was called twice.
    #[error("adapter '{0}' is already attached")]
    AlreadyAttached(String),

    /// Invalid adapter configuration.
    #[error("invalid adapter configuration: {0}")]
    InvalidConfig(String),
}

impl AdapterError {
    /// Creates a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode { reason: msg.into() }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for sandbox operations.
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;
