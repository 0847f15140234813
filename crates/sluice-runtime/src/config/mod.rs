//! Configuration for the Sluice runtime.
//!
//! Configuration is layered with figment (defaults, files, `SLUICE_*`
//! environment variables) and validated before anything is constructed.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    AdapterConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PluginConfig, SluiceConfig,
};
pub use validation::{validate_config, validate_config_with};
