//! Configuration schema definitions.
//!
//! ```yaml
//! logging:
//!   level: info
//! adapters:
//!   - name: slack
//!     environment:
//!       key: xoxb-...
//!   - name: http
//!     environment:
//!       port: 8080
//! plugins:
//!   - image: org/echo
//!     environment:
//!       TOKEN: ""          # resolved from ORG_ECHO_TOKEN
//!     volumes: ["/srv/data"]
//!     only_mentions: true
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use sluice_core::PluginDescriptor;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SluiceConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Adapters, in the order they are constructed.
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,

    /// Plugins, in the order they are offered each message.
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Target file when `output` is `file`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Per-module levels, e.g. `sluice_transport: trace`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Applies the process-wide debug toggle: when `enabled`, the level is
    /// raised to at least `debug`.
    pub fn apply_debug_toggle(&mut self, enabled: bool) {
        if enabled && self.level != LogLevel::Trace {
            self.level = LogLevel::Debug;
        }
    }
}

// =============================================================================
// Adapters and plugins
// =============================================================================

/// One configured adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Adapter kind (`slack`, `chat` or `http`); also prefixes its
    /// environment variables.
    pub name: String,

    /// Adapter settings. Keys are case-insensitive.
    #[serde(default, deserialize_with = "scalar_map")]
    pub environment: BTreeMap<String, String>,
}

impl AdapterConfig {
    /// The environment with lowercased keys, as the adapters read it.
    pub fn settings(&self) -> BTreeMap<String, String> {
        self.environment
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect()
    }
}

/// One configured plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Sandbox image.
    pub image: String,

    /// Environment passed to the sandbox; empty values are resolved from
    /// `<IMAGE>_<KEY>` at startup.
    #[serde(default, deserialize_with = "scalar_map")]
    pub environment: BTreeMap<String, String>,

    /// Bind mounts, `host[:container]`.
    #[serde(default)]
    pub volumes: Vec<String>,

    #[serde(default, alias = "run_only_on_channels")]
    pub only_channels: bool,

    #[serde(default, alias = "run_only_on_direct_messages")]
    pub only_direct_messages: bool,

    #[serde(default, alias = "run_only_on_mentions")]
    pub only_mentions: bool,
}

impl PluginConfig {
    pub fn to_descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            image: self.image.clone(),
            environment: self.environment.clone(),
            volumes: self.volumes.clone(),
            run_only_on_channels: self.only_channels,
            run_only_on_direct_messages: self.only_direct_messages,
            run_only_on_mentions: self.only_mentions,
        }
    }
}

/// A scalar environment value; numbers and booleans keep their text form.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Deserializes a map of scalars into strings. A null value becomes empty.
fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<Scalar>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.map(|v| v.to_string()).unwrap_or_default()))
        .collect())
}
