//! Plugin descriptors and the payloads exchanged with a plugin sandbox.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::PluginResult;
use crate::message::Message;

/// Configuration of one sandboxed responder.
///
/// The three restriction flags are not mutually exclusive; see
/// [`policy::applies`](crate::policy::applies) for how they are evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginDescriptor {
    /// Sandbox image identifier.
    pub image: String,
    /// Environment passed to the sandbox. Empty values are resolved from the
    /// process environment when the sandbox is created.
    pub environment: BTreeMap<String, String>,
    /// Bind mounts in `host:container` form.
    pub volumes: Vec<String>,
    pub run_only_on_channels: bool,
    pub run_only_on_direct_messages: bool,
    pub run_only_on_mentions: bool,
}

impl PluginDescriptor {
    /// Creates a descriptor for `image` with no restrictions.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Default::default()
        }
    }

    /// Adds an environment entry.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Adds a volume.
    pub fn volume(mut self, volume: impl Into<String>) -> Self {
        self.volumes.push(volume.into());
        self
    }

    pub fn only_channels(mut self, enabled: bool) -> Self {
        self.run_only_on_channels = enabled;
        self
    }

    pub fn only_direct_messages(mut self, enabled: bool) -> Self {
        self.run_only_on_direct_messages = enabled;
        self
    }

    pub fn only_mentions(mut self, enabled: bool) -> Self {
        self.run_only_on_mentions = enabled;
        self
    }
}

/// Version tag written into every [`PluginInput`]. Plugins ignore it for now.
pub const INPUT_VERSION: i32 = -1;

/// Structured payload written to a plugin's standard input.
///
/// ```json
/// {"version": -1, "emitter": "U123", "receiver": "C456", "body": "hello"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInput {
    pub version: i32,
    #[serde(rename = "emitter", skip_serializing_if = "String::is_empty")]
    pub sender: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub receiver: String,
    pub body: String,
}

impl PluginInput {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            version: INPUT_VERSION,
            sender: sender.into(),
            receiver: receiver.into(),
            body: body.into(),
        }
    }

    /// Serializes the input as a single JSON document.
    pub fn to_json(&self) -> PluginResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&Message> for PluginInput {
    fn from(message: &Message) -> Self {
        Self::new(message.sender(), message.receiver(), message.body())
    }
}

/// What a single plugin invocation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOutput {
    /// Captured standard output, with one trailing newline removed.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Exit status of the sandboxed process.
    pub exit_code: i64,
}
