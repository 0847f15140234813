//! Wire format of the chat service.

use serde::{Deserialize, Serialize};

use sluice_core::Scope;

/// Frame type carrying a chat message.
pub const MESSAGE_TYPE: &str = "message";

/// Classifies a destination id by its prefix.
///
/// `C` (channel) and `G` (group) ids are channel-scoped, `D` ids are direct
/// conversations; anything else is unclassified.
pub fn classify(destination: &str) -> Scope {
    match destination.chars().next() {
        Some('C') | Some('G') => Scope::Channel,
        Some('D') => Scope::Direct,
        _ => Scope::Unclassified,
    }
}

/// An inbound frame.
///
/// Missing fields decode as empty strings; the service also sends frames
/// without a `type` (e.g. acknowledgements), which are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    pub channel: String,
    pub text: String,
}

impl Frame {
    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn is_message(&self) -> bool {
        self.kind == MESSAGE_TYPE
    }
}

/// An outbound message frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundFrame<'a> {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub channel: &'a str,
    pub text: &'a str,
}

impl<'a> OutboundFrame<'a> {
    pub fn message(id: u64, channel: &'a str, text: &'a str) -> Self {
        Self {
            id,
            kind: MESSAGE_TYPE,
            channel,
            text,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Body of the handshake response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HandshakeResponse {
    pub ok: bool,
    pub error: Option<String>,
    /// WebSocket URL to connect to.
    pub url: Option<String>,
    #[serde(rename = "self")]
    pub identity: Option<Identity>,
}

/// The bot's own identity.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub id: String,
}
