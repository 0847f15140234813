//! The message moved through the dispatch bus.
//!
//! A [`Message`] is an immutable value. Inbound messages are built by an
//! adapter; the reply a plugin produces is a fresh message built with
//! [`Message::reply`], which keeps only the original `receiver`.

use std::fmt;

/// Where a message originated, as far as the adapter can tell.
///
/// Encodes the "at most one of channel/direct" invariant in the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// A shared channel or group.
    Channel,
    /// A one-to-one conversation with the bot.
    Direct,
    /// The transport carries no notion of scope (e.g. HTTP).
    #[default]
    Unclassified,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Direct => "direct",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit moved through the bus.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    sender: String,
    receiver: String,
    body: String,
    scope: Scope,
}

impl Message {
    /// Creates a new message.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        body: impl Into<String>,
        scope: Scope,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            body: body.into(),
            scope,
        }
    }

    /// Creates an unclassified message addressed to `receiver`.
    pub fn to(receiver: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(String::new(), receiver, body, Scope::Unclassified)
    }

    /// Builds the reply to this message, addressed to the same receiver.
    pub fn reply(&self, body: impl Into<String>) -> Self {
        Self::to(self.receiver.clone(), body)
    }

    /// Originating identity; may be empty.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Destination identity: a channel id or a correlation token.
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn is_channel_scoped(&self) -> bool {
        self.scope == Scope::Channel
    }

    pub fn is_direct_message(&self) -> bool {
        self.scope == Scope::Direct
    }
}
