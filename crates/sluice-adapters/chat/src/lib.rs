//! # Sluice Chat Adapter
//!
//! Connects Sluice to a real-time chat service speaking JSON frames over a
//! WebSocket (Slack RTM style).
//!
//! ## Connection lifecycle
//!
//! 1. `GET {api_url}/rtm.start?token=<key>` returns the socket URL and the
//!    bot's own id.
//! 2. The socket is opened; inbound `message` frames become [`Message`]s,
//!    classified by the prefix of their channel id.
//! 3. Replies are written as `{"id": n, "type": "message", "channel", "text"}`.
//! 4. A lost socket is reported on the error conduit and re-established with
//!    a fresh handshake and exponential backoff.
//!
//! [`Message`]: sluice_core::Message

pub mod adapter;
pub mod config;
pub mod frame;

pub use adapter::{ChatAdapter, Session, handshake};
pub use config::{ChatConfig, DEFAULT_API_URL};
pub use frame::{Frame, OutboundFrame, classify};
