//! # Sluice Transport
//!
//! Network transport primitives used by Sluice adapters. Every transport is
//! behind a feature flag:
//!
//! - `ws-client`: WebSocket client sessions ([`ws_client`])
//! - `http-server`: HTTP listener ([`http_server`])
//! - `http-client`: HTTPS JSON requests ([`http_client`])
//! - `full`: all of the above
//!
//! ```text
//! ┌─────────────────────┐
//! │  Adapter Layer      │  (chat, http)
//! ├─────────────────────┤
//! │  sluice-transport   │  <- This crate
//! ├─────────────────────┤
//! │  Network (TCP/HTTP) │
//! └─────────────────────┘
//! ```

pub mod retry;

#[cfg(feature = "http-client")]
pub mod http_client;

#[cfg(feature = "http-server")]
pub mod http_server;

#[cfg(feature = "ws-client")]
pub mod ws_client;

pub use retry::{Backoff, RetryPolicy};

#[cfg(feature = "http-server")]
pub use http_server::{Bytes, HttpListener, RequestHandler};

#[cfg(feature = "ws-client")]
pub use ws_client::{FrameHandler, Outbox, SessionEnd, WsStream};
