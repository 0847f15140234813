//! # Sluice HTTP Adapter
//!
//! Exposes the gateway as an HTTP endpoint: the body of a POST becomes a
//! message, and the first plugin reply becomes the response.
//!
//! ```text
//! POST /  ──▶ register token ──▶ Message { receiver: token, body }
//!                                        │
//!                                        ▼ dispatch
//! 200 "reply\n" ◀── complete(token) ◀── outbound Message { receiver: token }
//! ```
//!
//! Many requests may be in flight at once. Replies are routed by token
//! through [`PendingReplies`], never by arrival order.

pub mod adapter;
pub mod config;
pub mod correlation;

pub use adapter::HttpAdapter;
pub use config::HttpConfig;
pub use correlation::{PendingReplies, Registration};
