//! Pairing asynchronous replies with waiting HTTP callers.
//!
//! Every request registers a fresh token before its message is published.
//! Whoever drains the outbound conduit completes the waiter registered under
//! the reply's `receiver`. A reply can only ever reach the waiter holding its
//! token; replies for unknown or already settled tokens are dropped.
//!
//! A token lives exactly as long as its [`Registration`]. A caller that goes
//! away mid-request drops the registration and with it the token.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Registry of callers waiting for a reply.
#[derive(Debug, Default)]
pub struct PendingReplies {
    waiters: Mutex<HashMap<String, oneshot::Sender<String>>>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a token and registers a waiter for it.
    pub fn register(&self) -> (Registration<'_>, oneshot::Receiver<String>) {
        let token = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(token.clone(), tx);
        (
            Registration {
                registry: self,
                token,
            },
            rx,
        )
    }

    /// Delivers `body` to the waiter of `token`.
    ///
    /// Returns `false` if nobody is waiting for `token` (anymore).
    pub fn complete(&self, token: &str, body: String) -> bool {
        let Some(waiter) = self.waiters.lock().remove(token) else {
            return false;
        };
        waiter.send(body).is_ok()
    }

    /// Forgets the waiter of `token`.
    pub fn cancel(&self, token: &str) -> bool {
        self.waiters.lock().remove(token).is_some()
    }

    /// Number of callers still waiting.
    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A registered token. Dropping it forgets the waiter.
#[derive(Debug)]
pub struct Registration<'a> {
    registry: &'a PendingReplies,
    token: String,
}

impl Registration<'_> {
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.registry.cancel(&self.token);
    }
}
