//! The sandbox-execution collaborator.
//!
//! A [`Sandbox`] creates disposable, isolated processes from an image and
//! runs them with a given standard input. The plugin runner drives it in the
//! order `pull → create`, then per invocation `start → attach → wait`, and
//! finally `remove` once at teardown.

use async_trait::async_trait;

use crate::error::SandboxResult;

/// What a sandbox should be created with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxSpec {
    pub image: String,
    /// Environment in `KEY=value` form.
    pub env: Vec<String>,
    /// Bind mounts in `host:container` form.
    pub binds: Vec<String>,
}

/// Output captured from an attached sandbox until its streams closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Sandbox-execution backend.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Pulls `image` so it can be created.
    async fn pull(&self, image: &str) -> SandboxResult<()>;

    /// Creates a sandbox and returns its handle.
    async fn create(&self, spec: &SandboxSpec) -> SandboxResult<String>;

    /// Starts a created (or previously exited) sandbox.
    async fn start(&self, id: &str) -> SandboxResult<()>;

    /// Writes `stdin` to the sandbox, closes it, and captures output until the
    /// sandboxed process closes its streams.
    async fn attach(&self, id: &str, stdin: &[u8]) -> SandboxResult<Captured>;

    /// Waits for the sandboxed process to exit and returns its status.
    async fn wait(&self, id: &str) -> SandboxResult<i64>;

    /// Destroys the sandbox permanently.
    async fn remove(&self, id: &str) -> SandboxResult<()>;
}
