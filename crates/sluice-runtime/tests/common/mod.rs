//! Test doubles for the dispatch loop.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use sluice_core::{
    Adapter, AdapterError, AdapterResult, Captured, Conduits, Message, PluginDescriptor,
    PumpEnds, Sandbox, SandboxError, SandboxResult, SandboxSpec, conduits, policy,
};

/// A sandbox whose behavior is picked by the image name:
///
/// - `*fail*`: attaching fails
/// - `*grumpy*`: answers `ok` and writes to stderr
/// - `*broken*`: creation fails
/// - anything else echoes `<image>|<stdin>`
#[derive(Default)]
pub struct ScriptedSandbox {
    pub delay: Duration,
    pub invoked: Mutex<Vec<String>>,
    pub removed: Mutex<Vec<String>>,
    active: Mutex<HashMap<String, usize>>,
    peak: Mutex<HashMap<String, usize>>,
}

impl ScriptedSandbox {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Default::default()
        })
    }

    /// Highest number of overlapping invocations seen for `id`.
    pub fn peak(&self, id: &str) -> usize {
        self.peak.lock().get(id).copied().unwrap_or(0)
    }

    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl Sandbox for ScriptedSandbox {
    async fn pull(&self, _image: &str) -> SandboxResult<()> {
        Ok(())
    }

    async fn create(&self, spec: &SandboxSpec) -> SandboxResult<String> {
        if spec.image.contains("broken") {
            return Err(SandboxError::Create {
                image: spec.image.clone(),
                reason: "no such image".to_string(),
            });
        }
        Ok(spec.image.clone())
    }

    async fn start(&self, _id: &str) -> SandboxResult<()> {
        Ok(())
    }

    async fn attach(&self, id: &str, stdin: &[u8]) -> SandboxResult<Captured> {
        self.invoked.lock().push(id.to_string());
        {
            let mut active = self.active.lock();
            let count = active.entry(id.to_string()).or_default();
            *count += 1;
            let mut peak = self.peak.lock();
            let top = peak.entry(id.to_string()).or_default();
            *top = (*top).max(*count);
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(count) = self.active.lock().get_mut(id) {
            *count -= 1;
        }

        if id.contains("fail") {
            return Err(SandboxError::Attach {
                id: id.to_string(),
                reason: "stream reset".to_string(),
            });
        }
        if id.contains("grumpy") {
            return Ok(Captured {
                stdout: "ok\n".to_string(),
                stderr: "something smells".to_string(),
            });
        }
        Ok(Captured {
            stdout: format!("{id}|{}\n", String::from_utf8_lossy(stdin)),
            stderr: String::new(),
        })
    }

    async fn wait(&self, _id: &str) -> SandboxResult<i64> {
        Ok(0)
    }

    async fn remove(&self, id: &str) -> SandboxResult<()> {
        self.removed.lock().push(id.to_string());
        Ok(())
    }
}

/// An adapter fed by the test through the returned [`PumpEnds`].
pub struct MockAdapter {
    name: String,
    self_id: String,
    conduits: Mutex<Option<Conduits>>,
    shutdowns: AtomicUsize,
}

impl MockAdapter {
    pub fn new(name: &str, self_id: &str) -> (Arc<Self>, PumpEnds) {
        let (dispatcher, pumps) = conduits(16);
        let adapter = Arc::new(Self {
            name: name.to_string(),
            self_id: self_id.to_string(),
            conduits: Mutex::new(Some(dispatcher)),
            shutdowns: AtomicUsize::new(0),
        });
        (adapter, pumps)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run_and_attach(&self) -> AdapterResult<Conduits> {
        self.conduits
            .lock()
            .take()
            .ok_or_else(|| AdapterError::AlreadyAttached(self.name.clone()))
    }

    fn should_apply(&self, plugin: &PluginDescriptor, message: &Message) -> bool {
        policy::applies(plugin, message, &self.self_id)
    }

    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
