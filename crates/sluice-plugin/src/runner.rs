//! The plugin runner.
//!
//! A [`Plugin`] owns one sandbox for the lifetime of the process. The sandbox
//! is created once; every invocation restarts it, feeds the JSON input on its
//! standard input and captures what it prints until it exits.
//!
//! A plugin does not serialize its own invocations. Callers sharing one
//! plugin between tasks must guard it themselves.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{Instrument, Span, debug, info, info_span};

use sluice_core::env::process_env;
use sluice_core::{
    PluginDescriptor, PluginError, PluginInput, PluginOutput, PluginResult, Sandbox, SandboxSpec,
};

use crate::env::{ensure_mount_points, resolve_environment};

/// Builds the sandbox specification for `descriptor`.
///
/// `lookup` resolves the environment variables used for empty values.
pub fn sandbox_spec<F>(descriptor: &PluginDescriptor, lookup: F) -> SandboxSpec
where
    F: Fn(&str) -> Option<String>,
{
    SandboxSpec {
        image: descriptor.image.clone(),
        env: resolve_environment(&descriptor.image, &descriptor.environment, lookup),
        binds: ensure_mount_points(&descriptor.volumes),
    }
}

/// A constructed plugin with its sandbox.
pub struct Plugin {
    descriptor: PluginDescriptor,
    sandbox: Arc<dyn Sandbox>,
    id: String,
    stopped: AtomicBool,
    span: Span,
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("image", &self.descriptor.image)
            .field("id", &self.id)
            .field("stopped", &self.stopped.load(Ordering::Acquire))
            .finish()
    }
}

impl Plugin {
    /// Pulls the image and creates the sandbox.
    ///
    /// Empty environment values are resolved from the process environment.
    pub async fn create(descriptor: PluginDescriptor, sandbox: Arc<dyn Sandbox>) -> PluginResult<Self> {
        let spec = sandbox_spec(&descriptor, process_env);
        Self::create_with_spec(descriptor, spec, sandbox).await
    }

    /// Pulls the image and creates the sandbox from an explicit `spec`.
    pub async fn create_with_spec(
        descriptor: PluginDescriptor,
        spec: SandboxSpec,
        sandbox: Arc<dyn Sandbox>,
    ) -> PluginResult<Self> {
        let span = info_span!("plugin", image = %descriptor.image);

        let id = async {
            sandbox.pull(&spec.image).await?;
            let id = sandbox.create(&spec).await?;
            debug!(id = %id, binds = ?spec.binds, "Sandbox created");
            Ok::<_, PluginError>(id)
        }
        .instrument(span.clone())
        .await?;

        Ok(Self {
            descriptor,
            sandbox,
            id,
            stopped: AtomicBool::new(false),
            span,
        })
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn image(&self) -> &str {
        &self.descriptor.image
    }

    /// Handle of the underlying sandbox.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Runs the plugin once with `input`.
    ///
    /// Blocks until the sandboxed process exits. One trailing newline is
    /// trimmed from the captured standard output.
    pub async fn invoke(&self, input: &PluginInput) -> PluginResult<PluginOutput> {
        if self.is_stopped() {
            return Err(PluginError::Stopped {
                image: self.descriptor.image.clone(),
            });
        }

        let payload = input.to_json()?;

        async {
            self.sandbox.start(&self.id).await?;
            let captured = self.sandbox.attach(&self.id, payload.as_bytes()).await?;
            let exit_code = self.sandbox.wait(&self.id).await?;

            debug!(exit_code, stdout_len = captured.stdout.len(), "Plugin finished");

            let mut stdout = captured.stdout;
            if stdout.ends_with('\n') {
                stdout.pop();
            }

            Ok::<_, PluginError>(PluginOutput {
                stdout,
                stderr: captured.stderr,
                exit_code,
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Destroys the sandbox.
    ///
    /// Only the first call removes it; later calls fail with
    /// [`PluginError::Stopped`].
    pub async fn stop(&self) -> PluginResult<()> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Err(PluginError::Stopped {
                image: self.descriptor.image.clone(),
            });
        }

        async {
            self.sandbox.remove(&self.id).await?;
            info!("Plugin stopped");
            Ok::<_, PluginError>(())
        }
        .instrument(self.span.clone())
        .await
    }
}
