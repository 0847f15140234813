//! Runtime orchestration.
//!
//! Startup is all-or-nothing: adapters are constructed in configuration
//! order, then plugins. Any failure aborts before dispatch begins, after
//! releasing whatever was already constructed.
//!
//! ```rust,ignore
//! use sluice_runtime::{Runtime, config::ConfigLoader};
//!
//! let config = ConfigLoader::new().load()?;
//! Runtime::from_config(&config).await?.run().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use sluice_core::env::process_env;
use sluice_core::{BoxedAdapter, Sandbox};
use sluice_plugin::{Plugin, sandbox_spec};

use crate::config::{PluginConfig, SluiceConfig};
use crate::dispatch::{Dispatcher, stop_plugins};
use crate::error::{RuntimeError, RuntimeResult};
use crate::registry::build_adapters;

/// Constructs every configured plugin in order.
///
/// If one fails, the plugins created before it are stopped and the error is
/// returned.
pub async fn create_plugins<F>(
    configs: &[PluginConfig],
    sandbox: Arc<dyn Sandbox>,
    lookup: F,
) -> RuntimeResult<Vec<Plugin>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut plugins = Vec::with_capacity(configs.len());
    for config in configs {
        let descriptor = config.to_descriptor();
        let spec = sandbox_spec(&descriptor, &lookup);

        match Plugin::create_with_spec(descriptor, spec, sandbox.clone()).await {
            Ok(plugin) => {
                info!(plugin = %plugin.image(), "Plugin loaded");
                debug!(plugin = %plugin.image(), config = ?config, "Plugin configuration");
                plugins.push(plugin);
            }
            Err(source) => {
                stop_plugins(&plugins).await;
                return Err(RuntimeError::Plugin {
                    image: config.image.clone(),
                    source,
                });
            }
        }
    }
    Ok(plugins)
}

/// The running gateway.
pub struct Runtime {
    adapters: Vec<BoxedAdapter>,
    plugins: Vec<Plugin>,
    shutdown: CancellationToken,
}

impl Runtime {
    /// Builds a runtime from already constructed parts.
    pub fn new(adapters: Vec<BoxedAdapter>, plugins: Vec<Plugin>) -> Self {
        Self {
            adapters,
            plugins,
            shutdown: CancellationToken::new(),
        }
    }

    /// Constructs adapters and plugins from `config`, running plugins in
    /// Docker.
    #[cfg(feature = "docker")]
    pub async fn from_config(config: &SluiceConfig) -> RuntimeResult<Self> {
        let sandbox = Arc::new(sluice_plugin::DockerSandbox::connect()?);
        Self::with_sandbox(config, sandbox).await
    }

    /// Constructs adapters and plugins from `config` on the given sandbox
    /// backend.
    pub async fn with_sandbox(config: &SluiceConfig, sandbox: Arc<dyn Sandbox>) -> RuntimeResult<Self> {
        let adapters = build_adapters(&config.adapters, process_env).await?;

        let plugins = match create_plugins(&config.plugins, sandbox, process_env).await {
            Ok(plugins) => plugins,
            Err(e) => {
                for adapter in &adapters {
                    adapter.shutdown().await;
                }
                return Err(e);
            }
        };

        Ok(Self::new(adapters, plugins))
    }

    /// Token that triggers shutdown when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until Ctrl+C or SIGTERM, then tears down.
    pub async fn run(self) -> RuntimeResult<()> {
        self.run_until(async {
            if let Err(e) = wait_for_signal().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Runs until `signal` completes (or the shutdown token is cancelled),
    /// then tears down.
    pub async fn run_until<F>(self, signal: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let shutdown = self.shutdown.clone();
        let run = Dispatcher::new(self.adapters, self.plugins).run(shutdown.clone());
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => return result,
            _ = signal => {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
        }
        run.await
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
