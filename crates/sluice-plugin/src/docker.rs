//! Docker-backed [`Sandbox`].
//!
//! Each plugin gets one container created with an open, single-use standard
//! input. An invocation starts the container, attaches to it, writes the
//! input and closes the stream, then collects output until the container
//! closes its side.

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    AttachContainerOptions, AttachContainerResults, Config, CreateContainerOptions, LogOutput,
    RemoveContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use futures::{StreamExt, TryStreamExt};
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};

use sluice_core::{Captured, Sandbox, SandboxError, SandboxResult, SandboxSpec};

/// Splits `image` into repository and tag, defaulting the tag to `latest`.
///
/// Digest references are passed through untouched with an empty tag.
pub fn image_reference(image: &str) -> (&str, &str) {
    if image.contains('@') {
        return (image, "");
    }
    let name_start = image.rfind('/').map_or(0, |i| i + 1);
    match image[name_start..].rfind(':') {
        Some(i) => (&image[..name_start + i], &image[name_start + i + 1..]),
        None => (image, "latest"),
    }
}

/// Sandbox running plugins as Docker containers.
#[derive(Debug, Clone)]
pub struct DockerSandbox {
    docker: Docker,
}

impl DockerSandbox {
    /// Connects to the local Docker daemon (`DOCKER_HOST` or the default
    /// socket).
    pub fn connect() -> SandboxResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| SandboxError::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Wraps an existing client.
    pub fn with_client(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl Sandbox for DockerSandbox {
    async fn pull(&self, image: &str) -> SandboxResult<()> {
        let (from_image, tag) = image_reference(image);
        debug!(image = %from_image, tag = %tag, "Pulling image");

        let options = CreateImageOptions {
            from_image: from_image.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };

        self.docker
            .create_image(Some(options), None, None)
            .try_for_each(|info| {
                if let Some(status) = info.status {
                    trace!(status = %status, "Pull progress");
                }
                futures::future::ok(())
            })
            .await
            .map_err(|e| SandboxError::Pull {
                image: image.to_string(),
                reason: e.to_string(),
            })
    }

    async fn create(&self, spec: &SandboxSpec) -> SandboxResult<String> {
        let host_config = HostConfig {
            binds: (!spec.binds.is_empty()).then(|| spec.binds.clone()),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            env: Some(spec.env.clone()),
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            open_stdin: Some(true),
            stdin_once: Some(true),
            host_config: Some(host_config),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| SandboxError::Create {
                image: spec.image.clone(),
                reason: e.to_string(),
            })?;

        for warning in &response.warnings {
            debug!(id = %response.id, warning = %warning, "Docker warning");
        }
        Ok(response.id)
    }

    async fn start(&self, id: &str) -> SandboxResult<()> {
        self.docker
            .start_container::<String>(id, None)
            .await
            .map_err(|e| SandboxError::Start {
                id: id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn attach(&self, id: &str, stdin: &[u8]) -> SandboxResult<Captured> {
        let attach_error = |e: String| SandboxError::Attach {
            id: id.to_string(),
            reason: e,
        };

        let options = AttachContainerOptions::<String> {
            stdin: Some(true),
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            ..Default::default()
        };

        let AttachContainerResults {
            mut output,
            mut input,
        } = self
            .docker
            .attach_container(id, Some(options))
            .await
            .map_err(|e| attach_error(e.to_string()))?;

        input
            .write_all(stdin)
            .await
            .map_err(|e| attach_error(e.to_string()))?;
        input
            .shutdown()
            .await
            .map_err(|e| attach_error(e.to_string()))?;

        let mut captured = Captured::default();
        while let Some(chunk) = output.next().await {
            match chunk.map_err(|e| attach_error(e.to_string()))? {
                LogOutput::StdOut { message } | LogOutput::Console { message } => {
                    captured.stdout.push_str(&String::from_utf8_lossy(&message));
                }
                LogOutput::StdErr { message } => {
                    captured.stderr.push_str(&String::from_utf8_lossy(&message));
                }
                LogOutput::StdIn { .. } => {}
            }
        }
        Ok(captured)
    }

    async fn wait(&self, id: &str) -> SandboxResult<i64> {
        let mut responses = self
            .docker
            .wait_container(id, None::<WaitContainerOptions<String>>);

        let mut status = 0;
        while let Some(response) = responses.next().await {
            match response {
                Ok(response) => status = response.status_code,
                // A non-zero exit is reported as an error by the daemon client.
                Err(DockerError::DockerContainerWaitError { code, .. }) => status = code,
                Err(e) => {
                    return Err(SandboxError::Wait {
                        id: id.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(status)
    }

    async fn remove(&self, id: &str) -> SandboxResult<()> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| SandboxError::Remove {
                id: id.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_reference() {
        assert_eq!(image_reference("alpine"), ("alpine", "latest"));
        assert_eq!(image_reference("org/echo:1.2"), ("org/echo", "1.2"));
        assert_eq!(
            image_reference("localhost:5000/echo"),
            ("localhost:5000/echo", "latest")
        );
        assert_eq!(
            image_reference("localhost:5000/echo:dev"),
            ("localhost:5000/echo", "dev")
        );
        assert_eq!(
            image_reference("alpine@sha256:abcd"),
            ("alpine@sha256:abcd", "")
        );
    }
}
