//! Docker container workspace
//!
//! Finds or creates one long-lived container per instance and execs commands
//! inside it. Containers are keyed by an explicit `runbox.workspace` label
//! rather than matched by image, so an unrelated container that happens to
//! share the image is never attached. `disconnect` stops the container
//! without removing it; the next `connect` reattaches, amortizing start
//! latency at the cost of filesystem state persisting across sessions until
//! the container is removed.
//!
//! No timeout is enforced here and concurrent `execute` calls interleave
//! inside the same container; true isolation between concurrent executions
//! requires one `DockerWorkspace` (one container) per unit of work.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, StartContainerOptions,
    StopContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::container::LogOutput;
use bollard::Docker;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{DockerConfig, WorkspaceKind};
use crate::error::{Error, Result};
use crate::workspace::demux::{ExecOutput, StdStream};
use crate::workspace::provider::{ExecuteOptions, ExecuteResult, WorkspaceProvider};

/// Label identifying containers managed by this crate
const WORKSPACE_LABEL: &str = "runbox.workspace";

/// Workspace provider backed by a reusable Docker container
pub struct DockerWorkspace {
    docker: Docker,
    config: DockerConfig,
    /// Id of the tracked container; exactly one per instance
    container: Mutex<Option<String>>,
}

impl DockerWorkspace {
    /// Create a provider for the given container configuration
    ///
    /// Only builds the engine client; no engine call happens until
    /// `connect`.
    pub fn new(config: DockerConfig) -> Result<Self> {
        if config.image.is_empty() {
            return Err(Error::Config(
                "Docker workspace requires an image name".to_string(),
            ));
        }
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Container(format!("Failed to create Docker client: {}", e)))?;

        Ok(DockerWorkspace {
            docker,
            config,
            container: Mutex::new(None),
        })
    }

    /// Label value identifying this workspace's container
    fn workspace_label(&self) -> String {
        sanitize_label(&self.config.image)
    }

    /// Create an exec session, run it, and collect its split output
    async fn run_exec(&self, cmd: Vec<String>, stdin: Option<&str>) -> Result<ExecuteResult> {
        let container_id = self
            .container
            .lock()
            .await
            .clone()
            .ok_or_else(|| Error::Workspace("Not connected to a container".to_string()))?;

        let start = Instant::now();
        debug!(command = %cmd.join(" "), container = %container_id, "exec in container");

        let exec = self
            .docker
            .create_exec(
                &container_id,
                CreateExecOptions::<String> {
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    attach_stdin: Some(stdin.is_some()),
                    cmd: Some(cmd),
                    ..Default::default()
                },
            )
            .await?;

        let mut collected = ExecOutput::new();

        match self
            .docker
            .start_exec(&exec.id, None::<StartExecOptions>)
            .await?
        {
            StartExecResults::Attached { mut output, mut input } => {
                if let Some(data) = stdin {
                    input.write_all(data.as_bytes()).await?;
                    input.shutdown().await?;
                }

                while let Some(chunk) = output.next().await {
                    match chunk? {
                        LogOutput::StdOut { message } => {
                            collected.append(StdStream::Stdout, &message)
                        }
                        LogOutput::StdErr { message } => {
                            collected.append(StdStream::Stderr, &message)
                        }
                        // Only emitted for TTY-attached streams, where stdout
                        // and stderr are already merged into one channel.
                        LogOutput::Console { message } => {
                            collected.append(StdStream::Stdout, &message)
                        }
                        LogOutput::StdIn { .. } => {}
                    }
                }
            }
            StartExecResults::Detached => {}
        }

        // The stream carries no exit status; ask the engine after end.
        let inspect = self.docker.inspect_exec(&exec.id).await?;
        let exit_code = inspect.exit_code.unwrap_or(-1) as i32;

        Ok(ExecuteResult {
            stdout: collected.stdout,
            stderr: collected.stderr,
            exit_code,
            signal: None,
            timed_out: false,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }
}

/// Reduce an image name to a label-safe identifier
fn sanitize_label(image: &str) -> String {
    image
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Quote a path for use inside `sh -c`
fn shell_quote(path: &str) -> String {
    format!("'{}'", path.replace('\'', r"'\''"))
}

#[async_trait]
impl WorkspaceProvider for DockerWorkspace {
    fn kind(&self) -> WorkspaceKind {
        WorkspaceKind::Docker
    }

    fn name(&self) -> &str {
        "Docker Container"
    }

    async fn connect(&self) -> Result<()> {
        let mut guard = self.container.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        self.docker
            .ping()
            .await
            .map_err(|e| Error::Container(format!("Docker engine unreachable: {}", e)))?;

        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("{}={}", WORKSPACE_LABEL, self.workspace_label())],
        );

        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                filters,
                ..Default::default()
            }))
            .await?;

        if let Some(existing) = containers.into_iter().next() {
            let id = existing
                .id
                .ok_or_else(|| Error::Container("Container listing missing id".to_string()))?;
            if existing.state.as_deref() != Some("running") {
                self.docker
                    .start_container(&id, None::<StartContainerOptions<String>>)
                    .await?;
            }
            info!(container = %id, "reattached to existing workspace container");
            *guard = Some(id);
            return Ok(());
        }

        let mut labels = HashMap::new();
        labels.insert(WORKSPACE_LABEL.to_string(), self.workspace_label());

        let name = format!(
            "runbox-{}",
            &uuid::Uuid::new_v4().simple().to_string()[..12]
        );

        let container_config = Config {
            image: Some(self.config.image.clone()),
            tty: Some(true),
            open_stdin: Some(true),
            labels: Some(labels),
            network_disabled: Some(self.config.network == "none"),
            host_config: Some(bollard::service::HostConfig {
                memory: Some(self.config.memory_limit_mb * 1024 * 1024),
                nano_cpus: Some((self.config.cpu_limit * 1_000_000_000.0) as i64),
                network_mode: Some(self.config.network.clone()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.as_str(),
                    platform: None,
                }),
                container_config,
            )
            .await?;

        self.docker
            .start_container(&created.id, None::<StartContainerOptions<String>>)
            .await?;

        info!(container = %created.id, image = %self.config.image, "created workspace container");
        *guard = Some(created.id);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut guard = self.container.lock().await;
        if let Some(id) = guard.take() {
            // Stop, don't remove: the next connect reattaches.
            if let Err(e) = self
                .docker
                .stop_container(&id, None::<StopContainerOptions>)
                .await
            {
                warn!(container = %id, error = %e, "stopping workspace container failed");
            }
        }
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let result = self.run_exec(Self::argv(&["cat", path]), None).await?;
        if result.exit_code != 0 {
            return Err(Error::NotFound(format!("File not found: {}", path)));
        }
        Ok(result.stdout)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let cmd = Self::argv(&["sh", "-c", &format!("cat > {}", shell_quote(path))]);
        let result = self.run_exec(cmd, Some(content)).await?;
        if result.exit_code != 0 {
            return Err(Error::Container(format!(
                "Failed to write {}: {}",
                path, result.stderr
            )));
        }
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let result = self.run_exec(Self::argv(&["rm", "-f", path]), None).await?;
        if result.exit_code != 0 {
            return Err(Error::Container(format!(
                "Failed to delete {}: {}",
                path, result.stderr
            )));
        }
        Ok(())
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let result = self.run_exec(Self::argv(&["ls", "-1", path]), None).await?;
        if result.exit_code != 0 {
            return Err(Error::NotFound(format!("Directory not found: {}", path)));
        }
        Ok(result
            .stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect())
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        let result = self
            .run_exec(Self::argv(&["test", "-e", path]), None)
            .await?;
        Ok(result.exit_code == 0)
    }

    async fn execute(
        &self,
        command: &str,
        args: &[String],
        options: Option<&ExecuteOptions>,
    ) -> Result<ExecuteResult> {
        let mut cmd = Vec::with_capacity(args.len() + 1);
        cmd.push(command.to_string());
        cmd.extend(args.iter().cloned());
        let stdin = options.and_then(|opts| opts.stdin.as_deref());
        self.run_exec(cmd, stdin).await
    }
}
