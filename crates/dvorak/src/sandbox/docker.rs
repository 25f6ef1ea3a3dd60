//! Docker CLI sandbox runtime
//!
//! Drives `docker create/start/cp/exec/rm` through `tokio::process`.

use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::config::SandboxConfig;
use crate::sandbox::command::{DockerAction, DockerCommand};
use crate::sandbox::{SandboxError, SandboxId, SandboxRuntime, validate_file_name};
use crate::types::{ExecOutput, ExecRequest, SandboxFile};

/// Sandbox runtime backed by the Docker CLI
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker_path: PathBuf,
    settings: SandboxConfig,
}

impl DockerRuntime {
    pub fn new(docker_path: impl Into<PathBuf>, settings: SandboxConfig) -> Self {
        Self {
            docker_path: docker_path.into(),
            settings,
        }
    }

    fn command(&self, action: DockerAction) -> DockerCommand {
        DockerCommand::new(&self.docker_path).action(action)
    }
}

/// Run a docker command to completion, within `timeout` if given
///
/// The child is killed if the deadline passes or the future is dropped.
async fn run_docker(
    args: Vec<String>,
    stdin_data: Option<&[u8]>,
    timeout: Option<Duration>,
) -> Result<Output, SandboxError> {
    let program = args.first().ok_or_else(|| {
        SandboxError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "empty command arguments",
        ))
    })?;

    let mut child = Command::new(program)
        .args(&args[1..])
        .stdin(if stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(SandboxError::SpawnFailed)?;

    // Feed stdin from a separate task so a program that writes before it
    // reads cannot deadlock against a full pipe.
    if let (Some(data), Some(mut stdin)) = (stdin_data, child.stdin.take()) {
        let data = data.to_vec();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&data).await {
                debug!(error = %e, "stdin closed before all input was written");
            }
            // Dropping stdin signals EOF
        });
    }

    let Some(timeout) = timeout else {
        return Ok(child.wait_with_output().await?);
    };
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(SandboxError::OperationTimeout(timeout)),
    }
}

fn stderr_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    }
}

#[async_trait]
impl SandboxRuntime for DockerRuntime {
    #[instrument(skip(self))]
    async fn create(&self, image: &str) -> Result<SandboxId, SandboxError> {
        let args = self
            .command(DockerAction::Create)
            .limits(self.settings.limits.clone())
            .image(image)
            .command(self.settings.keepalive.iter().cloned())
            .build();

        debug!(?args, "creating sandbox");

        let output = run_docker(args, None, Some(self.settings.operation_timeout())).await?;
        if !output.status.success() {
            return Err(SandboxError::CreateFailed {
                image: image.to_string(),
                message: stderr_message(&output),
            });
        }

        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if id.is_empty() {
            return Err(SandboxError::CreateFailed {
                image: image.to_string(),
                message: "runtime returned an empty container id".to_string(),
            });
        }

        let id = SandboxId::new(id);
        debug!(%id, "sandbox created");
        Ok(id)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn start(&self, id: &SandboxId) -> Result<(), SandboxError> {
        let args = self
            .command(DockerAction::Start)
            .container(id.as_str())
            .build();

        let output = run_docker(args, None, Some(self.settings.operation_timeout())).await?;
        if !output.status.success() {
            return Err(SandboxError::StartFailed {
                id: id.clone(),
                message: stderr_message(&output),
            });
        }

        debug!("sandbox started");
        Ok(())
    }

    #[instrument(skip(self, files), fields(id = %id, count = files.len()))]
    async fn copy_in(
        &self,
        id: &SandboxId,
        files: &[SandboxFile],
        dest: &str,
    ) -> Result<(), SandboxError> {
        // Stage on the host first; `docker cp` copies from the filesystem
        let staging = tempfile::tempdir()?;

        for file in files {
            validate_file_name(&file.name)?;

            let host_path = staging.path().join(&file.name);
            tokio::fs::write(&host_path, &file.contents).await?;

            let args = self
                .command(DockerAction::Copy)
                .container(id.as_str())
                .copy(&host_path, format!("{dest}/{}", file.name))
                .build();

            debug!(?args, "copying file into sandbox");

            let output = run_docker(args, None, Some(self.settings.copy_timeout())).await?;
            if !output.status.success() {
                return Err(SandboxError::CopyFailed {
                    id: id.clone(),
                    message: format!("{}: {}", file.name, stderr_message(&output)),
                });
            }
        }

        // Files arrive owned by root; hand them to the execution user
        let owner = format!("{0}:{0}", self.settings.user);
        let args = self
            .command(DockerAction::Exec)
            .container(id.as_str())
            .user("root")
            .command(["chown", "-R", owner.as_str(), dest])
            .build();

        let output = run_docker(args, None, Some(self.settings.operation_timeout())).await?;
        if !output.status.success() {
            return Err(SandboxError::CopyFailed {
                id: id.clone(),
                message: format!("chown failed: {}", stderr_message(&output)),
            });
        }

        debug!("files staged");
        Ok(())
    }

    #[instrument(skip(self, request), fields(id = %id))]
    async fn exec(
        &self,
        id: &SandboxId,
        request: &ExecRequest,
    ) -> Result<ExecOutput, SandboxError> {
        let mut command = self
            .command(DockerAction::Exec)
            .container(id.as_str())
            .working_dir(&request.working_dir)
            .interactive(request.stdin.is_some())
            .command(request.command.iter().cloned());
        if let Some(ref user) = request.user {
            command = command.user(user);
        }
        let args = command.build();

        debug!(?args, "running command in sandbox");

        // Unbounded here: the executor wraps this call in the outer deadline
        let output = run_docker(args, request.stdin.as_deref(), None).await?;

        Ok(ExecOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
        })
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn remove(&self, id: &SandboxId) -> Result<(), SandboxError> {
        let args = self
            .command(DockerAction::Remove)
            .container(id.as_str())
            .build();

        let output = run_docker(args, None, Some(self.settings.operation_timeout())).await?;
        if !output.status.success() {
            let message = stderr_message(&output);
            if message.contains("No such container") {
                debug!("sandbox already gone");
                return Ok(());
            }
            warn!(stderr = %message, "remove failed");
            return Err(SandboxError::RemoveFailed {
                id: id.clone(),
                message,
            });
        }

        debug!("sandbox removed");
        Ok(())
    }
}
