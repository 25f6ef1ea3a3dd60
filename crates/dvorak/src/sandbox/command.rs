//! Command builder for the Docker CLI
//!
//! Builds argument vectors for the container operations used by the judge.
//! Nothing here goes through a shell.

use std::path::{Path, PathBuf};

use crate::types::SandboxLimits;

/// Builder for Docker command-line arguments
#[derive(Debug)]
pub struct DockerCommand {
    /// Path to the docker binary
    docker_path: PathBuf,
    /// One of create, start, cp, exec, rm
    action: DockerAction,
    /// Container ID (all actions but create)
    container: Option<String>,
    /// Image reference (create)
    image: Option<String>,
    /// Resource caps (create)
    limits: SandboxLimits,
    /// Host file to copy (cp)
    source: Option<PathBuf>,
    /// Destination path inside the container (cp)
    dest: Option<String>,
    /// -w, --workdir (exec)
    working_dir: Option<String>,
    /// -u, --user (exec)
    user: Option<String>,
    /// -i, --interactive (exec)
    interactive: bool,
    /// Command and arguments (create keepalive, exec)
    command: Vec<String>,
}

impl DockerCommand {
    /// Create a new docker command builder
    pub fn new(docker_path: impl Into<PathBuf>) -> Self {
        Self {
            docker_path: docker_path.into(),
            action: DockerAction::Exec,
            container: None,
            image: None,
            limits: SandboxLimits::default(),
            source: None,
            dest: None,
            working_dir: None,
            user: None,
            interactive: false,
            command: Vec::new(),
        }
    }

    /// Set the action to perform
    pub fn action(mut self, action: DockerAction) -> Self {
        self.action = action;
        self
    }

    /// Set the target container
    pub fn container(mut self, id: impl Into<String>) -> Self {
        self.container = Some(id.into());
        self
    }

    /// Set the image to create the container from
    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set resource limits
    pub fn limits(mut self, limits: SandboxLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the host file and in-container destination for a copy
    pub fn copy(mut self, source: impl Into<PathBuf>, dest: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self.dest = Some(dest.into());
        self
    }

    /// Set the working directory inside the container
    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the user to run as inside the container
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Keep stdin open so input can be piped in
    pub fn interactive(mut self, enable: bool) -> Self {
        self.interactive = enable;
        self
    }

    /// Set the command to run
    pub fn command(mut self, cmd: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.command = cmd.into_iter().map(Into::into).collect();
        self
    }

    /// Build the command-line arguments
    ///
    /// Consumes self to avoid cloning the command vector.
    pub fn build(self) -> Vec<String> {
        let mut args = vec![self.docker_path.to_string_lossy().into_owned()];
        let container = self.container.unwrap_or_default();

        match self.action {
            DockerAction::Create => {
                args.push("create".to_string());

                // Isolation parameters
                args.push("--network=none".to_string());
                args.push(format!("--cpus={}", self.limits.cpus));
                args.push(format!("--memory={}m", self.limits.memory_limit));
                args.push(format!("--memory-swap={}m", self.limits.memory_limit));
                args.push(format!("--pids-limit={}", self.limits.max_processes));
                for dir in &self.limits.tmpfs {
                    args.push(format!("--tmpfs={dir}:rw,noexec"));
                }

                args.push(self.image.unwrap_or_default());
                args.extend(self.command);
            }
            DockerAction::Start => {
                args.push("start".to_string());
                args.push(container);
            }
            DockerAction::Copy => {
                args.push("cp".to_string());
                if let Some(ref source) = self.source {
                    args.push(source.to_string_lossy().into_owned());
                }
                args.push(format!("{container}:{}", self.dest.unwrap_or_default()));
            }
            DockerAction::Exec => {
                args.push("exec".to_string());
                if self.interactive {
                    args.push("--interactive".to_string());
                }
                if let Some(ref dir) = self.working_dir {
                    args.push(format!("--workdir={dir}"));
                }
                if let Some(ref user) = self.user {
                    args.push(format!("--user={user}"));
                }
                args.push(container);
                args.extend(self.command);
            }
            DockerAction::Remove => {
                args.push("rm".to_string());
                args.push("--force".to_string());
                args.push(container);
            }
        }

        args
    }

    /// Get the docker binary path
    pub fn docker_path(&self) -> &Path {
        &self.docker_path
    }

    /// Get the action
    pub fn get_action(&self) -> DockerAction {
        self.action
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockerAction {
    /// Create a container with isolation parameters
    Create,
    /// Start a created container
    Start,
    /// Copy a host file into a container
    Copy,
    /// Run a command in a running container
    Exec,
    /// Forcibly remove a container
    Remove,
}
