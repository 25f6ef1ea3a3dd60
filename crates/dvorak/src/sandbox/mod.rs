//! Sandbox lifecycle and bounded execution
//!
//! A sandbox is an isolated, resource-capped, network-disabled container
//! hosting exactly one job's compile and run steps. This module defines the
//! runtime seam ([`SandboxRuntime`]), a Docker CLI implementation, the
//! scoped [`Sandbox`] guard, and the bounded command executor.
//!
//! References for the Docker CLI arguments used here:
//! - https://docs.docker.com/reference/cli/docker/container/create/
//! - https://docs.docker.com/reference/cli/docker/container/exec/

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use crate::sandbox::command::{DockerAction, DockerCommand};
pub use crate::sandbox::docker::DockerRuntime;
pub use crate::sandbox::exec::{
    KILL_AFTER, KILLED_EXIT_STATUS, TIMEOUT_EXIT_STATUS, execute, wrap_with_timeout,
};
pub use crate::sandbox::guard::Sandbox;
use crate::types::{ExecOutput, ExecRequest, SandboxFile};

mod command;
mod docker;
mod exec;
mod guard;

/// Errors that occur during sandbox operations
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("failed to create sandbox from image {image}: {message}")]
    CreateFailed { image: String, message: String },

    #[error("failed to start sandbox {id}: {message}")]
    StartFailed { id: SandboxId, message: String },

    #[error("failed to stage files into sandbox {id}: {message}")]
    CopyFailed { id: SandboxId, message: String },

    #[error("failed to execute in sandbox {id}: {message}")]
    ExecFailed { id: SandboxId, message: String },

    #[error("failed to remove sandbox {id}: {message}")]
    RemoveFailed { id: SandboxId, message: String },

    #[error("failed to spawn container runtime: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("container runtime did not respond within {0:?}")]
    OperationTimeout(Duration),

    #[error("command exceeded the supervisory deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("sandbox {0} has already been destroyed")]
    Destroyed(SandboxId),

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Opaque identifier of a created sandbox
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SandboxId(String);

impl SandboxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SandboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Docker IDs are 64 hex characters; the short form is what `docker ps` shows
        let short = self.0.get(..12).unwrap_or(&self.0);
        write!(f, "{short}")
    }
}

/// Container/process isolation facility backing the sandboxes
///
/// Resource caps are a property of the runtime, not of the caller: every
/// sandbox created through a runtime gets the same isolation parameters.
#[async_trait]
pub trait SandboxRuntime: Send + Sync + fmt::Debug {
    /// Provision a new isolated environment from an image
    async fn create(&self, image: &str) -> Result<SandboxId, SandboxError>;

    /// Transition a created sandbox to running
    async fn start(&self, id: &SandboxId) -> Result<(), SandboxError>;

    /// Copy files into `dest` and hand them to the unprivileged user
    async fn copy_in(
        &self,
        id: &SandboxId,
        files: &[SandboxFile],
        dest: &str,
    ) -> Result<(), SandboxError>;

    /// Run a command and capture its output
    ///
    /// A nonzero exit status is a normal outcome, not an error.
    async fn exec(&self, id: &SandboxId, request: &ExecRequest)
    -> Result<ExecOutput, SandboxError>;

    /// Forcibly remove the sandbox; removing a missing sandbox succeeds
    async fn remove(&self, id: &SandboxId) -> Result<(), SandboxError>;
}

/// Validate that a file name is safe to stage into a sandbox
///
/// Only plain names are accepted: no directories and no traversal.
pub fn validate_file_name(name: &str) -> Result<(), SandboxError> {
    if name.is_empty()
        || name == "."
        || name.contains('/')
        || name.contains("..")
        || name.contains('\0')
    {
        return Err(SandboxError::InvalidFileName(name.to_string()));
    }
    Ok(())
}
