//! Scoped ownership of a single sandbox
//!
//! Manages the creation, use, and removal of one container for one job.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, instrument, warn};

use crate::sandbox::exec::execute;
use crate::sandbox::{SandboxError, SandboxId, SandboxRuntime, validate_file_name};
use crate::types::{ExecOutput, SandboxFile};

/// A created sandbox, exclusively owned by one judging run
///
/// # Cleanup
///
/// Call [`destroy()`](Self::destroy) once the run is done with the sandbox.
/// If the guard is dropped while still active, `Drop` removes the container
/// from a background thread with its own runtime. That covers unwinding,
/// cancelled futures and runtime shutdown, but may not complete before
/// process exit.
///
/// ```rust,ignore
/// let mut sandbox = Sandbox::create(runtime, "dvorak-py:latest").await?;
/// let result = run(&sandbox).await;
/// sandbox.destroy().await;
/// ```
#[derive(Debug)]
pub struct Sandbox {
    id: SandboxId,
    runtime: Arc<dyn SandboxRuntime>,
    /// Whether the container still exists from our point of view
    active: bool,
}

impl Sandbox {
    /// Provision a new sandbox from `image`
    ///
    /// No guard exists if this fails, so there is nothing to destroy.
    #[instrument(skip(runtime))]
    pub async fn create(
        runtime: Arc<dyn SandboxRuntime>,
        image: &str,
    ) -> Result<Self, SandboxError> {
        let id = runtime.create(image).await?;
        debug!(%id, "sandbox acquired");
        Ok(Self {
            id,
            runtime,
            active: true,
        })
    }

    pub fn id(&self) -> &SandboxId {
        &self.id
    }

    /// Check if the sandbox has not been destroyed yet
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn ensure_active(&self) -> Result<(), SandboxError> {
        if self.active {
            Ok(())
        } else {
            Err(SandboxError::Destroyed(self.id.clone()))
        }
    }

    /// Transition the sandbox from created to running
    pub async fn start(&self) -> Result<(), SandboxError> {
        self.ensure_active()?;
        self.runtime.start(&self.id).await
    }

    /// Stage files into `dest` and hand them to the execution user
    #[instrument(skip(self, files), fields(id = %self.id))]
    pub async fn populate(&self, files: &[SandboxFile], dest: &str) -> Result<(), SandboxError> {
        self.ensure_active()?;
        for file in files {
            validate_file_name(&file.name)?;
        }
        self.runtime.copy_in(&self.id, files, dest).await
    }

    /// Run a command under the in-sandbox and supervisory deadlines
    pub async fn execute(
        &self,
        command: &[String],
        working_dir: &str,
        user: Option<&str>,
        stdin: Option<&[u8]>,
        time_limit: Duration,
        grace_period: Duration,
    ) -> Result<ExecOutput, SandboxError> {
        self.ensure_active()?;
        execute(
            self.runtime.as_ref(),
            &self.id,
            command,
            working_dir,
            user,
            stdin,
            time_limit,
            grace_period,
        )
        .await
    }

    /// Remove the sandbox
    ///
    /// Runs the removal at most once per guard. Failures are logged, never
    /// returned: there is nothing a caller could do with them.
    #[instrument(skip(self), fields(id = %self.id))]
    pub async fn destroy(&mut self) {
        if !self.active {
            return;
        }

        let result = self.runtime.remove(&self.id).await;
        // Still active if cancelled above, so Drop retries the removal
        self.active = false;

        match result {
            Ok(()) => debug!("sandbox destroyed"),
            Err(e) => error!(error = %e, "failed to destroy sandbox"),
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if !self.active {
            return;
        }

        warn!(
            id = %self.id,
            "Sandbox dropped without explicit destroy, scheduling removal"
        );

        // Own thread and runtime: the caller's runtime may be shutting down
        let runtime = Arc::clone(&self.runtime);
        let id = self.id.clone();
        let spawned = std::thread::Builder::new()
            .name("sandbox-reaper".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!(
                            %id,
                            error = %e,
                            "failed to start removal runtime, sandbox leaked"
                        );
                        return;
                    }
                };
                match rt.block_on(runtime.remove(&id)) {
                    Ok(()) => debug!(%id, "deferred removal succeeded"),
                    Err(e) => warn!(%id, error = %e, "deferred removal failed"),
                }
            });

        if let Err(e) = spawned {
            error!(
                id = %self.id,
                error = %e,
                "failed to spawn removal thread, sandbox leaked"
            );
        }
    }
}
