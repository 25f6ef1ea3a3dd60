//! Bounded command execution
//!
//! Every command runs under two deadlines: coreutils `timeout` inside the
//! sandbox, and a supervisory deadline on the host that is strictly longer.
//! The outer one only fires when the inner enforcement is broken.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::sandbox::{SandboxError, SandboxId, SandboxRuntime};
use crate::types::{ExecOutput, ExecRequest};

/// Exit status reported by coreutils `timeout` when the deadline fires
pub const TIMEOUT_EXIT_STATUS: i32 = 124;

/// Exit status when `timeout` had to escalate to SIGKILL (128 + 9)
pub const KILLED_EXIT_STATUS: i32 = 137;

/// How long `timeout` waits after SIGTERM before sending SIGKILL
pub const KILL_AFTER: Duration = Duration::from_secs(1);

/// Prefix `command` with the in-sandbox deadline
///
/// A program that ignores SIGTERM is killed `KILL_AFTER` later.
pub fn wrap_with_timeout(command: &[String], time_limit: Duration) -> Vec<String> {
    let secs = time_limit.as_secs().max(1);
    let mut wrapped = Vec::with_capacity(command.len() + 4);
    wrapped.push("timeout".to_string());
    wrapped.push("-k".to_string());
    wrapped.push(format!("{}s", KILL_AFTER.as_secs()));
    wrapped.push(format!("{secs}s"));
    wrapped.extend(command.iter().cloned());
    wrapped
}

/// Run a command inside a sandbox with a wall-clock deadline
///
/// A nonzero exit status is returned as a normal [`ExecOutput`]; only
/// transport failures and the outer deadline are errors.
#[instrument(skip(runtime, command, stdin), fields(id = %id))]
#[allow(clippy::too_many_arguments)]
pub async fn execute(
    runtime: &dyn SandboxRuntime,
    id: &SandboxId,
    command: &[String],
    working_dir: &str,
    user: Option<&str>,
    stdin: Option<&[u8]>,
    time_limit: Duration,
    grace_period: Duration,
) -> Result<ExecOutput, SandboxError> {
    let time_limit = time_limit.max(Duration::from_secs(1));
    let request = ExecRequest {
        command: wrap_with_timeout(command, time_limit),
        working_dir: working_dir.to_string(),
        stdin: stdin.map(<[u8]>::to_vec),
        user: user.map(str::to_string),
    };

    // Strictly later than the inner SIGKILL, even with a zero grace period
    let outer = time_limit + KILL_AFTER + grace_period + Duration::from_millis(500);

    let started = Instant::now();
    let mut output = match tokio::time::timeout(outer, runtime.exec(id, &request)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(?outer, "supervisory deadline exceeded");
            return Err(SandboxError::DeadlineExceeded(outer));
        }
    };

    // A SIGKILL before the limit is not a timeout (e.g. the memory cap)
    output.timed_out = match output.exit_code {
        Some(TIMEOUT_EXIT_STATUS) => true,
        Some(KILLED_EXIT_STATUS) => started.elapsed() >= time_limit,
        _ => false,
    };

    debug!(
        exit_code = ?output.exit_code,
        timed_out = output.timed_out,
        stdout_len = output.stdout.len(),
        stderr_len = output.stderr.len(),
        "command finished"
    );

    Ok(output)
}
