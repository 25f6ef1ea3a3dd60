//! Compilation step of the judging pipeline

use tracing::{debug, instrument};

use crate::config::{Config, Language};
use crate::sandbox::{Sandbox, SandboxError};
use crate::verdict::{Verdict, tail};

/// Compile the staged source if the language has a compile step
///
/// Returns `Some(CE)` when compilation fails, `None` when the program is
/// ready to run. Sandbox failures are returned as errors.
#[instrument(skip_all, fields(language = %language.name))]
pub async fn compile(
    sandbox: &Sandbox,
    config: &Config,
    language: &Language,
) -> Result<Option<Verdict>, SandboxError> {
    let Some(command) = language.compile_command() else {
        debug!("no compile step");
        return Ok(None);
    };

    let output = sandbox
        .execute(
            &command,
            &config.sandbox.work_dir,
            Some(config.sandbox.user.as_str()),
            None,
            config.judge.compile_timeout(),
            config.sandbox.grace_period(),
        )
        .await?;

    debug!(
        exit_code = ?output.exit_code,
        timed_out = output.timed_out,
        "compilation complete"
    );

    if output.is_success() {
        return Ok(None);
    }

    // The verdict must carry some diagnostic even if the compiler was silent
    let diagnostic = output.diagnostic();
    let msg = if !diagnostic.trim().is_empty() {
        tail(diagnostic, config.judge.diagnostics.compile_tail)
    } else if output.timed_out {
        format!(
            "compilation timed out after {}s",
            config.judge.compile_timeout
        )
    } else {
        match output.exit_code {
            Some(code) => format!("compilation failed with exit code {code}"),
            None => "compilation terminated by signal".to_string(),
        }
    };

    Ok(Some(Verdict::CompileError { msg }))
}
