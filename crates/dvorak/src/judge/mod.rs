//! Judging pipeline for dvorak
//!
//! Turns a submission into a verdict: resolve the language, load the
//! problem, acquire a sandbox, stage the source, compile if needed, and run
//! every test case in order. Every failure ends in a verdict; nothing here
//! returns an error to the caller.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

pub use crate::judge::compile::compile;
pub use crate::judge::evaluate::evaluate;

mod compile;
mod evaluate;

use crate::{
    config::{Config, Language},
    problem::{Problem, ProblemError, ProblemLoader},
    sandbox::{Sandbox, SandboxError, SandboxRuntime},
    types::{SandboxFile, Submission},
    verdict::Verdict,
};

/// Errors that end a judging run before any verdict was reached
///
/// Each of these is reported as an RE verdict without a case index.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("failed to load problem: {0}")]
    Problem(#[from] ProblemError),

    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),
}

impl JudgeError {
    /// Infrastructure verdict for this failure
    pub fn verdict(&self) -> Verdict {
        Verdict::internal(self.to_string())
    }
}

/// The judging pipeline
///
/// Cheap to clone; all state is shared behind `Arc`s.
#[derive(Debug, Clone)]
pub struct Judge {
    config: Arc<Config>,
    runtime: Arc<dyn SandboxRuntime>,
    problems: Arc<dyn ProblemLoader>,
}

impl Judge {
    pub fn new(
        config: Arc<Config>,
        runtime: Arc<dyn SandboxRuntime>,
        problems: Arc<dyn ProblemLoader>,
    ) -> Self {
        Self {
            config,
            runtime,
            problems,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Judge a submission
    ///
    /// A sandbox created here is destroyed before this returns, whatever
    /// the outcome.
    #[instrument(skip_all, fields(problem = %submission.problem_id, language = %submission.language))]
    pub async fn judge(&self, submission: &Submission) -> Verdict {
        let Ok(language) = self.config.get_language(&submission.language) else {
            info!("unsupported language");
            return Verdict::unsupported_language(&submission.language);
        };

        let problem = match self.problems.load(&submission.problem_id).await {
            Ok(problem) => problem,
            Err(e) => {
                let e = JudgeError::from(e);
                warn!(error = %e, "problem unavailable");
                return e.verdict();
            }
        };

        let mut sandbox = match Sandbox::create(Arc::clone(&self.runtime), &language.image).await
        {
            Ok(sandbox) => sandbox,
            Err(e) => {
                let e = JudgeError::from(e);
                error!(error = %e, image = %language.image, "sandbox provisioning failed");
                return e.verdict();
            }
        };

        let verdict = match self.run(&sandbox, language, &problem, submission).await {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(id = %sandbox.id(), error = %e, "sandbox preparation failed");
                e.verdict()
            }
        };

        sandbox.destroy().await;

        debug!(%verdict, "judging complete");
        verdict
    }

    /// Everything between acquiring and destroying the sandbox
    async fn run(
        &self,
        sandbox: &Sandbox,
        language: &Language,
        problem: &Problem,
        submission: &Submission,
    ) -> Result<Verdict, JudgeError> {
        sandbox.start().await?;

        let source = SandboxFile::new(&language.source_name, submission.code.as_bytes());
        sandbox
            .populate(&[source], &self.config.sandbox.work_dir)
            .await?;
        debug!(source_name = %language.source_name, "source staged");

        if let Some(verdict) = compile(sandbox, &self.config, language).await? {
            return Ok(verdict);
        }

        Ok(evaluate(sandbox, &self.config, language, problem).await)
    }
}
