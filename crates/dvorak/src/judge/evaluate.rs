//! Test case evaluation
//!
//! Runs the program once per test case, strictly in order, and stops at
//! the first case that fails.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::config::{Config, Language};
use crate::problem::Problem;
use crate::sandbox::{Sandbox, SandboxError};
use crate::types::ExecOutput;
use crate::verdict::{Verdict, head, tail};

/// Evaluate the compiled program against every test case
#[instrument(skip_all, fields(problem = %problem.id, cases = problem.test_cases.len()))]
pub async fn evaluate(
    sandbox: &Sandbox,
    config: &Config,
    language: &Language,
    problem: &Problem,
) -> Verdict {
    let command = language.run_command();
    let time_limit = Duration::from_secs(problem.time_budget_secs());
    let limits = &config.judge.diagnostics;

    for (index, test_case) in problem.test_cases.iter().enumerate() {
        let case = index + 1;

        let output = match sandbox
            .execute(
                &command,
                &config.sandbox.work_dir,
                Some(config.sandbox.user.as_str()),
                Some(test_case.input.as_bytes()),
                time_limit,
                config.sandbox.grace_period(),
            )
            .await
        {
            Ok(output) => output,
            Err(e) => {
                warn!(case, error = %e, "execution failed");
                return Verdict::RuntimeError {
                    case: Some(case),
                    msg: tail(&e.to_string(), limits.runtime_tail),
                    timed_out: matches!(e, SandboxError::DeadlineExceeded(_)),
                };
            }
        };

        if !output.is_success() {
            debug!(
                case,
                exit_code = ?output.exit_code,
                timed_out = output.timed_out,
                "runtime error"
            );
            return runtime_error(case, &output, limits.runtime_tail);
        }

        if !problem.checker.accepts(&output.stdout, &test_case.expected) {
            debug!(case, "wrong answer");
            return Verdict::WrongAnswer {
                case,
                got: head(&output.stdout, limits.preview),
                exp: head(&test_case.expected, limits.preview),
            };
        }

        debug!(case, "passed");
    }

    Verdict::Accepted
}

fn runtime_error(case: usize, output: &ExecOutput, max_chars: usize) -> Verdict {
    let diagnostic = output.diagnostic();
    let msg = if !diagnostic.trim().is_empty() {
        tail(diagnostic, max_chars)
    } else if output.timed_out {
        "time limit exceeded".to_string()
    } else {
        match output.exit_code {
            Some(code) => format!("exited with status {code}"),
            None => "terminated by signal".to_string(),
        }
    };

    Verdict::RuntimeError {
        case: Some(case),
        msg,
        timed_out: output.timed_out,
    }
}
