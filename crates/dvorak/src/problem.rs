//! Problem definitions
//!
//! Problems are stored as `<problem_id>.json` files and consumed read-only.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Errors that occur while loading a problem
#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("problem '{0}' not found")]
    NotFound(String),

    #[error("invalid problem id: {0}")]
    InvalidId(String),

    #[error("failed to parse problem '{id}': {source}")]
    Parse {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output comparison policy
///
/// Any mode name other than `strict` is treated as lenient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckerMode {
    /// Byte-exact comparison, including trailing whitespace
    #[default]
    Strict,

    /// Comparison after trimming leading and trailing whitespace
    Lenient,
}

impl<'de> Deserialize<'de> for CheckerMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mode = String::deserialize(deserializer)?;
        Ok(if mode == "strict" {
            CheckerMode::Strict
        } else {
            CheckerMode::Lenient
        })
    }
}

impl CheckerMode {
    /// Check whether `actual` is an accepted answer for `expected`
    pub fn accepts(&self, actual: &str, expected: &str) -> bool {
        match self {
            CheckerMode::Strict => actual == expected,
            CheckerMode::Lenient => actual.trim() == expected.trim(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,

    /// Expected output
    #[serde(default, rename = "output")]
    pub expected: String,
}

/// A programming problem and its ordered test cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Time limit per test case in milliseconds
    #[serde(default = "default_time_limit_ms", rename = "time_limit_ms")]
    pub time_limit: u64,

    /// Memory limit in megabytes
    #[serde(default = "default_memory_limit_mb", rename = "memory_limit_mb")]
    pub memory_limit: u64,

    #[serde(default)]
    pub checker: CheckerMode,

    #[serde(default, rename = "testcases")]
    pub test_cases: Vec<TestCase>,
}

impl Problem {
    /// Per-test time budget in whole seconds (at least one)
    pub fn time_budget_secs(&self) -> u64 {
        (self.time_limit / 1000).max(1)
    }
}

fn default_time_limit_ms() -> u64 {
    2000
}

fn default_memory_limit_mb() -> u64 {
    256
}

/// Source of problem definitions
#[async_trait]
pub trait ProblemLoader: Send + Sync + std::fmt::Debug {
    /// Load the problem with the given ID
    async fn load(&self, problem_id: &str) -> Result<Problem, ProblemError>;
}

/// Loads problems from `<dir>/<problem_id>.json`
#[derive(Debug, Clone)]
pub struct FsProblemLoader {
    dir: PathBuf,
}

impl FsProblemLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the problem directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the path of a problem file
    ///
    /// Returns an error if the ID could escape the problem directory.
    pub fn problem_path(&self, problem_id: &str) -> Result<PathBuf, ProblemError> {
        if problem_id.is_empty()
            || problem_id.contains("..")
            || problem_id.contains('/')
            || problem_id.contains('\\')
        {
            return Err(ProblemError::InvalidId(problem_id.to_string()));
        }
        Ok(self.dir.join(format!("{problem_id}.json")))
    }
}

#[async_trait]
impl ProblemLoader for FsProblemLoader {
    #[instrument(skip(self))]
    async fn load(&self, problem_id: &str) -> Result<Problem, ProblemError> {
        let path = self.problem_path(problem_id)?;
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProblemError::NotFound(problem_id.to_string()));
            }
            Err(e) => return Err(ProblemError::Io(e)),
        };

        let problem: Problem =
            serde_json::from_slice(&content).map_err(|source| ProblemError::Parse {
                id: problem_id.to_string(),
                source,
            })?;

        debug!(?path, cases = problem.test_cases.len(), "loaded problem");
        Ok(problem)
    }
}
