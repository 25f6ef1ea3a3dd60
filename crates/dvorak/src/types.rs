use serde::{Deserialize, Serialize};

/// Resource caps applied to every sandbox at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxLimits {
    /// CPU share cap (number of CPUs)
    #[serde(default = "default_cpus")]
    pub cpus: f64,

    /// Memory limit in megabytes (swap is capped at the same value)
    #[serde(default = "default_memory_limit")]
    pub memory_limit: u64,

    /// Maximum number of processes/threads
    #[serde(default = "default_max_processes")]
    pub max_processes: u32,

    /// Writable, non-executable tmpfs mount points
    #[serde(default = "default_tmpfs")]
    pub tmpfs: Vec<String>,
}

impl SandboxLimits {
    /// 1 megabyte
    pub const MB: u64 = 1;
    /// 1 gigabyte in megabytes
    pub const GB: u64 = 1024;

    /// Create limits with the default caps
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CPU share cap
    pub fn with_cpus(mut self, cpus: f64) -> Self {
        self.cpus = cpus;
        self
    }

    /// Set the memory limit in megabytes
    pub fn with_memory_limit(mut self, mb: u64) -> Self {
        self.memory_limit = mb;
        self
    }

    /// Set the maximum number of processes
    pub fn with_max_processes(mut self, count: u32) -> Self {
        self.max_processes = count;
        self
    }

    /// Replace the tmpfs mount points
    pub fn with_tmpfs(mut self, dirs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tmpfs = dirs.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            cpus: default_cpus(),
            memory_limit: default_memory_limit(),
            max_processes: default_max_processes(),
            tmpfs: default_tmpfs(),
        }
    }
}

fn default_cpus() -> f64 {
    1.0
}

fn default_memory_limit() -> u64 {
    512 * SandboxLimits::MB
}

fn default_max_processes() -> u32 {
    256
}

fn default_tmpfs() -> Vec<String> {
    vec!["/tmp".to_owned(), "/run".to_owned()]
}

/// A named text file to be staged into a sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxFile {
    /// Plain file name (no directories)
    pub name: String,

    /// File contents
    pub contents: Vec<u8>,
}

impl SandboxFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// A command to run inside an active sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// Argument vector, program first
    pub command: Vec<String>,

    /// Working directory inside the sandbox
    pub working_dir: String,

    /// Bytes piped to the command's stdin (stdin is closed if None)
    pub stdin: Option<Vec<u8>>,

    /// User to run as (the image default if None)
    pub user: Option<String>,
}

/// Captured result of a command run inside a sandbox
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Exit status of the command (None if killed by a signal)
    pub exit_code: Option<i32>,

    /// Standard output, lossily decoded
    pub stdout: String,

    /// Standard error, lossily decoded
    pub stderr: String,

    /// Whether the in-sandbox deadline fired
    pub timed_out: bool,
}

impl ExecOutput {
    /// Check if the command exited with status 0
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Stderr if non-empty, otherwise stdout
    pub fn diagnostic(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// A user's submission, immutable once enqueued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub problem_id: String,

    /// Language ID, looked up in the language registry
    pub language: String,

    /// Source code text
    pub code: String,
}

/// A queued judging request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub submission: Submission,
}
