use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::language::{CompileConfig, Language, RunConfig};
use crate::types::SandboxLimits;

pub mod language;
mod loader;

/// Example configuration embedded at compile time.
///
/// Also serves as the built-in default configuration.
pub const EXAMPLE_CONFIG: &str = include_str!("../../dvorak.example.toml");

/// Prefix for environment variable overrides (e.g. `DVORAK_QUEUE__REDIS_URL`)
pub const ENV_PREFIX: &str = "DVORAK";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("language '{0}' not found in configuration")]
    LanguageNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for the dvorak judge
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding `<problem_id>.json` problem files
    #[serde(default = "default_problems_dir")]
    pub problems_dir: PathBuf,

    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub judge: JudgeConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    /// Language profiles keyed by language ID
    #[serde(default)]
    pub languages: HashMap<String, Language>,
}

/// Container runtime settings
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxConfig {
    /// Path to the docker binary (uses PATH if not specified)
    #[serde(default)]
    pub docker_path: Option<PathBuf>,

    /// Working directory inside the sandbox where sources are staged
    #[serde(default = "default_work_dir")]
    pub work_dir: String,

    /// Unprivileged user that owns staged files and runs programs
    #[serde(default = "default_user")]
    pub user: String,

    /// Command that keeps an idle sandbox alive
    #[serde(default = "default_keepalive")]
    pub keepalive: Vec<String>,

    /// Timeout for create/start/chown/remove in seconds
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout: u64,

    /// Timeout for copying a file into the sandbox in seconds
    #[serde(default = "default_copy_timeout")]
    pub copy_timeout: u64,

    /// Extra seconds the outer deadline allows beyond the in-sandbox one
    #[serde(default = "default_grace_period")]
    pub grace_period: u64,

    /// Resource caps applied to every sandbox
    #[serde(default)]
    pub limits: SandboxLimits,
}

/// Judging pipeline settings
#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    /// Compile step deadline in seconds
    #[serde(default = "default_compile_timeout")]
    pub compile_timeout: u64,

    #[serde(default)]
    pub diagnostics: DiagnosticLimits,
}

/// Character limits for diagnostic text attached to verdicts
#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticLimits {
    /// Tail of compiler output kept for CE
    #[serde(default = "default_compile_tail")]
    pub compile_tail: usize,

    /// Tail of program output kept for RE
    #[serde(default = "default_runtime_tail")]
    pub runtime_tail: usize,

    /// Prefix of actual/expected output kept for WA
    #[serde(default = "default_preview")]
    pub preview: usize,
}

/// Job queue and result store settings
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// List the worker pops judge jobs from
    #[serde(default = "default_queue_key")]
    pub queue_key: String,

    /// Result store key prefix, followed by the job ID
    #[serde(default = "default_result_prefix")]
    pub result_prefix: String,

    /// Result expiry in seconds
    #[serde(default = "default_result_ttl")]
    pub result_ttl: u64,

    /// Back-off after a queue transport failure in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

impl Config {
    /// Create a new config with the embedded default languages
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no languages
    pub fn empty() -> Self {
        Self {
            problems_dir: default_problems_dir(),
            sandbox: SandboxConfig::default(),
            judge: JudgeConfig::default(),
            queue: QueueConfig::default(),
            languages: HashMap::new(),
        }
    }

    /// Resolve a language profile by ID
    pub fn get_language(&self, id: &str) -> Result<&Language, ConfigError> {
        self.languages
            .get(id)
            .ok_or_else(|| ConfigError::LanguageNotFound(id.to_string()))
    }

    /// Get the path to the docker binary
    pub fn docker_binary(&self) -> PathBuf {
        self.sandbox
            .docker_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("docker"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

impl SandboxConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout)
    }

    pub fn copy_timeout(&self) -> Duration {
        Duration::from_secs(self.copy_timeout)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            docker_path: None,
            work_dir: default_work_dir(),
            user: default_user(),
            keepalive: default_keepalive(),
            operation_timeout: default_operation_timeout(),
            copy_timeout: default_copy_timeout(),
            grace_period: default_grace_period(),
            limits: SandboxLimits::default(),
        }
    }
}

impl JudgeConfig {
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_secs(self.compile_timeout)
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            compile_timeout: default_compile_timeout(),
            diagnostics: DiagnosticLimits::default(),
        }
    }
}

impl Default for DiagnosticLimits {
    fn default() -> Self {
        Self {
            compile_tail: default_compile_tail(),
            runtime_tail: default_runtime_tail(),
            preview: default_preview(),
        }
    }
}

impl QueueConfig {
    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            queue_key: default_queue_key(),
            result_prefix: default_result_prefix(),
            result_ttl: default_result_ttl(),
            retry_delay: default_retry_delay(),
        }
    }
}

fn default_problems_dir() -> PathBuf {
    PathBuf::from("problems")
}

fn default_work_dir() -> String {
    "/work".to_owned()
}

fn default_user() -> String {
    "runner".to_owned()
}

fn default_keepalive() -> Vec<String> {
    vec!["sleep".to_owned(), "infinity".to_owned()]
}

fn default_operation_timeout() -> u64 {
    10
}

fn default_copy_timeout() -> u64 {
    30
}

fn default_grace_period() -> u64 {
    2
}

fn default_compile_timeout() -> u64 {
    20
}

fn default_compile_tail() -> usize {
    1500
}

fn default_runtime_tail() -> usize {
    1000
}

fn default_preview() -> usize {
    200
}

fn default_redis_url() -> String {
    "redis://localhost:6379/0".to_owned()
}

fn default_queue_key() -> String {
    "judge:queue".to_owned()
}

fn default_result_prefix() -> String {
    "result:".to_owned()
}

fn default_result_ttl() -> u64 {
    600
}

fn default_retry_delay() -> u64 {
    1
}
